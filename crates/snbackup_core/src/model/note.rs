//! Note records, index summaries and wire-level scalar types.
//!
//! # Responsibility
//! - Decode note payloads exactly as the service sends them.
//! - Re-encode cached records without losing unknown service fields.
//!
//! # Invariants
//! - `key` and `syncnum` are required on every record and summary.
//! - Missing `content`/`tags`/`systemtags` decode as empty values.
//! - `deleted` is written back as `0|1`, timestamps as decimal strings.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Service-assigned note identifier.
pub type NoteKey = String;

/// One entry of the remote index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub key: NoteKey,
    pub syncnum: i64,
}

impl NoteSummary {
    pub fn new(key: impl Into<NoteKey>, syncnum: i64) -> Self {
        Self {
            key: key.into(),
            syncnum,
        }
    }
}

/// Fully concatenated remote index for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSnapshot {
    /// Summaries in the order the service returned them.
    pub entries: Vec<NoteSummary>,
    /// `true` only when pagination ended because the service sent no `mark`.
    pub complete: bool,
    /// Number of index pages requested.
    pub pages: u32,
}

impl IndexSnapshot {
    /// Builds a snapshot that is known to cover the whole remote index.
    pub fn complete(entries: Vec<NoteSummary>) -> Self {
        Self {
            entries,
            complete: true,
            pages: 1,
        }
    }

    /// Builds a snapshot that stopped before the last page.
    pub fn truncated(entries: Vec<NoteSummary>, pages: u32) -> Self {
        Self {
            entries,
            complete: false,
            pages,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Full note as returned by `data/<key>` and stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub key: NoteKey,
    pub syncnum: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub systemtags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub createdate: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifydate: Option<Timestamp>,
    /// Trash flag; the service sends `0|1`.
    #[serde(default, with = "deleted_flag")]
    pub deleted: bool,
    /// Service fields this crate does not interpret (`version`, `minversion`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NoteRecord {
    /// Creates a minimal live record with empty content and no dates.
    pub fn new(key: impl Into<NoteKey>, syncnum: i64) -> Self {
        Self {
            key: key.into(),
            syncnum,
            content: String::new(),
            tags: Vec::new(),
            systemtags: Vec::new(),
            createdate: None,
            modifydate: None,
            deleted: false,
            extra: BTreeMap::new(),
        }
    }

    /// Returns the index-level view of this record.
    pub fn summary(&self) -> NoteSummary {
        NoteSummary::new(self.key.clone(), self.syncnum)
    }
}

/// Epoch-seconds timestamp that keeps the service's textual form.
///
/// The service encodes dates as decimal strings such as `"1263348000.123456"`;
/// numbers are accepted as well. The raw text is what gets written back.
#[derive(Debug, Clone)]
pub struct Timestamp {
    raw: String,
    seconds: f64,
}

impl Timestamp {
    /// Parses a decimal epoch-seconds string.
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        let seconds = trimmed
            .parse::<f64>()
            .map_err(|_| format!("`{trimmed}` is not an epoch-seconds value"))?;
        if !seconds.is_finite() {
            return Err(format!("`{trimmed}` is not a finite timestamp"));
        }
        Ok(Self {
            raw: trimmed.to_string(),
            seconds,
        })
    }

    /// Builds a timestamp from numeric epoch seconds.
    pub fn from_seconds(seconds: f64) -> Result<Self, String> {
        if !seconds.is_finite() {
            return Err(format!("{seconds} is not a finite timestamp"));
        }
        Ok(Self {
            raw: seconds.to_string(),
            seconds,
        })
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Timestamp {}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimestampVisitor;

        impl<'de> Visitor<'de> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str("epoch seconds as a number or decimal string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Timestamp, E> {
                Timestamp::parse(value).map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Timestamp, E> {
                Timestamp::from_seconds(value).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Timestamp, E> {
                Ok(Timestamp {
                    raw: value.to_string(),
                    seconds: value as f64,
                })
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Timestamp, E> {
                Ok(Timestamp {
                    raw: value.to_string(),
                    seconds: value as f64,
                })
            }
        }

        deserializer.deserialize_any(TimestampVisitor)
    }
}

/// `deleted` arrives as `0|1` from the service; `true|false` is tolerated.
mod deleted_flag {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt::Formatter;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        struct FlagVisitor;

        impl<'de> Visitor<'de> for FlagVisitor {
            type Value = bool;

            fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str("0, 1, true or false")
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<bool, E> {
                Ok(value)
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<bool, E> {
                Ok(value != 0)
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<bool, E> {
                Ok(value != 0)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<bool, E> {
                match value.trim() {
                    "0" | "false" => Ok(false),
                    "1" | "true" => Ok(true),
                    other => Err(E::custom(format!("invalid deleted flag `{other}`"))),
                }
            }
        }

        deserializer.deserialize_any(FlagVisitor)
    }
}
