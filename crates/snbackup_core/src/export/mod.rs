//! Human-readable backup export.
//!
//! # Responsibility
//! - Project cached records to the export shape and format their dates.
//! - Write the export as one JSON array.
//!
//! # Invariants
//! - Records flagged `deleted` are never exported.
//! - Every exported note carries all six fields; a record missing a date
//!   fails the export instead of producing a partial entry.

use crate::atomic_file::write_atomic;
use crate::model::note::{NoteRecord, Timestamp};
use chrono::{DateTime, TimeZone, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

/// `strftime` pattern used for both dates, e.g. `Jan 05 2017 14:30:00`.
pub const EXPORT_DATE_FORMAT: &str = "%b %d %Y %H:%M:%S";

/// One exported note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportNote {
    pub modifydate: String,
    pub createdate: String,
    pub tags: Vec<String>,
    pub systemtags: Vec<String>,
    pub content: String,
    pub key: String,
}

/// Export projection plus bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportDocument {
    pub notes: Vec<ExportNote>,
    pub skipped_deleted: usize,
}

#[derive(Debug)]
pub enum ExportError {
    MissingField {
        key: String,
        field: &'static str,
    },
    InvalidTimestamp {
        key: String,
        field: &'static str,
        value: String,
    },
    Encode(serde_json::Error),
    Io {
        path: PathBuf,
        source: io::Error,
    },
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { key, field } => {
                write!(f, "note `{key}` has no `{field}`; refusing to export it")
            }
            Self::InvalidTimestamp { key, field, value } => {
                write!(f, "note `{key}` has an out-of-range `{field}`: {value}")
            }
            Self::Encode(err) => write!(f, "failed to encode export: {err}"),
            Self::Io { path, source } => {
                write!(f, "failed to write export `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Projects live records to export notes, dates rendered in `tz`.
pub fn build_export<'a, I, Tz>(records: I, tz: &Tz) -> Result<ExportDocument, ExportError>
where
    I: IntoIterator<Item = &'a NoteRecord>,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut document = ExportDocument::default();
    for record in records {
        if record.deleted {
            document.skipped_deleted += 1;
            continue;
        }
        document.notes.push(ExportNote {
            modifydate: format_field(record, "modifydate", record.modifydate.as_ref(), tz)?,
            createdate: format_field(record, "createdate", record.createdate.as_ref(), tz)?,
            tags: record.tags.clone(),
            systemtags: record.systemtags.clone(),
            content: record.content.clone(),
            key: record.key.clone(),
        });
    }
    Ok(document)
}

/// Formats epoch seconds with `EXPORT_DATE_FORMAT`; `None` when out of range.
pub fn format_timestamp<Tz>(timestamp: &Timestamp, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let seconds = timestamp.seconds();
    let whole = seconds.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let nanos = (((seconds - whole) * 1e9) as u32).min(999_999_999);
    let utc = DateTime::<Utc>::from_timestamp(whole as i64, nanos)?;
    Some(
        utc.with_timezone(tz)
            .format(EXPORT_DATE_FORMAT)
            .to_string(),
    )
}

/// Writes `notes` as a compact JSON array, replacing `path` atomically.
pub fn write_export(path: &Path, notes: &[ExportNote]) -> Result<(), ExportError> {
    let payload = serde_json::to_vec(notes).map_err(ExportError::Encode)?;
    write_atomic(path, &payload).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "event=export_write module=export status=ok notes={} bytes={}",
        notes.len(),
        payload.len()
    );
    Ok(())
}

fn format_field<Tz>(
    record: &NoteRecord,
    field: &'static str,
    value: Option<&Timestamp>,
    tz: &Tz,
) -> Result<String, ExportError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let timestamp = value.ok_or_else(|| ExportError::MissingField {
        key: record.key.clone(),
        field,
    })?;
    format_timestamp(timestamp, tz).ok_or_else(|| ExportError::InvalidTimestamp {
        key: record.key.clone(),
        field,
        value: timestamp.to_string(),
    })
}
