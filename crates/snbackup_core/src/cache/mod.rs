//! Local note cache persisted as one JSON document.
//!
//! # Responsibility
//! - Keep the last fetched `NoteRecord` for every known key.
//! - Load and save the cache file with bounded retries.
//!
//! # Invariants
//! - `save()` is the only operation that mutates the file system after load.
//! - A cache that failed to load is never handed to callers.
//! - Every stored record's `key` equals its map key.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

pub mod retry;
mod store;

pub use retry::{CacheOp, MAX_CACHE_ATTEMPTS};
pub use store::CacheStore;

pub type CacheResult<T> = Result<T, CacheError>;

/// Cache load/save failure.
#[derive(Debug)]
pub enum CacheError {
    /// Non-retryable I/O failure.
    Io {
        op: CacheOp,
        path: PathBuf,
        source: io::Error,
    },
    /// NotFound persisted through every allowed attempt.
    RetriesExhausted {
        op: CacheOp,
        path: PathBuf,
        attempts: u32,
        source: io::Error,
    },
    /// Cache file exists but is not a valid cache document.
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Cache file maps a key to a record carrying another key.
    InconsistentEntry {
        path: PathBuf,
        map_key: String,
        record_key: String,
    },
    /// In-memory cache could not be serialized.
    Encode(serde_json::Error),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { op, path, source } => {
                write!(f, "cache {op} failed for `{}`: {source}", path.display())
            }
            Self::RetriesExhausted {
                op,
                path,
                attempts,
                source,
            } => write!(
                f,
                "cache {op} gave up on `{}` after {attempts} attempts: {source}",
                path.display()
            ),
            Self::Corrupt { path, source } => {
                write!(f, "cache file `{}` is corrupt: {source}", path.display())
            }
            Self::InconsistentEntry {
                path,
                map_key,
                record_key,
            } => write!(
                f,
                "cache file `{}` stores note `{record_key}` under key `{map_key}`",
                path.display()
            ),
            Self::Encode(err) => write!(f, "failed to encode cache: {err}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::RetriesExhausted { source, .. } => Some(source),
            Self::Corrupt { source, .. } => Some(source),
            Self::InconsistentEntry { .. } => None,
            Self::Encode(err) => Some(err),
        }
    }
}
