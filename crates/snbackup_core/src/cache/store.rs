//! File-backed cache store.
//!
//! # Responsibility
//! - Own the in-memory key -> record map for one run.
//! - Bootstrap a missing cache file and persist checkpoints atomically.
//!
//! # Invariants
//! - Iteration order is ascending key order.
//! - `load` and `save` run at most `MAX_CACHE_ATTEMPTS` attempts.

use super::retry::{retry_on_not_found, CacheOp, RetryOutcome, MAX_CACHE_ATTEMPTS};
use super::{CacheError, CacheResult};
use crate::atomic_file::write_atomic;
use crate::model::note::{NoteKey, NoteRecord};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

const EMPTY_CACHE_DOCUMENT: &[u8] = b"{}";

/// Note cache bound to one file path.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
    notes: BTreeMap<NoteKey, NoteRecord>,
}

impl CacheStore {
    /// Creates an empty cache bound to `path` without touching the disk.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            notes: BTreeMap::new(),
        }
    }

    /// Loads the cache file, creating an empty one when it does not exist.
    ///
    /// # Errors
    /// - `RetriesExhausted` when the file keeps disappearing.
    /// - `Io` for any other read/create failure.
    /// - `Corrupt` / `InconsistentEntry` when the document cannot be trusted.
    pub fn load(path: impl Into<PathBuf>) -> CacheResult<Self> {
        let path = path.into();
        let started_at = Instant::now();
        info!("event=cache_load module=cache status=start");

        let outcome = retry_on_not_found(
            MAX_CACHE_ATTEMPTS,
            |attempt| {
                if attempt > 1 {
                    warn!("event=cache_load module=cache status=retry attempt={attempt}");
                }
                fs::read_to_string(&path)
            },
            || create_empty_cache_file(&path),
        );

        let (text, attempts) = match outcome {
            Ok(RetryOutcome::Done { value, attempts }) => (value, attempts),
            Ok(RetryOutcome::Exhausted {
                attempts,
                last_error,
            }) => {
                error!(
                    "event=cache_load module=cache status=error error_code=retries_exhausted attempts={} duration_ms={}",
                    attempts,
                    started_at.elapsed().as_millis()
                );
                return Err(CacheError::RetriesExhausted {
                    op: CacheOp::Load,
                    path,
                    attempts,
                    source: last_error,
                });
            }
            Err(source) => {
                error!(
                    "event=cache_load module=cache status=error error_code=io_failed duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    source
                );
                return Err(CacheError::Io {
                    op: CacheOp::Load,
                    path,
                    source,
                });
            }
        };

        let notes = decode_cache(&path, &text)?;
        info!(
            "event=cache_load module=cache status=ok entries={} attempts={} duration_ms={}",
            notes.len(),
            attempts,
            started_at.elapsed().as_millis()
        );
        Ok(Self { path, notes })
    }

    /// Writes the whole cache to disk via temp file + rename.
    ///
    /// A missing parent directory is created and the write retried.
    pub fn save(&self) -> CacheResult<()> {
        let started_at = Instant::now();
        let payload = serde_json::to_vec(&self.notes).map_err(CacheError::Encode)?;

        let outcome = retry_on_not_found(
            MAX_CACHE_ATTEMPTS,
            |_| write_atomic(&self.path, &payload),
            || create_parent_dir(&self.path),
        );

        match outcome {
            Ok(RetryOutcome::Done { attempts, .. }) => {
                info!(
                    "event=cache_save module=cache status=ok entries={} bytes={} attempts={} duration_ms={}",
                    self.notes.len(),
                    payload.len(),
                    attempts,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Ok(RetryOutcome::Exhausted {
                attempts,
                last_error,
            }) => {
                error!(
                    "event=cache_save module=cache status=error error_code=retries_exhausted attempts={}",
                    attempts
                );
                Err(CacheError::RetriesExhausted {
                    op: CacheOp::Save,
                    path: self.path.clone(),
                    attempts,
                    source: last_error,
                })
            }
            Err(source) => {
                error!(
                    "event=cache_save module=cache status=error error_code=io_failed error={}",
                    source
                );
                Err(CacheError::Io {
                    op: CacheOp::Save,
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&NoteRecord> {
        self.notes.get(key)
    }

    /// Stores `record` under `key`, returning the superseded record.
    pub fn put(&mut self, key: impl Into<NoteKey>, record: NoteRecord) -> Option<NoteRecord> {
        self.notes.insert(key.into(), record)
    }

    pub fn delete(&mut self, key: &str) -> Option<NoteRecord> {
        self.notes.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.notes.contains_key(key)
    }

    /// Cached keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.notes.keys().map(String::as_str)
    }

    /// `(key, syncnum)` pairs in ascending key order.
    pub fn revisions(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.notes
            .iter()
            .map(|(key, record)| (key.as_str(), record.syncnum))
    }

    pub fn records(&self) -> impl Iterator<Item = &NoteRecord> + '_ {
        self.notes.values()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

fn decode_cache(path: &Path, text: &str) -> CacheResult<BTreeMap<NoteKey, NoteRecord>> {
    // A zero-length file (e.g. created with `touch`) is an empty cache.
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let notes: BTreeMap<NoteKey, NoteRecord> =
        serde_json::from_str(text).map_err(|source| {
            error!(
                "event=cache_load module=cache status=error error_code=corrupt error={}",
                source
            );
            CacheError::Corrupt {
                path: path.to_path_buf(),
                source,
            }
        })?;

    if let Some((map_key, record)) = notes.iter().find(|(key, record)| **key != record.key) {
        return Err(CacheError::InconsistentEntry {
            path: path.to_path_buf(),
            map_key: map_key.clone(),
            record_key: record.key.clone(),
        });
    }

    Ok(notes)
}

fn create_empty_cache_file(path: &Path) -> io::Result<()> {
    create_parent_dir(path)?;
    info!("event=cache_bootstrap module=cache status=ok");
    write_atomic(path, EMPTY_CACHE_DOCUMENT)
}

fn create_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
