//! Sequential fetch-and-persist loop.
//!
//! # Responsibility
//! - Fetch every key of a change set and store the result in the cache.
//! - Checkpoint the cache every `checkpoint_every` notes and once at the end.
//!
//! # Invariants
//! - A fetch failure stops the loop immediately; nothing is saved after it,
//!   so the last checkpoint is the durable state.
//! - The final save runs even for an empty change set, so evictions persist.

use super::SyncError;
use crate::cache::CacheStore;
use crate::model::note::NoteKey;
use crate::remote::{NoteFetcher, RemoteError};
use log::{error, info};
use std::time::Instant;

pub const DEFAULT_CHECKPOINT_EVERY: usize = 50;

/// Fetch loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Notes processed between checkpoints; `0` means the default.
    pub checkpoint_every: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
        }
    }
}

impl FetchOptions {
    pub fn effective_checkpoint_every(&self) -> usize {
        if self.checkpoint_every == 0 {
            DEFAULT_CHECKPOINT_EVERY
        } else {
            self.checkpoint_every
        }
    }
}

/// Counters for one completed fetch loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub fetched: usize,
    /// Intermediate saves, excluding the final one.
    pub checkpoints: usize,
}

/// Fetches `keys` in order into `store`.
///
/// `on_progress(done, total)` runs after each stored note.
pub fn run_fetch_loop<F, P>(
    fetcher: &F,
    store: &mut CacheStore,
    keys: &[NoteKey],
    options: &FetchOptions,
    mut on_progress: P,
) -> Result<FetchReport, SyncError>
where
    F: NoteFetcher + ?Sized,
    P: FnMut(usize, usize),
{
    let started_at = Instant::now();
    let checkpoint_every = options.effective_checkpoint_every();
    let total = keys.len();
    let mut report = FetchReport::default();
    info!(
        "event=fetch_loop module=sync status=start total={} checkpoint_every={}",
        total, checkpoint_every
    );

    for key in keys {
        let record = match fetcher.fetch_note(key) {
            Ok(record) => record,
            Err(err) => {
                error!(
                    "event=fetch_loop module=sync status=error error_code=fetch_failed done={} total={} error={}",
                    report.fetched, total, err
                );
                return Err(err.into());
            }
        };
        if record.key != *key {
            return Err(RemoteError::UnexpectedKey {
                requested: key.clone(),
                received: record.key,
            }
            .into());
        }

        store.put(key.clone(), record);
        report.fetched += 1;
        on_progress(report.fetched, total);

        if report.fetched % checkpoint_every == 0 {
            store.save()?;
            report.checkpoints += 1;
        }
    }

    store.save()?;
    info!(
        "event=fetch_loop module=sync status=ok fetched={} checkpoints={} duration_ms={}",
        report.fetched,
        report.checkpoints,
        started_at.elapsed().as_millis()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::FetchOptions;

    #[test]
    fn zero_checkpoint_interval_falls_back_to_default() {
        let options = FetchOptions {
            checkpoint_every: 0,
        };
        assert_eq!(options.effective_checkpoint_every(), 50);
        assert_eq!(FetchOptions::default().effective_checkpoint_every(), 50);
    }
}
