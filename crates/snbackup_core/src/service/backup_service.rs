//! End-to-end backup run.
//!
//! # Responsibility
//! - Sequence index fetch, reconciliation, fetch loop and export.
//! - Report progress to the caller without owning any presentation.
//!
//! # Invariants
//! - The cache is saved before the export is built, so a failed export never
//!   loses fetched notes.
//! - Any error aborts the run; nothing after the failing step executes.

use crate::cache::CacheStore;
use crate::error::BackupResult;
use crate::export::{build_export, write_export};
use crate::remote::{IndexProvider, NoteFetcher};
use crate::sync::{reconcile, run_fetch_loop, FetchOptions};
use chrono::Local;
use log::info;
use std::path::Path;
use std::time::Instant;

/// Progress notifications emitted during `BackupService::run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupProgress {
    IndexFetched { notes: usize, complete: bool },
    ChangeSetReady { to_fetch: usize, evicted: usize },
    NoteFetched { done: usize, total: usize },
}

/// Counters for one successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupReport {
    pub index_len: usize,
    pub index_complete: bool,
    pub evicted: usize,
    pub fetched: usize,
    pub checkpoints: usize,
    pub exported: usize,
    pub skipped_deleted: usize,
}

/// Backup orchestration over any remote implementing both capabilities.
pub struct BackupService<'r, R: ?Sized> {
    remote: &'r R,
    options: FetchOptions,
}

impl<'r, R> BackupService<'r, R>
where
    R: IndexProvider + NoteFetcher + ?Sized,
{
    pub fn new(remote: &'r R, options: FetchOptions) -> Self {
        Self { remote, options }
    }

    /// Brings `cache` up to date with the remote and writes the export.
    pub fn run<P>(
        &self,
        cache: &mut CacheStore,
        export_path: &Path,
        mut on_progress: P,
    ) -> BackupResult<BackupReport>
    where
        P: FnMut(BackupProgress),
    {
        let started_at = Instant::now();
        info!("event=backup_run module=service status=start");

        let index = self.remote.fetch_index()?;
        on_progress(BackupProgress::IndexFetched {
            notes: index.len(),
            complete: index.complete,
        });

        let change_set = reconcile(&index, cache);
        on_progress(BackupProgress::ChangeSetReady {
            to_fetch: change_set.to_fetch.len(),
            evicted: change_set.evicted.len(),
        });

        let fetch = run_fetch_loop(
            self.remote,
            cache,
            &change_set.to_fetch,
            &self.options,
            |done, total| on_progress(BackupProgress::NoteFetched { done, total }),
        )?;

        let document = build_export(cache.records(), &Local)?;
        write_export(export_path, &document.notes)?;

        let report = BackupReport {
            index_len: index.len(),
            index_complete: index.complete,
            evicted: change_set.evicted.len(),
            fetched: fetch.fetched,
            checkpoints: fetch.checkpoints,
            exported: document.notes.len(),
            skipped_deleted: document.skipped_deleted,
        };
        info!(
            "event=backup_run module=service status=ok index={} evicted={} fetched={} exported={} duration_ms={}",
            report.index_len,
            report.evicted,
            report.fetched,
            report.exported,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }
}
