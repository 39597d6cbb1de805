//! Core logic for the Simplenote backup tool.
//! This crate owns the cache invariants; the CLI only wires it together.

mod atomic_file;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod model;
pub mod remote;
pub mod service;
pub mod sync;

pub use cache::{CacheError, CacheOp, CacheResult, CacheStore, MAX_CACHE_ATTEMPTS};
pub use config::{load_config, AppConfig, ConfigError};
pub use error::{BackupError, BackupResult};
pub use export::{build_export, write_export, ExportDocument, ExportError, ExportNote};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings};
pub use model::note::{IndexSnapshot, NoteKey, NoteRecord, NoteSummary, Timestamp};
pub use remote::{
    Credentials, Endpoints, IndexProvider, NoteFetcher, RemoteError, RemoteResult,
    SimplenoteClient,
};
pub use service::backup_service::{BackupProgress, BackupReport, BackupService};
pub use sync::{
    plan_reconcile, reconcile, run_fetch_loop, ChangeSet, FetchOptions, FetchReport,
    ReconcilePlan, SyncError, DEFAULT_CHECKPOINT_EVERY,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
