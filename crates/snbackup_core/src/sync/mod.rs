//! Cache synchronization against the remote index.
//!
//! # Responsibility
//! - Decide which notes to fetch and which cached notes to evict.
//! - Drive the sequential fetch loop with periodic checkpoints.
//!
//! # Invariants
//! - Eviction happens only against a complete index snapshot.
//! - After a successful fetch loop the cache file reflects every fetched note.
//! - The cache has a single writer: callers pass `&mut CacheStore`.

use crate::cache::CacheError;
use crate::remote::RemoteError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod fetch_loop;
pub mod reconcile;

pub use fetch_loop::{run_fetch_loop, FetchOptions, FetchReport, DEFAULT_CHECKPOINT_EVERY};
pub use reconcile::{plan_reconcile, reconcile, ChangeSet, ReconcilePlan};

/// Fetch loop failure.
#[derive(Debug)]
pub enum SyncError {
    Remote(RemoteError),
    Cache(CacheError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(err) => write!(f, "{err}"),
            Self::Cache(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Remote(err) => Some(err),
            Self::Cache(err) => Some(err),
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

impl From<CacheError> for SyncError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}
