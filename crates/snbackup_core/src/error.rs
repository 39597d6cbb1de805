//! Top-level error for one backup run.
//!
//! # Invariants
//! - Every variant is fatal and maps to a non-zero exit code.

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::export::ExportError;
use crate::remote::RemoteError;
use crate::sync::SyncError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BackupResult<T> = Result<T, BackupError>;

#[derive(Debug)]
pub enum BackupError {
    Config(ConfigError),
    Cache(CacheError),
    Remote(RemoteError),
    Export(ExportError),
}

impl BackupError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Stable short code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::Cache(_) => "cache_io_error",
            Self::Remote(_) => "remote_error",
            Self::Export(_) => "export_error",
        }
    }
}

impl Display for BackupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Cache(err) => write!(f, "{err}"),
            Self::Remote(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Cache(err) => Some(err),
            Self::Remote(err) => Some(err),
            Self::Export(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BackupError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<CacheError> for BackupError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

impl From<RemoteError> for BackupError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

impl From<ExportError> for BackupError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<SyncError> for BackupError {
    fn from(value: SyncError) -> Self {
        match value {
            SyncError::Remote(err) => Self::Remote(err),
            SyncError::Cache(err) => Self::Cache(err),
        }
    }
}
