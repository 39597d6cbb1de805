//! Process logging bootstrap.
//!
//! # Responsibility
//! - Initialize rolling file logs under the data directory once per process.
//! - Optionally mirror warnings and errors to stderr for interactive runs.
//!
//! # Invariants
//! - Logging init is idempotent for identical settings.
//! - Re-initialization with different settings is rejected.
//! - Initialization never panics.
//! - Log events are metadata-only: no credentials, tokens or note bodies.

use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "snbackup";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

/// Requested logging setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
    /// Mirror `warn` and above to stderr.
    pub echo_to_stderr: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct ActiveSettings {
    level: &'static str,
    log_dir: PathBuf,
    echo_to_stderr: bool,
}

struct LoggingState {
    active: ActiveSettings,
    _logger: LoggerHandle,
}

/// Initializes logging, returning a human-readable error on failure.
///
/// # Errors
/// - Unsupported level, or an empty/relative `log_dir`.
/// - Log directory creation or logger backend failure.
/// - Logging already active with different settings.
pub fn init_logging(settings: &LogSettings) -> Result<(), String> {
    let requested = ActiveSettings {
        level: normalize_level(&settings.level)?,
        log_dir: normalize_log_dir(&settings.log_dir)?,
        echo_to_stderr: settings.echo_to_stderr,
    };

    if let Some(state) = LOGGING_STATE.get() {
        return ensure_same(&state.active, &requested);
    }

    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, String> {
        std::fs::create_dir_all(&requested.log_dir).map_err(|err| {
            format!(
                "failed to create log directory `{}`: {err}",
                requested.log_dir.display()
            )
        })?;

        let duplicate = if requested.echo_to_stderr {
            Duplicate::Warn
        } else {
            Duplicate::None
        };
        let logger = Logger::try_with_str(requested.level)
            .map_err(|err| format!("invalid log level `{}`: {err}", requested.level))?
            .log_to_file(
                FileSpec::default()
                    .directory(requested.log_dir.as_path())
                    .basename(LOG_FILE_BASENAME),
            )
            .rotate(
                Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(MAX_LOG_FILES),
            )
            .duplicate_to_stderr(duplicate)
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(|err| format!("failed to start logger: {err}"))?;

        install_panic_hook_once();

        info!(
            "event=app_start module=core status=ok platform={} build_mode={} version={}",
            std::env::consts::OS,
            build_mode(),
            env!("CARGO_PKG_VERSION")
        );
        info!(
            "event=logging_init module=core status=ok level={} log_dir={}",
            requested.level,
            requested.log_dir.display()
        );

        Ok(LoggingState {
            active: ActiveSettings {
                level: requested.level,
                log_dir: requested.log_dir.clone(),
                echo_to_stderr: requested.echo_to_stderr,
            },
            _logger: logger,
        })
    })?;

    ensure_same(&state.active, &requested)
}

/// Returns `(level, log_dir)` when logging is active.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.active.level, state.active.log_dir.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn ensure_same(active: &ActiveSettings, requested: &ActiveSettings) -> Result<(), String> {
    if active.log_dir != requested.log_dir {
        return Err(format!(
            "logging already initialized at `{}`; refusing to switch to `{}`",
            active.log_dir.display(),
            requested.log_dir.display()
        ));
    }
    if active.level != requested.level {
        return Err(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            active.level, requested.level
        ));
    }
    if active.echo_to_stderr != requested.echo_to_stderr {
        return Err("logging already initialized with a different stderr mode".to_string());
    }
    Ok(())
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn normalize_log_dir(log_dir: &Path) -> Result<PathBuf, String> {
    if log_dir.as_os_str().is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    if !log_dir.is_absolute() {
        return Err(format!(
            "log_dir must be an absolute path, got `{}`",
            log_dir.display()
        ));
    }
    Ok(log_dir.to_path_buf())
}

fn build_mode() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.get().is_some() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Panic payloads may quote note content; keep them short and single-line.
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_summary(panic_info);
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location, payload
        );
        previous_hook(panic_info);
    }));

    let _ = PANIC_HOOK_INSTALLED.set(());
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, normalize_level, normalize_log_dir, sanitize_message,
        LogSettings,
    };
    use std::path::Path;

    #[test]
    fn normalize_level_accepts_known_values() {
        assert_eq!(normalize_level("INFO").expect("INFO should normalize"), "info");
        assert_eq!(
            normalize_level(" warning ").expect("warning should normalize"),
            "warn"
        );
        assert!(normalize_level("verbose").is_err());
    }

    #[test]
    fn normalize_log_dir_rejects_relative_path() {
        let error =
            normalize_log_dir(Path::new("logs/dev")).expect_err("relative paths must be rejected");
        assert!(error.contains("absolute"));
    }

    #[test]
    fn sanitize_message_removes_newlines_and_truncates() {
        let sanitized = sanitize_message("line1\nline2\rline3", 8);
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn init_logging_is_idempotent_for_same_settings_and_rejects_conflicts() {
        let first_dir = tempfile::tempdir().expect("tempdir");
        let second_dir = tempfile::tempdir().expect("tempdir");
        let settings = LogSettings {
            level: "info".to_string(),
            log_dir: first_dir.path().join("logs"),
            echo_to_stderr: false,
        };

        init_logging(&settings).expect("first init should succeed");
        init_logging(&settings).expect("same settings should be idempotent");

        let level_error = init_logging(&LogSettings {
            level: "debug".to_string(),
            ..settings.clone()
        })
        .expect_err("level conflict should fail");
        assert!(level_error.contains("refusing to switch"));

        let dir_error = init_logging(&LogSettings {
            log_dir: second_dir.path().to_path_buf(),
            ..settings.clone()
        })
        .expect_err("directory conflict should fail");
        assert!(dir_error.contains("refusing to switch"));

        let (active_level, active_dir) = logging_status().expect("logging should be active");
        assert_eq!(active_level, "info");
        assert_eq!(active_dir, settings.log_dir);
    }
}
