//! Configuration file discovery and parsing.
//!
//! # Responsibility
//! - Locate the TOML config either at the given path or next to the binary.
//! - Turn it into typed settings for the client, cache and fetch loop.
//!
//! # Invariants
//! - No cache or network work starts without a valid configuration.
//! - Passwords never appear in error messages.

use crate::remote::simplenote::{DEFAULT_API_BASE, DEFAULT_LOGIN_URL};
use crate::remote::{Credentials, Endpoints};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const CACHE_FILE_NAME: &str = "notes_cache.json";
const APP_DIR_NAME: &str = "snbackup";

#[derive(Debug)]
pub enum ConfigError {
    /// None of the candidate paths could be read.
    NotFound { tried: Vec<PathBuf> },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid { path: PathBuf, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { tried } => {
                let tried = tried
                    .iter()
                    .map(|path| format!("`{}`", path.display()))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "could not read any config file (tried {tried})")
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config file `{}`: {source}", path.display())
            }
            Self::Invalid { path, message } => {
                write!(f, "invalid config file `{}`: {message}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    simplenote: AccountSection,
    #[serde(default)]
    backup: BackupSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AccountSection {
    email: String,
    password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BackupSection {
    checkpoint_every: Option<usize>,
    cache_file: Option<PathBuf>,
    api_base: Option<String>,
    login_url: Option<String>,
}

/// Validated application settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub endpoints: Endpoints,
    pub checkpoint_every: Option<usize>,
    pub cache_file: Option<PathBuf>,
    /// File the settings were read from.
    pub source: PathBuf,
}

/// Reads the first readable candidate for `requested` and parses it.
pub fn load_config(requested: &Path) -> Result<AppConfig, ConfigError> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let candidates = candidate_paths(requested, exe_dir.as_deref());

    for candidate in &candidates {
        if let Ok(text) = std::fs::read_to_string(candidate) {
            return parse_config(&text, candidate);
        }
    }
    Err(ConfigError::NotFound { tried: candidates })
}

/// Relative paths are tried as given, then next to the executable.
pub fn candidate_paths(requested: &Path, exe_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = vec![requested.to_path_buf()];
    if requested.is_relative() {
        if let Some(dir) = exe_dir {
            let beside_exe = dir.join(requested);
            if beside_exe != requested {
                candidates.push(beside_exe);
            }
        }
    }
    candidates
}

pub fn parse_config(text: &str, source: &Path) -> Result<AppConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|err| ConfigError::Parse {
        path: source.to_path_buf(),
        source: err,
    })?;

    let invalid = |message: &str| ConfigError::Invalid {
        path: source.to_path_buf(),
        message: message.to_string(),
    };
    let email = file.simplenote.email.trim().to_string();
    if email.is_empty() {
        return Err(invalid("`simplenote.email` cannot be empty"));
    }
    if file.simplenote.password.is_empty() {
        return Err(invalid("`simplenote.password` cannot be empty"));
    }

    let endpoints = Endpoints::new(
        file.backup
            .login_url
            .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
        file.backup
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
    );

    Ok(AppConfig {
        credentials: Credentials {
            email,
            password: file.simplenote.password,
        },
        endpoints,
        checkpoint_every: file.backup.checkpoint_every,
        cache_file: file.backup.cache_file,
        source: source.to_path_buf(),
    })
}

/// Per-user data directory holding the cache and logs.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_cache_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CACHE_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::{candidate_paths, parse_config, ConfigError};
    use std::path::{Path, PathBuf};

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = parse_config(
            "[simplenote]\nemail = \" me@example.com \"\npassword = \"pw\"\n",
            Path::new("config.toml"),
        )
        .expect("config should parse");

        assert_eq!(config.credentials.email, "me@example.com");
        assert_eq!(
            config.endpoints.api_base,
            "https://simple-note.appspot.com/api2/"
        );
        assert!(config.checkpoint_every.is_none());
        assert!(config.cache_file.is_none());
    }

    #[test]
    fn parses_backup_overrides() {
        let config = parse_config(
            r#"
[simplenote]
email = "me@example.com"
password = "pw"

[backup]
checkpoint_every = 10
cache_file = "/tmp/notes.json"
api_base = "http://localhost:8080/api2"
login_url = "http://localhost:8080/api/login"
"#,
            Path::new("config.toml"),
        )
        .expect("config should parse");

        assert_eq!(config.checkpoint_every, Some(10));
        assert_eq!(config.cache_file, Some(PathBuf::from("/tmp/notes.json")));
        assert_eq!(config.endpoints.api_base, "http://localhost:8080/api2/");
    }

    #[test]
    fn rejects_blank_credentials_without_echoing_password() {
        let err = parse_config(
            "[simplenote]\nemail = \"  \"\npassword = \"topsecret\"\n",
            Path::new("config.toml"),
        )
        .expect_err("blank email must fail");
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(!err.to_string().contains("topsecret"));
    }

    #[test]
    fn missing_section_is_a_parse_error() {
        let err = parse_config("[backup]\ncheckpoint_every = 5\n", Path::new("c.toml"))
            .expect_err("account section is required");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn relative_paths_fall_back_to_executable_dir() {
        let candidates = candidate_paths(Path::new("config.toml"), Some(Path::new("/opt/sn")));
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("config.toml"),
                PathBuf::from("/opt/sn/config.toml")
            ]
        );

        let absolute = candidate_paths(Path::new("/etc/sn.toml"), Some(Path::new("/opt/sn")));
        assert_eq!(absolute, vec![PathBuf::from("/etc/sn.toml")]);
    }
}
