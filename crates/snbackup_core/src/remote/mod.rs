//! Remote note service contracts and the Simplenote HTTP client.
//!
//! # Responsibility
//! - Define the capabilities the sync core calls (`IndexProvider`,
//!   `NoteFetcher`) independently of transport.
//! - Map transport/status/decode failures to one `RemoteError` type.
//!
//! # Invariants
//! - Error messages never include credentials or auth tokens.

use crate::model::note::{IndexSnapshot, NoteKey, NoteRecord};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod simplenote;

pub use simplenote::{Credentials, Endpoints, SimplenoteClient};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Source of the full remote note index.
pub trait IndexProvider {
    /// Returns every summary, concatenated across pages.
    fn fetch_index(&self) -> RemoteResult<IndexSnapshot>;
}

/// Source of full note records.
pub trait NoteFetcher {
    fn fetch_note(&self, key: &str) -> RemoteResult<NoteRecord>;
}

/// Remote call failure.
#[derive(Debug)]
pub enum RemoteError {
    /// A data call was attempted before `login`.
    NotAuthenticated,
    /// Login completed but produced no usable token.
    Auth(String),
    /// A note fetch was requested with an empty key.
    MissingKey,
    /// Connection/timeout/body-read failure.
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Non-2xx response.
    Http { endpoint: String, status: u16 },
    /// Response body is not the expected JSON shape.
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },
    /// The service answered a note fetch with another note.
    UnexpectedKey { requested: NoteKey, received: NoteKey },
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "no auth token, login first"),
            Self::Auth(message) => write!(f, "authentication failed: {message}"),
            Self::MissingKey => write!(f, "unable to get note: key not given"),
            Self::Transport { endpoint, source } => {
                write!(f, "request to `{endpoint}` failed: {source}")
            }
            Self::Http { endpoint, status } => {
                write!(f, "http error {status} from `{endpoint}`")
            }
            Self::Decode { endpoint, source } => {
                write!(f, "unexpected response from `{endpoint}`: {source}")
            }
            Self::UnexpectedKey {
                requested,
                received,
            } => write!(f, "requested note `{requested}` but received `{received}`"),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source),
            Self::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}
