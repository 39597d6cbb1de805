//! Blocking Simplenote api2 client.
//!
//! # Responsibility
//! - Log in and keep the auth token for subsequent calls.
//! - Walk the paginated index until the service stops sending `mark`.
//! - Fetch single notes and count issued API calls.
//!
//! # Invariants
//! - Index pagination is bounded by `max_index_pages`; stopping early yields a
//!   snapshot flagged incomplete.
//! - Requests are sequential; no retries are performed here.

use super::{IndexProvider, NoteFetcher, RemoteError, RemoteResult};
use crate::model::note::{IndexSnapshot, NoteRecord, NoteSummary};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use log::{debug, error, info, warn};
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::cell::Cell;
use std::fmt::{Debug, Formatter};
use std::time::{Duration, Instant};

pub const DEFAULT_LOGIN_URL: &str = "https://simple-note.appspot.com/api/login";
pub const DEFAULT_API_BASE: &str = "https://simple-note.appspot.com/api2/";
/// Largest page the index endpoint serves.
pub const INDEX_PAGE_MAX: u32 = 100;
pub const MAX_INDEX_PAGES: u32 = 1000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Account credentials read from configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Service URLs; overridable for self-hosted mirrors and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login_url: String,
    /// Base for `index` and `data/<key>`, with trailing slash.
    pub api_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Endpoints {
    /// Builds endpoints, normalizing `api_base` to end with `/`.
    pub fn new(login_url: impl Into<String>, api_base: impl Into<String>) -> Self {
        let mut api_base = api_base.into();
        if !api_base.ends_with('/') {
            api_base.push('/');
        }
        Self {
            login_url: login_url.into(),
            api_base,
        }
    }
}

/// One page of the remote index.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexPage {
    #[serde(default)]
    pub data: Vec<NoteSummary>,
    #[serde(default)]
    pub mark: Option<String>,
}

/// Simplenote api2 client over `reqwest::blocking`.
pub struct SimplenoteClient {
    http: Client,
    credentials: Credentials,
    endpoints: Endpoints,
    auth_token: Option<String>,
    api_calls: Cell<u64>,
    max_index_pages: u32,
}

impl SimplenoteClient {
    pub fn new(credentials: Credentials, endpoints: Endpoints) -> RemoteResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| RemoteError::Transport {
                endpoint: "client".to_string(),
                source,
            })?;
        Ok(Self {
            http,
            credentials,
            endpoints,
            auth_token: None,
            api_calls: Cell::new(0),
            max_index_pages: MAX_INDEX_PAGES,
        })
    }

    /// Overrides the pagination bound.
    pub fn with_max_index_pages(mut self, max_pages: u32) -> Self {
        self.max_index_pages = max_pages.max(1);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Number of api2 requests issued so far (login excluded).
    pub fn api_calls(&self) -> u64 {
        self.api_calls.get()
    }

    /// Exchanges credentials for an auth token.
    ///
    /// The request body is the base64 of `email=..&password=..`.
    pub fn login(&mut self) -> RemoteResult<()> {
        let started_at = Instant::now();
        info!("event=remote_login module=remote status=start");
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("email", &self.credentials.email)
            .append_pair("password", &self.credentials.password)
            .finish();

        let response = self
            .http
            .post(&self.endpoints.login_url)
            .body(BASE64_STANDARD.encode(form))
            .send()
            .map_err(|source| transport("login", source))?;
        let body = read_success_body("login", response)?;

        let token = body.trim();
        if token.is_empty() {
            error!("event=remote_login module=remote status=error error_code=empty_token");
            return Err(RemoteError::Auth("service returned an empty token".to_string()));
        }

        self.auth_token = Some(token.to_string());
        info!(
            "event=remote_login module=remote status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Fetches one index page of at most `length` (clamped to 1..=100) entries.
    pub fn index_page(&self, length: u32, mark: Option<&str>) -> RemoteResult<IndexPage> {
        let length = length.clamp(1, INDEX_PAGE_MAX).to_string();
        let mut query = vec![("length", length.as_str())];
        if let Some(mark) = mark {
            query.push(("mark", mark));
        }
        self.get_json("index", &query)
    }

    fn get_json<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> RemoteResult<T> {
        let token = self
            .auth_token
            .as_deref()
            .ok_or(RemoteError::NotAuthenticated)?;

        let url = format!("{}{endpoint}", self.endpoints.api_base);
        self.api_calls.set(self.api_calls.get() + 1);
        debug!(
            "event=remote_get module=remote status=start call={}",
            self.api_calls.get()
        );

        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("auth", token), ("email", self.credentials.email.as_str())])
            .send()
            .map_err(|source| transport(endpoint, source))?;
        let body = read_success_body(endpoint, response)?;
        serde_json::from_str(&body).map_err(|source| {
            error!(
                "event=remote_get module=remote status=error error_code=decode_failed endpoint={} error={}",
                endpoint_label(endpoint),
                source
            );
            RemoteError::Decode {
                endpoint: endpoint.to_string(),
                source,
            }
        })
    }
}

impl IndexProvider for SimplenoteClient {
    fn fetch_index(&self) -> RemoteResult<IndexSnapshot> {
        let started_at = Instant::now();
        let mut entries = Vec::new();
        let mut mark: Option<String> = None;
        let mut pages = 0;

        loop {
            if pages >= self.max_index_pages {
                warn!(
                    "event=remote_index module=remote status=truncated pages={} entries={}",
                    pages,
                    entries.len()
                );
                return Ok(IndexSnapshot::truncated(entries, pages));
            }

            let page = self.index_page(INDEX_PAGE_MAX, mark.as_deref())?;
            pages += 1;
            entries.extend(page.data);
            match page.mark {
                Some(next) if !next.is_empty() => mark = Some(next),
                _ => break,
            }
        }

        info!(
            "event=remote_index module=remote status=ok pages={} entries={} duration_ms={}",
            pages,
            entries.len(),
            started_at.elapsed().as_millis()
        );
        Ok(IndexSnapshot {
            entries,
            complete: true,
            pages,
        })
    }
}

impl NoteFetcher for SimplenoteClient {
    fn fetch_note(&self, key: &str) -> RemoteResult<NoteRecord> {
        if key.trim().is_empty() {
            return Err(RemoteError::MissingKey);
        }
        let endpoint = format!("data/{key}");
        self.get_json(&endpoint, &[])
    }
}

fn read_success_body(endpoint: &str, response: Response) -> RemoteResult<String> {
    let status = response.status();
    if !status.is_success() {
        error!(
            "event=remote_call module=remote status=error error_code=http_status endpoint={} http_status={}",
            endpoint_label(endpoint),
            status.as_u16()
        );
        return Err(RemoteError::Http {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }
    response.text().map_err(|source| transport(endpoint, source))
}

fn transport(endpoint: &str, source: reqwest::Error) -> RemoteError {
    // Why: request URLs carry the auth token in the query string.
    let source = source.without_url();
    error!(
        "event=remote_call module=remote status=error error_code=transport endpoint={} error={}",
        endpoint_label(endpoint),
        source
    );
    RemoteError::Transport {
        endpoint: endpoint.to_string(),
        source,
    }
}

/// Collapses `data/<key>` so logs stay metadata-only.
fn endpoint_label(endpoint: &str) -> &str {
    if endpoint.starts_with("data/") {
        "data"
    } else {
        endpoint
    }
}
