use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Conditional-request validators remembered for one feed URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl Validators {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            etag: header_value(headers, ETAG),
            last_modified: header_value(headers, LAST_MODIFIED),
        }
    }

    /// Take over fresh validators, keeping the previous value for any
    /// header the response omitted.
    pub fn merge_from(&mut self, fresh: Validators) {
        if fresh.etag.is_some() {
            self.etag = fresh.etag;
        }
        if fresh.last_modified.is_some() {
            self.last_modified = fresh.last_modified;
        }
    }
}

fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Per-source validator store. Read before a fetch, written after a
/// successful one; access only goes through these two methods.
#[derive(Default)]
pub struct ValidatorCache {
    entries: RwLock<HashMap<String, Validators>>,
}

impl ValidatorCache {
    pub async fn get(&self, url: &str) -> Option<Validators> {
        self.entries.read().await.get(url).cloned()
    }

    pub async fn update(&self, url: &str, fresh: Validators) {
        let mut entries = self.entries.write().await;
        entries.entry(url.to_string()).or_default().merge_from(fresh);
    }
}

/// Outcome of a single feed retrieval.
pub enum FetchBody {
    Fresh(Vec<u8>),
    /// The server answered 304; the cached validators are still current.
    NotModified,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
}

pub struct Fetcher {
    client: Client,
    validators: ValidatorCache,
}

impl Fetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("Newswire/0.1 (RSS Aggregator)")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            validators: ValidatorCache::default(),
        }
    }

    /// One GET against a feed URL. Attaches `If-None-Match` /
    /// `If-Modified-Since` when validators are held from an earlier fetch;
    /// a 304 answer maps to `FetchBody::NotModified`.
    pub async fn fetch(&self, url: &str) -> Result<FetchBody, FetchError> {
        let held = self.validators.get(url).await;

        let mut request = self.client.get(url);
        if let Some(validators) = &held {
            if let Some(etag) = validators.etag.as_deref() {
                request = request.header(IF_NONE_MATCH, etag);
            }
            if let Some(last_modified) = validators.last_modified.as_deref() {
                request = request.header(IF_MODIFIED_SINCE, last_modified);
            }
        }

        let response = request.send().await?;

        if response.status() == StatusCode::NOT_MODIFIED {
            debug!("Feed not modified: {}", url);
            return Ok(FetchBody::NotModified);
        }

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let fresh = Validators::from_headers(response.headers());
        let body = response.bytes().await?.to_vec();
        self.validators.update(url, fresh).await;

        Ok(FetchBody::Fresh(body))
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}
