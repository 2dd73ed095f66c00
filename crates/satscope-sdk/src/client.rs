//! Resource fetching against the mempool REST API.
//!
//! [`ResourceFetcher`] is the transport seam: one GET primitive that returns
//! the raw body. [`ApiClient`] layers the response cache on top of it.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, info};

use crate::cache::{cache_key, CacheStore};
use crate::errors::{ApiError, Result};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RESOURCE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Connect timeout and maximum idle time between reads
    pub request_timeout: Duration,
    /// Ceiling on the whole exchange, body included
    pub resource_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            resource_timeout: DEFAULT_RESOURCE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    pub status: u16,
}

/// Thin async facade over the REST API.
///
/// `fetch()` is the only network primitive; everything else in the crate is
/// derived from it.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// GET `path` relative to the base URL. Non-2xx statuses are errors.
    async fn fetch(&self, path: &str) -> Result<FetchedBody>;

    fn base_url(&self) -> String;

    fn set_base_url(&self, base_url: &str) -> Result<()>;
}

fn parse_base_url(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|e| ApiError::Config(format!("invalid base URL {trimmed:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::Config(format!(
            "unsupported scheme in base URL {trimmed:?}"
        )));
    }
    Ok(trimmed.to_string())
}

/// `reqwest` implementation of [`ResourceFetcher`].
#[derive(Debug)]
pub struct HttpFetcher {
    base_url: RwLock<String>,
    http: Client,
}

impl HttpFetcher {
    pub fn new(base_url: &str, config: FetcherConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.request_timeout)
            .read_timeout(config.request_timeout)
            .timeout(config.resource_timeout)
            .user_agent(concat!("satscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: RwLock::new(parse_base_url(base_url)?),
            http,
        })
    }

    fn url_for(&self, path: &str) -> String {
        let base = self.base_url.read().unwrap_or_else(|e| e.into_inner());
        format!("{}{}", base, path)
    }

    /// Keeps transport details such as resolved addresses out of the message.
    fn describe(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_body() {
            "response body error".to_string()
        } else if error.is_redirect() {
            "too many redirects".to_string()
        } else if error.is_request() {
            "request failed".to_string()
        } else {
            "network error".to_string()
        }
    }

    fn map_error(path: &str, error: reqwest::Error, started: Instant) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout {
                path: path.to_string(),
                after: started.elapsed(),
            }
        } else {
            ApiError::Network {
                path: path.to_string(),
                reason: Self::describe(&error),
            }
        }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<FetchedBody> {
        let url = self.url_for(path);
        let started = Instant::now();
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::map_error(path, e, started))?;

        let status = response.status();
        if !status.is_success() {
            debug!(path, status = status.as_u16(), "Upstream returned error status");
            return Err(ApiError::Http {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(path, e, started))?;
        debug!(path, bytes = bytes.len(), elapsed = ?started.elapsed(), "Fetched resource");
        Ok(FetchedBody {
            bytes: bytes.to_vec(),
            status: status.as_u16(),
        })
    }

    fn base_url(&self) -> String {
        self.base_url
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_base_url(&self, base_url: &str) -> Result<()> {
        let parsed = parse_base_url(base_url)?;
        *self.base_url.write().unwrap_or_else(|e| e.into_inner()) = parsed;
        Ok(())
    }
}

/// Body handed back by [`ApiClient::fetch_with_cache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub bytes: Vec<u8>,
    pub from_cache: bool,
}

/// Cache-aware API access shared by every consumer.
pub struct ApiClient {
    fetcher: Arc<dyn ResourceFetcher>,
    cache: Arc<CacheStore>,
}

impl ApiClient {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, cache: Arc<CacheStore>) -> Self {
        Self { fetcher, cache }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn base_url(&self) -> String {
        self.fetcher.base_url()
    }

    /// Switch to another endpoint. Cached bodies from the previous endpoint
    /// are dropped so they are never served for the new one.
    pub async fn set_base_url(&self, base_url: &str) -> Result<()> {
        let previous = self.fetcher.base_url();
        self.fetcher.set_base_url(base_url)?;
        let current = self.fetcher.base_url();
        if previous != current {
            info!(from = %previous, to = %current, "Switched API endpoint");
            self.cache.clear().await;
        }
        Ok(())
    }

    /// Live fetch, no cache involvement.
    pub async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        Ok(self.fetcher.fetch(path).await?.bytes)
    }

    /// Cache first; on a miss, fetch live and store the body on success.
    /// A failed live fetch is returned unchanged.
    pub async fn fetch_with_cache(&self, path: &str) -> Result<Body> {
        let key = cache_key(path);
        if let Some(bytes) = self.cache.get(&key).await {
            debug!(path, "Cache hit");
            return Ok(Body {
                bytes,
                from_cache: true,
            });
        }
        debug!(path, "Cache miss");
        let body = self.fetcher.fetch(path).await?;
        self.cache.put(&key, &body.bytes).await;
        Ok(Body {
            bytes: body.bytes,
            from_cache: false,
        })
    }

    /// Drop the cached body for `path`, e.g. after it failed to decode.
    pub async fn evict(&self, path: &str) {
        self.cache.evict(&cache_key(path)).await;
    }
}
