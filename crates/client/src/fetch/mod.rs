//! HTTP fetch transport.
//!
//! ### Behavior
//! - rustls TLS; gzip/brotli/deflate decoded transparently
//! - Max redirects: 5 (configurable)
//! - Max body bytes: 5MB (configurable), enforced against both the
//!   Content-Length header and the decoded body
//! - Non-2xx statuses are transport errors; callers decide whether a
//!   cache fallback applies

pub mod origin;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};

pub use reqwest::{Method, StatusCode, Url};

use shellcache_core::{CachedAsset, Error};

/// How a fetch treats intermediate HTTP caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Normal request; intermediate caches may answer.
    #[default]
    Default,
    /// Forced revalidation: `Cache-Control: no-cache` so the bytes come
    /// from the origin, not a stale intermediary. Used while staging the
    /// core set.
    Reload,
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shellcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Convert into a storable asset stamped with the current time.
    pub fn into_asset(self) -> CachedAsset {
        CachedAsset::new(self.bytes.to_vec(), self.content_type)
    }
}

/// Fetch-capable transport the cache manager depends on.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a URL, returning raw bytes and metadata.
    ///
    /// A connection failure, timeout, cancellation, or non-success status
    /// all surface as an error; no default response is synthesized.
    async fn fetch(&self, url: &Url, mode: FetchMode) -> Result<FetchResponse, Error>;
}

/// HTTP transport backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for FetchClient {
    async fn fetch(&self, url: &Url, mode: FetchMode) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let mut request = self.http.get(url.as_str());
        if mode == FetchMode::Reload {
            request = request.header(header::CACHE_CONTROL, "no-cache").header(header::PRAGMA, "no-cache");
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("network error: {e}")))?;

        let status = response.status();

        if !status.is_success() {
            return Err(Error::Http(format!("status {}", status.as_u16())));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(format!("failed to read response: {e}")))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", url, final_url, fetch_ms, bytes.len());

        Ok(FetchResponse { url: url.clone(), final_url, status, content_type, bytes, fetch_ms })
    }
}
