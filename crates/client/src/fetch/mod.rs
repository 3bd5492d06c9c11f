//! HTTP fetch pipeline for the offline engine.
//!
//! The engine never interprets response content: it captures status,
//! headers, and body bytes and hands them on. Two deliberate differences
//! from a scraping client:
//!
//! - HTTP error statuses are *results*, not errors. The page gets its
//!   404s back unchanged; the store just refuses to keep them.
//! - `Err` from [`Fetch::fetch`] means transport failure only (offline,
//!   DNS, client-level timeout), which is exactly the signal the
//!   strategies' fallbacks key on.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, StatusCode, header};
use serde::{Deserialize, Serialize};

use swkit_core::Error;
use swkit_core::cache::key::request_key;

pub use url::{UrlError, canonicalize, resolve};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swkit/0.1")
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
            user_agent: "swkit/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// A page request the engine has intercepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebRequest {
    /// HTTP method, uppercase.
    pub method: String,

    /// Absolute request URL as the page issued it.
    pub url: String,

    /// True for top-level document navigations; drives the offline-page
    /// fallback.
    #[serde(default)]
    pub is_navigation: bool,

    /// Body forwarded for non-read methods.
    #[serde(default)]
    pub body: Option<Vec<u8>>,
}

impl WebRequest {
    /// A plain GET for `url`.
    pub fn get(url: &str) -> Self {
        Self { method: "GET".to_string(), url: url.to_string(), is_navigation: false, body: None }
    }

    /// A top-level document navigation to `url`.
    pub fn navigation(url: &str) -> Self {
        Self { is_navigation: true, ..Self::get(url) }
    }

    /// Store key for this request: method + canonical URL, query included.
    pub fn cache_key(&self) -> Result<String, UrlError> {
        let canonical = url::canonicalize(&self.url)?;
        Ok(request_key(&self.method, canonical.as_str()))
    }
}

/// Captured network response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested.
    pub url: reqwest::Url,
    /// The final URL after redirects.
    pub final_url: reqwest::Url,
    /// HTTP status code.
    pub status: StatusCode,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Response body bytes, fully read.
    pub bytes: Bytes,
    /// Response headers.
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds.
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Assemble a response from parts. Embedding hosts and scripted fakes
    /// build responses this way; the real client fills in headers and
    /// timing itself.
    pub fn from_parts(url: &str, status: u16, content_type: Option<&str>, body: impl Into<Bytes>) -> Result<Self, Error> {
        let url = reqwest::Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let final_url = url.clone();
        let status = StatusCode::from_u16(status).map_err(|e| Error::Network(e.to_string()))?;

        let mut headers = header::HeaderMap::new();
        if let Some(ct) = content_type
            && let Ok(value) = header::HeaderValue::from_str(ct)
        {
            headers.insert(header::CONTENT_TYPE, value);
        }

        Ok(Self {
            url,
            final_url,
            status,
            content_type: content_type.map(String::from),
            bytes: body.into(),
            headers,
            fetch_ms: 0,
        })
    }

    /// Header pairs in a storable form; values that aren't valid UTF-8
    /// are skipped.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect()
    }
}

/// Network access seam for the engine.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Perform the request.
    ///
    /// `Err` means transport failure only; HTTP error statuses come back
    /// as responses.
    async fn fetch(&self, request: &WebRequest) -> Result<FetchResponse, Error>;
}

/// reqwest-backed fetch client.
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
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetch for FetchClient {
    async fn fetch(&self, request: &WebRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = url::canonicalize(&request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::Network(format!("unsupported method {}", request.method)))?;

        let mut outgoing = self.http.request(method, url.clone());
        if let Some(body) = &request.body {
            outgoing = outgoing.body(body.clone());
        }

        let response = outgoing.send().await.map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {e}")))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::Network(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} {} in {}ms ({} bytes)",
            url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, final_url, status, content_type, bytes, headers, fetch_ms })
    }
}
