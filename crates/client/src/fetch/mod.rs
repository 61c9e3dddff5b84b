//! Network boundary of the offline cache.
//!
//! ### Semantics
//! - Only transport failures (unreachable host, reset, timeout) are errors.
//! - Non-success statuses come back as ordinary responses; callers decide
//!   whether a 404 is fatal (install) or just uncacheable (fetch).
//! - `CacheMode::Reload` sends `Cache-Control: no-cache` and
//!   `Pragma: no-cache` so intermediaries hand back a fresh copy.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Per-request timeout: 20s (configurable)

pub mod stub;
pub mod url;

use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use stub::StubNetwork;
pub use url::{UrlError, resolve};

use bivouac_core::{AppConfig, CacheMode, Error, Request, Response, ResponseSource};

/// Anything that can carry a request to the origin server.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "bivouac/0.1")
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
            user_agent: "bivouac/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed network client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
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

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {:?}: {e}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.cache_mode == CacheMode::Reload {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("timed out after {}ms: {}", self.config.timeout.as_millis(), request.url))
            } else {
                Error::Network(format!("{}: {e}", request.url))
            }
        })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{len} bytes exceeds {}", self.config.max_bytes)));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = header_pairs(response.headers());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response body: {e}")))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} -> {} {} in {}ms ({} bytes)",
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response {
            url: final_url,
            status: status.as_u16(),
            headers,
            body: bytes.to_vec(),
            source: ResponseSource::Network,
        })
    }
}

/// Response headers in arrival order. Values that are not valid UTF-8 are
/// kept, decoded lossily.
fn header_pairs(headers: &header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "bivouac/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "site-sw/2".into(), timeout_ms: 1500, max_bytes: 1024, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "site-sw/2");
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.max_bytes, 1024);
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_header_pairs_keep_non_utf8_values() {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html"));
        headers.append("x-title", header::HeaderValue::from_bytes(b"caf\xe9").unwrap());

        let pairs = header_pairs(&headers);

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], ("content-type".to_string(), "text/html".to_string()));
        assert_eq!(pairs[1].0, "x-title");
        assert!(pairs[1].1.starts_with("caf"));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_network_error() {
        let client = FetchClient::new(FetchConfig { timeout: Duration::from_millis(500), ..Default::default() }).unwrap();
        let request = Request::get(::url::Url::parse("http://127.0.0.1:9/").unwrap());
        let result = client.fetch(&request).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    #[ignore = "requires network"]
    async fn test_fetch_reload_example_com() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let request = Request::get(::url::Url::parse("https://example.com/").unwrap()).with_cache_mode(CacheMode::Reload);
        let response = client.fetch(&request).await.unwrap();
        assert!(response.is_success());
        assert!(!response.body.is_empty());
    }
}
