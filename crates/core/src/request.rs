//! Request and response snapshots passed between the network and the cache.
//!
//! Headers are kept as ordered `(name, value)` pairs so a stored response
//! round-trips byte-for-byte, including duplicate header names.

use url::Url;

/// How the request was initiated by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    /// Subresource load.
    #[default]
    SameOrigin,
}

/// HTTP cache directive attached to an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Let intermediaries answer as usual.
    #[default]
    Default,
    /// Bypass every intermediate HTTP cache and fetch a fresh copy.
    Reload,
}

/// An outgoing request as seen by the offline cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub mode: RequestMode,
    pub cache_mode: CacheMode,
}

impl Request {
    /// A plain same-origin GET subresource request.
    pub fn get(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            headers: Vec::new(),
            mode: RequestMode::SameOrigin,
            cache_mode: CacheMode::Default,
        }
    }

    /// A top-level navigation to `url`.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
            .with_header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Whether the declared acceptable response types include HTML.
    ///
    /// Every `Accept` header counts, as if they were joined into one list.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case("accept"))
            .any(|(_, value)| value.contains("text/html"))
    }

    /// The URL used for cache matching: fragment removed, host lower-cased.
    pub fn normalized_url(&self) -> Url {
        normalize_url(&self.url)
    }
}

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
        }
    }
}

/// A response snapshot: status, headers and the complete body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: Url,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

impl Response {
    pub fn new(url: Url, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { url, status, headers: Vec::new(), body: body.into(), source: ResponseSource::Network }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 2xx status, the only responses that are ever cached.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn from_cache(mut self) -> Self {
        self.source = ResponseSource::Cache;
        self
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Normalize a URL for cache matching.
///
/// The query string is kept verbatim; only the fragment is dropped and the
/// host lower-cased (the `url` crate already lower-cases special-scheme hosts,
/// this keeps the rule explicit for every scheme).
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            let _ = normalized.set_host(Some(&lowered));
        }
    }
    normalized
}
