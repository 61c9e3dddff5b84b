//! Registration scope and the same-origin admission rule.

use crate::Error;
use url::{Origin, Url};

/// The URL space an offline cache is registered against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    url: Url,
    origin: Origin,
}

impl Scope {
    /// Build a scope from an absolute http(s) URL whose path ends in `/`.
    pub fn new(scope_url: &str) -> Result<Self, Error> {
        let url = Url::parse(scope_url.trim())?;
        ensure_network_scheme(&url)?;
        if !url.path().ends_with('/') {
            return Err(Error::InvalidUrl(format!("scope path must end with '/': {url}")));
        }
        let origin = url.origin();
        Ok(Self { url, origin })
    }

    /// Register from a page loaded at `page_url`.
    ///
    /// Pages opened from a non-network scheme (`file:` previews and the like)
    /// have no meaningful cache scope and are refused.
    pub fn register(page_url: &Url, scope_url: &str) -> Result<Self, Error> {
        ensure_network_scheme(page_url)?;
        let scope = Self::new(scope_url)?;
        if page_url.origin() != scope.origin {
            return Err(Error::InvalidInput(format!(
                "page {page_url} is not same-origin with scope {}",
                scope.url
            )));
        }
        tracing::debug!(scope = %scope.url, page = %page_url, "registered offline cache scope");
        Ok(scope)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    /// Resolve a path relative to the scope (e.g. a precache manifest entry).
    pub fn resolve(&self, path: &str) -> Result<Url, Error> {
        Ok(self.url.join(path)?)
    }
}

fn ensure_network_scheme(url: &Url) -> Result<(), Error> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::UnsupportedScheme(scheme.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_new() {
        let scope = Scope::new("https://example.com/").unwrap();
        assert_eq!(scope.url().as_str(), "https://example.com/");
    }

    #[test]
    fn test_scope_requires_trailing_slash() {
        assert!(matches!(Scope::new("https://example.com/site"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_register_refuses_file_scheme() {
        let page = Url::parse("file:///home/me/site/index.html").unwrap();
        let result = Scope::register(&page, "https://example.com/");
        assert!(matches!(result, Err(Error::UnsupportedScheme(s)) if s == "file"));
    }

    #[test]
    fn test_register_same_origin_page() {
        let page = Url::parse("https://example.com/about.html").unwrap();
        assert!(Scope::register(&page, "https://example.com/").is_ok());
    }

    #[test]
    fn test_register_cross_origin_page() {
        let page = Url::parse("https://other.com/").unwrap();
        assert!(matches!(Scope::register(&page, "https://example.com/"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_same_origin_checks_port_and_scheme() {
        let scope = Scope::new("https://example.com/").unwrap();
        assert!(scope.is_same_origin(&Url::parse("https://example.com/a.css").unwrap()));
        assert!(!scope.is_same_origin(&Url::parse("http://example.com/a.css").unwrap()));
        assert!(!scope.is_same_origin(&Url::parse("https://example.com:8443/a.css").unwrap()));
        assert!(!scope.is_same_origin(&Url::parse("https://cdn.example.com/a.css").unwrap()));
    }

    #[test]
    fn test_resolve_relative_path() {
        let scope = Scope::new("https://example.com/site/").unwrap();
        assert_eq!(scope.resolve("assets/icon-192.png").unwrap().as_str(), "https://example.com/site/assets/icon-192.png");
    }
}
