//! Precache manifest: resources guaranteed to be cached at install time.

use crate::{Error, Scope};
use url::Url;

/// Resources precached by the default deployment.
pub const DEFAULT_PRECACHE: &[&str] = &[
    "styles.css",
    "script.js",
    "manifest.json",
    "offline.html",
    "assets/asset-0.jpeg",
    "assets/asset-10.jpeg",
    "assets/asset-27.gif",
    "assets/icon-192.png",
    "assets/icon-512.png",
    "assets/icon-192-maskable.png",
    "assets/icon-512-maskable.png",
    "assets/apple-touch-icon.png",
    "assets/favicon.ico",
];

/// Default offline fallback page.
pub const DEFAULT_OFFLINE_PAGE: &str = "offline.html";

/// Ordered list of relative resource paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecacheManifest {
    paths: Vec<String>,
}

impl PrecacheManifest {
    pub fn new<I, S>(paths: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(Error::InvalidInput("precache manifest is empty".into()));
        }
        if let Some(bad) = paths.iter().find(|p| !is_relative_path(p)) {
            return Err(Error::InvalidInput(format!("manifest entry must be a relative path: {bad:?}")));
        }
        if let Some(dup) = paths.iter().enumerate().find_map(|(i, p)| paths[..i].contains(p).then_some(p)) {
            return Err(Error::InvalidInput(format!("manifest lists {dup:?} more than once")));
        }
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// Resolve every entry against the scope, preserving manifest order.
    pub fn resolve(&self, scope: &Scope) -> Result<Vec<Url>, Error> {
        self.paths.iter().map(|p| scope.resolve(p)).collect()
    }
}

impl Default for PrecacheManifest {
    fn default() -> Self {
        Self { paths: DEFAULT_PRECACHE.iter().map(|p| p.to_string()).collect() }
    }
}

/// Relative, non-empty, no scheme, not rooted at `/`.
pub fn is_relative_path(path: &str) -> bool {
    let trimmed = path.trim();
    !trimmed.is_empty() && !trimmed.contains("://") && !trimmed.starts_with('/') && !trimmed.contains(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest_has_offline_page() {
        let manifest = PrecacheManifest::default();
        assert_eq!(manifest.len(), 13);
        assert!(manifest.contains(DEFAULT_OFFLINE_PAGE));
    }

    #[test]
    fn test_empty_manifest_rejected() {
        let result = PrecacheManifest::new(Vec::<String>::new());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_absolute_entries_rejected() {
        assert!(PrecacheManifest::new(["https://cdn.example.com/x.js"]).is_err());
        assert!(PrecacheManifest::new(["/styles.css"]).is_err());
        assert!(PrecacheManifest::new(["data:text/plain,hi"]).is_err());
    }

    #[test]
    fn test_duplicate_entries_rejected() {
        let result = PrecacheManifest::new(["styles.css", "offline.html", "styles.css"]);
        assert!(matches!(result, Err(Error::InvalidInput(msg)) if msg.contains("styles.css")));
    }

    #[test]
    fn test_resolve_preserves_order() {
        let scope = Scope::new("https://example.com/").unwrap();
        let manifest = PrecacheManifest::new(["b.css", "a.js"]).unwrap();
        let urls = manifest.resolve(&scope).unwrap();
        assert_eq!(urls[0].as_str(), "https://example.com/b.css");
        assert_eq!(urls[1].as_str(), "https://example.com/a.js");
    }
}
