//! Resolution of user-supplied locations into request URLs.

use bivouac_core::Scope;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for bivouac_core::Error {
    fn from(err: UrlError) -> Self {
        match err {
            UrlError::UnsupportedScheme(scheme) => bivouac_core::Error::UnsupportedScheme(scheme),
            other => bivouac_core::Error::InvalidUrl(other.to_string()),
        }
    }
}

/// Resolve `input` into an absolute request URL.
///
/// Absolute http(s) URLs are taken as-is; anything else (`/about`,
/// `assets/icon-192.png`, `?page=2`) is joined onto the scope. The result
/// is trimmed, has its fragment removed and its host lower-cased. The query
/// string is kept intact.
pub fn resolve(scope: &Scope, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match url::Url::parse(trimmed) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            scope.url().join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        Err(e) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
