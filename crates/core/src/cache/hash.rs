//! Request keys for cache entries.

use sha2::{Digest, Sha256};
use url::Url;

use crate::request::normalize_url;

/// Compute the cache key for a request: SHA-256 over the upper-cased method
/// and the normalized URL.
pub fn compute_request_key(method: &str, url: &Url) -> String {
    let normalized = normalize_url(url);
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(normalized.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
