//! Configuration validation rules, applied after loading.

use crate::config::AppConfig;
use crate::manifest::is_relative_path;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("cache_prefix", &self.cache_prefix), ("version", &self.version)] {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(invalid(field, "must not contain whitespace"));
            }
        }

        let scope = Url::parse(&self.scope).map_err(|e| invalid("scope", e.to_string()))?;
        if !matches!(scope.scheme(), "http" | "https") {
            return Err(invalid("scope", format!("unsupported scheme: {}", scope.scheme())));
        }
        if !scope.path().ends_with('/') {
            return Err(invalid("scope", "path must end with '/'"));
        }

        let page = Url::parse(&self.page_url).map_err(|e| invalid("page_url", e.to_string()))?;
        if !matches!(page.scheme(), "http" | "https") {
            return Err(invalid("page_url", format!("unsupported scheme: {}", page.scheme())));
        }
        if page.origin() != scope.origin() {
            return Err(invalid("page_url", "must share the scope's origin"));
        }

        if self.manifest.is_empty() {
            return Err(invalid("manifest", "must list at least one resource"));
        }
        if let Some(bad) = self.manifest.iter().find(|p| !is_relative_path(p)) {
            return Err(invalid("manifest", format!("entry must be a relative path: {bad:?}")));
        }
        if let Some(dup) = self.manifest.iter().enumerate().find_map(|(i, p)| self.manifest[..i].contains(p).then_some(p)) {
            return Err(invalid("manifest", format!("{dup:?} listed more than once")));
        }
        if !self.manifest.iter().any(|p| p == &self.offline_page) {
            return Err(invalid("offline_page", format!("{:?} is not in the precache manifest", self.offline_page)));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        Ok(())
    }
}
