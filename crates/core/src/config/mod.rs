//! Application configuration with layered loading.
//!
//! Sources, highest precedence first:
//!
//! 1. Environment variables (`BIVOUAC_*`)
//! 2. TOML config file (if `BIVOUAC_CONFIG_FILE` is set)
//! 3. Built-in defaults
//!
//! The version tag and precache manifest are deploy-time inputs: they are
//! read once at startup and never change while the service runs.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::generation::GenerationName;
use crate::manifest::{DEFAULT_OFFLINE_PAGE, DEFAULT_PRECACHE, PrecacheManifest};
use crate::{Error, Scope};

mod validation;

pub use validation::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database (`BIVOUAC_DB_PATH`).
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Absolute URL of the site root the cache is registered against
    /// (`BIVOUAC_SCOPE`).
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Page that registers the cache (`BIVOUAC_PAGE_URL`). Must be an
    /// http(s) page on the scope's origin.
    #[serde(default = "default_page_url")]
    pub page_url: String,

    /// Fixed prefix of every generation name (`BIVOUAC_CACHE_PREFIX`).
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag of the current deployment (`BIVOUAC_VERSION`).
    #[serde(default = "default_version")]
    pub version: String,

    /// Relative paths precached at install time.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Page served to failed navigations; must appear in `manifest`.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// User-Agent string for network requests (`BIVOUAC_USER_AGENT`).
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body size in bytes (`BIVOUAC_MAX_BYTES`).
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds (`BIVOUAC_TIMEOUT_MS`).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./bivouac-cache.sqlite")
}

fn default_scope() -> String {
    "http://localhost:8080/".into()
}

fn default_page_url() -> String {
    "http://localhost:8080/index.html".into()
}

fn default_cache_prefix() -> String {
    "roman-engineer".into()
}

fn default_version() -> String {
    "2025-12-07".into()
}

fn default_manifest() -> Vec<String> {
    DEFAULT_PRECACHE.iter().map(|p| p.to_string()).collect()
}

fn default_offline_page() -> String {
    DEFAULT_OFFLINE_PAGE.into()
}

fn default_user_agent() -> String {
    "bivouac/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            scope: default_scope(),
            page_url: default_page_url(),
            cache_prefix: default_cache_prefix(),
            version: default_version(),
            manifest: default_manifest(),
            offline_page: default_offline_page(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BIVOUAC_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BIVOUAC_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Name of the generation this deployment installs.
    pub fn generation_name(&self) -> Result<GenerationName, Error> {
        GenerationName::new(&self.cache_prefix, &self.version)
    }

    /// Register the scope from the configured page.
    pub fn scope(&self) -> Result<Scope, Error> {
        let page = Url::parse(self.page_url.trim())?;
        Scope::register(&page, &self.scope)
    }

    pub fn precache_manifest(&self) -> Result<PrecacheManifest, Error> {
        PrecacheManifest::new(self.manifest.iter().cloned())
    }
}
