//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (KEEPSAKE_*)
//! 2. TOML config file (if KEEPSAKE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Everything the cache engine used to keep as module-level constants (cache
//! names, version tag, critical asset list, budgets) lives here and is handed
//! to the engine at startup.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::PartitionKind;
use crate::strategy::StrategyTable;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (KEEPSAKE_*)
/// 2. TOML config file (if KEEPSAKE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via KEEPSAKE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the site the engine serves (scheme, host, port).
    ///
    /// Relative URLs resolve against it and only same-origin requests are
    /// cached unless their host is in `cross_origin_hosts`.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Build version tag embedded in every partition name.
    ///
    /// Set via KEEPSAKE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Optional namespace prepended to partition names.
    ///
    /// Activation only deletes stale partitions inside this namespace, so
    /// several apps can share one store.
    #[serde(default)]
    pub partition_prefix: String,

    /// URLs fetched and stored during install.
    #[serde(default = "default_critical_assets")]
    pub critical_assets: Vec<String>,

    /// Cached page served to offline navigations before the synthesized one.
    #[serde(default = "default_offline_page")]
    pub offline_page: Option<String>,

    /// Cross-origin hosts (fonts, CDNs) that are served cache-first.
    #[serde(default = "default_cross_origin_hosts")]
    pub cross_origin_hosts: Vec<String>,

    /// Byte ceiling of the image partition.
    #[serde(default = "default_image_budget_bytes")]
    pub image_budget_bytes: u64,

    /// Byte ceiling of the font partition.
    #[serde(default = "default_font_budget_bytes")]
    pub font_budget_bytes: u64,

    /// Total byte quota of the store; unlimited when unset.
    #[serde(default)]
    pub quota_bytes: Option<u64>,

    /// Share of a partition's keys removed by one eviction pass.
    #[serde(default = "default_trim_ratio")]
    pub trim_ratio: f64,

    /// Maximum concurrent fetches while pre-warming.
    #[serde(default = "default_precache_concurrency")]
    pub precache_concurrency: usize,

    /// Activate right after install instead of waiting for SKIP_WAITING.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via KEEPSAKE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Resource class → strategy table.
    ///
    /// Override a single entry with e.g. KEEPSAKE_STRATEGIES__IMAGE=cache-first.
    #[serde(default)]
    pub strategies: StrategyTable,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./keepsake-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_critical_assets() -> Vec<String> {
    ["/", "/index.html", "/offline.html", "/css/styles.css", "/js/main.js", "/manifest.json"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_offline_page() -> Option<String> {
    Some("/offline.html".into())
}

fn default_cross_origin_hosts() -> Vec<String> {
    ["fonts.googleapis.com", "fonts.gstatic.com", "cdnjs.cloudflare.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_image_budget_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_font_budget_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_trim_ratio() -> f64 {
    0.2
}

fn default_precache_concurrency() -> usize {
    4
}

fn default_user_agent() -> String {
    "keepsake/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            version: default_version(),
            partition_prefix: String::new(),
            critical_assets: default_critical_assets(),
            offline_page: default_offline_page(),
            cross_origin_hosts: default_cross_origin_hosts(),
            image_budget_bytes: default_image_budget_bytes(),
            font_budget_bytes: default_font_budget_bytes(),
            quota_bytes: None,
            trim_ratio: default_trim_ratio(),
            precache_concurrency: default_precache_concurrency(),
            skip_waiting: true,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            strategies: StrategyTable::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Byte budget of a partition kind, if it is size-bounded.
    pub fn budget_for(&self, kind: PartitionKind) -> Option<u64> {
        match kind {
            PartitionKind::Images => Some(self.image_budget_bytes),
            PartitionKind::Fonts => Some(self.font_budget_bytes),
            PartitionKind::Core | PartitionKind::Assets => None,
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `KEEPSAKE_`
    /// 2. TOML file from `KEEPSAKE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("KEEPSAKE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("KEEPSAKE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
