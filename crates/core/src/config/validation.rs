//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `version` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `version` or `partition_prefix` contains whitespace or '-'
    /// - `origin` is not an absolute http(s) URL
    /// - a partition budget is 0
    /// - `trim_ratio` is outside (0, 1]
    /// - `precache_concurrency` is 0 or exceeds 16
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - the strategy table uses `offline-fallback` as a primary strategy
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.is_empty() {
            return Err(ConfigError::Missing {
                field: "version".into(),
                hint: "Set KEEPSAKE_VERSION to the build's version tag".into(),
            });
        }
        if self.version.chars().any(|c| c.is_whitespace() || c == '-') {
            return Err(invalid("version", "must not contain whitespace or '-'"));
        }
        if self.partition_prefix.chars().any(|c| c.is_whitespace() || c == '-') {
            return Err(invalid("partition_prefix", "must not contain whitespace or '-'"));
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "scheme must be http or https"));
        }
        if origin.host_str().is_none() {
            return Err(invalid("origin", "must include a host"));
        }

        if self.image_budget_bytes == 0 {
            return Err(invalid("image_budget_bytes", "must be greater than 0"));
        }
        if self.font_budget_bytes == 0 {
            return Err(invalid("font_budget_bytes", "must be greater than 0"));
        }
        if self.quota_bytes == Some(0) {
            return Err(invalid("quota_bytes", "must be greater than 0 when set"));
        }

        if !(self.trim_ratio > 0.0 && self.trim_ratio <= 1.0) {
            return Err(invalid("trim_ratio", "must be within (0, 1]"));
        }

        if self.precache_concurrency == 0 || self.precache_concurrency > 16 {
            return Err(invalid("precache_concurrency", "must be between 1 and 16"));
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

        let terminal = self.strategies.terminal_entries();
        if !terminal.is_empty() {
            return Err(ConfigError::Invalid {
                field: "strategies".into(),
                reason: format!("offline-fallback cannot be a primary strategy (used for {terminal:?})"),
            });
        }

        if self.offline_page.is_some() && !self.critical_assets.iter().any(|u| Some(u) == self.offline_page.as_ref()) {
            tracing::warn!(
                offline_page = ?self.offline_page,
                "offline_page is not in critical_assets; it will only be served once cached by browsing"
            );
        }

        Ok(())
    }
}
