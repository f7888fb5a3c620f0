//! Runtime configuration loaded from environment variables.

use crate::error::ToolError;
use crate::rate_limit::RateLimit;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Admission budgets
    #[serde(default)]
    pub rate_limits: RateLimitSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Default budget applied to any rate-limit type without an override.
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Window the threshold applies to.
    #[serde(default = "default_window", with = "humantime_serde")]
    pub window: Duration,

    /// Per-type overrides keyed by rate-limit type.
    #[serde(default)]
    pub overrides: HashMap<String, RateLimit>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            window: default_window(),
            overrides: HashMap::new(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            rate_limits: RateLimitSettings::default(),
        }
    }
}

fn default_threshold() -> u32 {
    60
}

fn default_window() -> Duration {
    Duration::from_secs(60)
}

impl RuntimeConfig {
    /// Load configuration from environment variables prefixed `TOOLS`,
    /// e.g. `TOOLS__RATE_LIMITS__THRESHOLD=120`.
    pub fn load() -> Result<Self, ToolError> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("TOOLS")
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .map_err(|e| ToolError::config(format!("failed to build configuration: {}", e)))?;

        config
            .try_deserialize()
            .map_err(|e| ToolError::config(format!("failed to deserialize configuration: {}", e)))
    }

    /// The default bucket budget.
    pub fn default_limit(&self) -> RateLimit {
        RateLimit::new(self.rate_limits.threshold, self.rate_limits.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.rate_limits.threshold, 60);
        assert_eq!(config.rate_limits.window, Duration::from_secs(60));
        assert!(config.rate_limits.overrides.is_empty());

        let limit = config.default_limit();
        assert_eq!(limit.threshold, 60);
    }

    #[test]
    fn test_load_reads_environment() {
        std::env::set_var("TOOLS__RATE_LIMITS__THRESHOLD", "120");
        std::env::set_var("TOOLS__RATE_LIMITS__WINDOW", "30s");

        let config = RuntimeConfig::load().unwrap();
        assert_eq!(config.rate_limits.threshold, 120);
        assert_eq!(config.rate_limits.window, Duration::from_secs(30));

        std::env::remove_var("TOOLS__RATE_LIMITS__THRESHOLD");
        std::env::remove_var("TOOLS__RATE_LIMITS__WINDOW");
    }
}
