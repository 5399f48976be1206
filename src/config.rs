use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_BALANCE_LOCK_WAIT_MS: u64 = 2_000;
const CONFIG_DIR: &str = "config";

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Environment name: "development", "test", "production"
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log level for the tracing subscriber
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Upper bound on the wait for a contended balance row, in milliseconds.
    /// Posts that cannot take the row lock within this window fail with a
    /// retryable lock-timeout error instead of queueing indefinitely.
    #[serde(default = "default_balance_lock_wait_ms")]
    #[validate(range(min = 1, max = 600_000))]
    pub balance_lock_wait_ms: u64,

    /// Whether adjustment movements may drive a balance negative. Used for
    /// correcting known discrepancies; all other movement types always
    /// enforce non-negativity.
    #[serde(default = "default_allow_negative_adjustments")]
    pub allow_negative_adjustments: bool,
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_balance_lock_wait_ms() -> u64 {
    DEFAULT_BALANCE_LOCK_WAIT_MS
}

fn default_allow_negative_adjustments() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            balance_lock_wait_ms: default_balance_lock_wait_ms(),
            allow_negative_adjustments: default_allow_negative_adjustments(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

impl AppConfig {
    /// Loads configuration from layered sources: `config/default`, then
    /// `config/{environment}`, then `STOCKCORE_`-prefixed environment
    /// variables. Missing files fall back to defaults.
    pub fn load() -> Result<Self, ConfigLoadError> {
        let env = std::env::var("STOCKCORE_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.into());

        let cfg: AppConfig = Config::builder()
            .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
            .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, env)).required(false))
            .add_source(Environment::with_prefix("STOCKCORE"))
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn balance_lock_wait(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.balance_lock_wait_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.balance_lock_wait_ms, 2_000);
        assert!(cfg.allow_negative_adjustments);
    }

    #[test]
    fn zero_lock_wait_is_rejected() {
        let cfg = AppConfig {
            balance_lock_wait_ms: 0,
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
