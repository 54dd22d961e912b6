//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. explicit path (builder or caller)
//! 2. `~/.keg/config.toml` (user)
//! 3. `/etc/keg/config.toml` (system)
//!
//! Every field has a default, so an empty file (or no file at all, via
//! [`Config::default`]) yields a working configuration.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{KegError, Result};

const MEBIBYTE: u64 = 1024 * 1024;
const DAY_SECS: u64 = 24 * 60 * 60;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub limits: ValidationLimits,
    #[serde(default)]
    pub quota: QuotaSettings,
    #[serde(default)]
    pub caching: CachingSettings,
    #[serde(default)]
    pub events: EventSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

/// Request-validation bounds for both privilege levels.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationLimits {
    /// Maximum body size for anonymous writes (default: 1 MiB).
    #[serde(default = "default_unprivileged_max_body")]
    pub unprivileged_max_body_bytes: u64,
    /// Maximum body size with a valid API key (default: 100 MiB).
    #[serde(default = "default_privileged_max_body")]
    pub privileged_max_body_bytes: u64,
    /// Global minimum TTL in seconds (default: 1).
    #[serde(default = "default_min_ttl")]
    pub min_ttl_secs: u64,
    /// TTL applied when a request does not specify one (default: 30 days).
    #[serde(default = "default_default_ttl")]
    pub default_ttl_secs: u64,
    /// Maximum TTL for anonymous writes (default: 30 days).
    #[serde(default = "default_default_ttl")]
    pub unprivileged_max_ttl_secs: u64,
    /// Maximum TTL with a valid API key (default: 360 days).
    #[serde(default = "default_privileged_max_ttl")]
    pub privileged_max_ttl_secs: u64,
    /// Global maximum key length (default: 20).
    #[serde(default = "default_max_key_length")]
    pub max_key_length: u8,
    /// Generated key length when none is requested (default: 14).
    #[serde(default = "default_key_length")]
    pub default_key_length: u8,
    /// Minimum key length for anonymous writes (default: 8).
    #[serde(default = "default_unprivileged_min_key_length")]
    pub unprivileged_min_key_length: u8,
    /// Minimum key length with a valid API key (default: 3).
    #[serde(default = "default_privileged_min_key_length")]
    pub privileged_min_key_length: u8,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            unprivileged_max_body_bytes: default_unprivileged_max_body(),
            privileged_max_body_bytes: default_privileged_max_body(),
            min_ttl_secs: default_min_ttl(),
            default_ttl_secs: default_default_ttl(),
            unprivileged_max_ttl_secs: default_default_ttl(),
            privileged_max_ttl_secs: default_privileged_max_ttl(),
            max_key_length: default_max_key_length(),
            default_key_length: default_key_length(),
            unprivileged_min_key_length: default_unprivileged_min_key_length(),
            privileged_min_key_length: default_privileged_min_key_length(),
        }
    }
}

impl ValidationLimits {
    pub fn min_ttl(&self) -> Duration {
        Duration::from_secs(self.min_ttl_secs)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn unprivileged_max_ttl(&self) -> Duration {
        Duration::from_secs(self.unprivileged_max_ttl_secs)
    }

    pub fn privileged_max_ttl(&self) -> Duration {
        Duration::from_secs(self.privileged_max_ttl_secs)
    }
}

fn default_unprivileged_max_body() -> u64 {
    MEBIBYTE
}

fn default_privileged_max_body() -> u64 {
    100 * MEBIBYTE
}

fn default_min_ttl() -> u64 {
    1
}

fn default_default_ttl() -> u64 {
    30 * DAY_SECS
}

fn default_privileged_max_ttl() -> u64 {
    360 * DAY_SECS
}

fn default_max_key_length() -> u8 {
    20
}

fn default_key_length() -> u8 {
    14
}

fn default_unprivileged_min_key_length() -> u8 {
    8
}

fn default_privileged_min_key_length() -> u8 {
    3
}

/// Anonymous-usage quota settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaSettings {
    /// Writes allowed per source IP per reset period (default: 50).
    #[serde(default = "default_quota")]
    pub quota: i64,
    /// Seconds until a spent allowance resets (default: 24 h).
    #[serde(default = "default_reset_period")]
    pub reset_period_secs: u64,
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            quota: default_quota(),
            reset_period_secs: default_reset_period(),
        }
    }
}

impl QuotaSettings {
    pub fn reset_period(&self) -> Duration {
        Duration::from_secs(self.reset_period_secs)
    }
}

fn default_quota() -> i64 {
    50
}

fn default_reset_period() -> u64 {
    DAY_SECS
}

/// Record-store behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct CachingSettings {
    /// Bodies above this size are gzip-compressed (default: 4096).
    #[serde(default = "default_compress_threshold")]
    pub compress_threshold_bytes: u64,
    /// Consecutive collisions before the key generator grows the
    /// working key length by one (default: 20).
    #[serde(default = "default_escalation_attempts")]
    pub key_escalation_attempts: u8,
    /// Maximum entries held by the in-process store (default: 1M).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CachingSettings {
    fn default() -> Self {
        Self {
            compress_threshold_bytes: default_compress_threshold(),
            key_escalation_attempts: default_escalation_attempts(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_compress_threshold() -> u64 {
    4096
}

fn default_escalation_attempts() -> u8 {
    20
}

fn default_max_entries() -> u64 {
    1_000_000
}

/// Usage-event queue settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EventSettings {
    /// Bounded audit-queue capacity; events beyond it are dropped
    /// (default: 256).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}

/// Store-interaction settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    /// Deadline for one logical cache or retrieval operation, in
    /// seconds (default: 3).
    #[serde(default = "default_op_timeout")]
    pub op_timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            op_timeout_secs: default_op_timeout(),
        }
    }
}

impl StoreSettings {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.op_timeout_secs)
    }
}

fn default_op_timeout() -> u64 {
    3
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.keg/config.toml`
    /// 3. `/etc/keg/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            KegError::Configuration(format!("failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            KegError::Configuration(format!("failed to parse config file {path:?}: {e}"))
        })
    }

    /// Sanity checks beyond what serde defaults guarantee.
    pub fn validate(&self) -> Result<()> {
        if self.quota.quota < 1 {
            return Err(KegError::Configuration(format!(
                "quota must be at least 1, got {}",
                self.quota.quota
            )));
        }
        if self.caching.key_escalation_attempts < 1 {
            return Err(KegError::Configuration(
                "key_escalation_attempts must be at least 1".to_string(),
            ));
        }
        let limits = &self.limits;
        if limits.default_key_length > limits.max_key_length
            || limits.unprivileged_min_key_length > limits.max_key_length
            || limits.privileged_min_key_length > limits.max_key_length
        {
            return Err(KegError::Configuration(
                "key length bounds exceed max_key_length".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(KegError::Configuration(format!(
                "config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".keg").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/keg/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(KegError::Configuration(
            "no config file found. Create ~/.keg/config.toml or /etc/keg/config.toml".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.limits.unprivileged_max_body_bytes, MEBIBYTE);
        assert_eq!(config.limits.privileged_max_body_bytes, 100 * MEBIBYTE);
        assert_eq!(config.limits.max_key_length, 20);
        assert_eq!(config.limits.default_key_length, 14);
        assert_eq!(config.quota.quota, 50);
        assert_eq!(config.quota.reset_period(), Duration::from_secs(DAY_SECS));
        assert_eq!(config.caching.compress_threshold_bytes, 4096);
        assert_eq!(config.store.op_timeout(), Duration::from_secs(3));
        config.validate().unwrap();
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [quota]
            quota = 10
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.quota.quota, 10);
        // Defaults preserved
        assert_eq!(config.limits.default_key_length, 14);
        assert_eq!(config.caching.key_escalation_attempts, 20);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [limits]
            unprivileged_max_body_bytes = 2048
            privileged_max_ttl_secs = 86400
            default_key_length = 10

            [quota]
            quota = 5
            reset_period_secs = 3600

            [caching]
            compress_threshold_bytes = 1024

            [events]
            queue_capacity = 16

            [store]
            op_timeout_secs = 5
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.limits.unprivileged_max_body_bytes, 2048);
        assert_eq!(
            config.limits.privileged_max_ttl(),
            Duration::from_secs(86400)
        );
        assert_eq!(config.limits.default_key_length, 10);
        assert_eq!(config.quota.quota, 5);
        assert_eq!(config.quota.reset_period(), Duration::from_secs(3600));
        assert_eq!(config.caching.compress_threshold_bytes, 1024);
        assert_eq!(config.events.queue_capacity, 16);
        assert_eq!(config.store.op_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn validate_rejects_zero_quota() {
        let mut config = Config::default();
        config.quota.quota = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inconsistent_key_lengths() {
        let mut config = Config::default();
        config.limits.default_key_length = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("config file not found"));
    }
}
