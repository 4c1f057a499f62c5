//! Configuration management for Sluice.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{Result, SluiceError};
use crate::ratelimit::{Quota, TimeUnit};

/// Main configuration for Sluice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SluiceConfig {
    /// Admission limiter configuration
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Documents API client configuration
    #[serde(default)]
    pub client: ClientConfig,
}

/// Admission limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Requests allowed per window
    #[serde(default = "default_requests_per_unit")]
    pub requests_per_unit: u32,

    /// Unit the window is measured in
    #[serde(default = "default_unit")]
    pub unit: TimeUnit,

    /// Window length in units
    #[serde(default = "default_units_per_window")]
    pub units_per_window: u32,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_unit: default_requests_per_unit(),
            unit: default_unit(),
            units_per_window: default_units_per_window(),
        }
    }
}

fn default_requests_per_unit() -> u32 {
    5
}

fn default_unit() -> TimeUnit {
    TimeUnit::Second
}

fn default_units_per_window() -> u32 {
    1
}

impl LimiterConfig {
    /// Build the quota this configuration describes.
    pub fn quota(&self) -> Result<Quota> {
        let single = Quota::per_unit(self.unit, self.requests_per_unit)?;
        if self.units_per_window == 0 {
            return Err(SluiceError::InvalidConfiguration(
                "units_per_window must be at least 1".to_string(),
            ));
        }
        Quota::new(single.limit(), single.window() * self.units_per_window)
    }
}

/// Documents API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Endpoint documents are POSTed to
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "https://ismp.crpt.ru/api/v3/lk/documents/create".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    /// Get the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SluiceConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| SluiceError::Config(format!("Failed to parse configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SluiceConfig::default();
        let quota = config.limiter.quota().unwrap();

        assert_eq!(quota.limit(), 5);
        assert_eq!(quota.window(), Duration::from_secs(1));
        assert!(config.client.endpoint.ends_with("/documents/create"));
        assert_eq!(config.client.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
limiter:
  requests_per_unit: 3
  unit: minute
  units_per_window: 2
client:
  endpoint: http://localhost:8080/create
  timeout_secs: 5
"#;
        let config = SluiceConfig::from_yaml(yaml).unwrap();
        let quota = config.limiter.quota().unwrap();

        assert_eq!(quota.limit(), 3);
        assert_eq!(quota.window(), Duration::from_secs(120));
        assert_eq!(config.client.endpoint, "http://localhost:8080/create");
        assert_eq!(config.client.timeout_secs, 5);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = SluiceConfig::from_yaml("limiter:\n  unit: millisecond\n").unwrap();
        assert_eq!(config.limiter.requests_per_unit, 5);
        assert_eq!(config.limiter.quota().unwrap().window(), Duration::from_millis(1));
        assert_eq!(config.client.timeout_secs, 30);
    }

    #[test]
    fn test_sub_millisecond_unit_is_invalid() {
        let config = SluiceConfig::from_yaml("limiter:\n  unit: nanosecond\n").unwrap();
        assert!(matches!(
            config.limiter.quota(),
            Err(SluiceError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_zero_values_are_invalid() {
        let config = SluiceConfig::from_yaml("limiter:\n  requests_per_unit: 0\n").unwrap();
        assert!(config.limiter.quota().is_err());

        let config = SluiceConfig::from_yaml("limiter:\n  units_per_window: 0\n").unwrap();
        assert!(config.limiter.quota().is_err());
    }

    #[test]
    fn test_unknown_unit_fails_to_parse() {
        let result = SluiceConfig::from_yaml("limiter:\n  unit: fortnight\n");
        assert!(matches!(result, Err(SluiceError::Config(_))));
    }
}
