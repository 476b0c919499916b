//! Tally Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid configuration: no destinations are enabled and
//! every emit is a no-op.
//!
//! # Parsing
//!
//! ```
//! use tally_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[datastore]\nenabled = true").unwrap();
//! assert!(config.datastore.enabled);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [datastore]
//! enabled = true
//! url = "http://localhost:8123"
//! flush_interval = "5s"
//!
//! [insights]
//! enabled = true
//! endpoint = "https://insights.example.com"
//! api_key = "phc_..."
//!
//! [analytics]
//! enabled = true
//! endpoint = "https://analytics.example.com"
//! website_id = "5f2c..."
//! ```

mod destinations;
mod error;
mod logging;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use destinations::{AnalyticsConfig, DatastoreConfig, InsightsConfig};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Primary store (ClickHouse) writer
    pub datastore: DatastoreConfig,

    /// Insights HTTP forwarding (PostHog-compatible)
    pub insights: InsightsConfig,

    /// Analytics HTTP forwarding (Umami-compatible)
    pub analytics: AnalyticsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Names of destinations that are enabled and fully configured
    pub fn active_destinations(&self) -> Vec<&'static str> {
        let mut active = Vec::new();
        if self.datastore.enabled {
            active.push("datastore");
        }
        if self.insights.is_active() {
            active.push("insights");
        }
        if self.analytics.is_active() {
            active.push("analytics");
        }
        active
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert!(!config.datastore.enabled);
        assert_eq!(config.datastore.batch_size, 500);
        assert!(!config.insights.enabled);
        assert!(!config.analytics.enabled);
        assert!(config.active_destinations().is_empty());
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"
format = "json"

[datastore]
enabled = true
url = "http://clickhouse:8123"
database = "commerce"
username = "writer"
password = "secret"
batch_size = 1000
flush_interval = "2s"
async_insert = false
buffer_size = 20000

[insights]
enabled = true
endpoint = "https://insights.example.com"
api_key = "phc_test"
batch_size = 10
flush_interval = "1m"
timeout = "3s"

[analytics]
enabled = true
endpoint = "https://analytics.example.com"
website_id = "site-1"
async = false
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);

        assert!(config.datastore.enabled);
        assert_eq!(config.datastore.url, "http://clickhouse:8123");
        assert_eq!(config.datastore.username.as_deref(), Some("writer"));
        assert_eq!(config.datastore.batch_size, 1000);
        assert_eq!(config.datastore.flush_interval, Duration::from_secs(2));
        assert!(!config.datastore.async_insert);
        assert_eq!(config.datastore.buffer_size, 20000);

        assert_eq!(config.insights.batch_size, 10);
        assert_eq!(config.insights.flush_interval, Duration::from_secs(60));
        assert_eq!(config.insights.timeout, Duration::from_secs(3));
        assert!(config.insights.async_mode);

        assert!(!config.analytics.async_mode);

        assert_eq!(
            config.active_destinations(),
            vec!["datastore", "insights", "analytics"]
        );
    }

    #[test]
    fn test_enabled_secondary_without_endpoint_is_inactive() {
        let toml = r#"
[insights]
enabled = true
api_key = "phc_test"
"#;
        let config = Config::from_str(toml).unwrap();
        assert!(config.insights.enabled);
        assert!(!config.insights.is_active());
        assert!(config.active_destinations().is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("[datastore\nenabled = true");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file("/nonexistent/tally.toml");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
