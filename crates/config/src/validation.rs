//! Configuration validation
//!
//! Validates config consistency:
//! - Batch sizes, queue sizes and intervals are non-zero
//! - An enabled datastore has a URL and database
//!
//! Secondaries missing their endpoint or credential are not an error; they
//! are simply inactive (see `InsightsConfig::is_active`).

use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_datastore(config)?;
    validate_batching(
        "insights",
        config.insights.batch_size,
        config.insights.flush_interval,
    )?;
    validate_batching(
        "analytics",
        config.analytics.batch_size,
        config.analytics.flush_interval,
    )?;
    validate_timeout("insights", config.insights.timeout)?;
    validate_timeout("analytics", config.analytics.timeout)?;
    Ok(())
}

fn validate_datastore(config: &Config) -> Result<()> {
    let ds = &config.datastore;

    validate_batching("datastore", ds.batch_size, ds.flush_interval)?;

    if ds.buffer_size == 0 {
        return Err(ConfigError::invalid_value(
            "datastore",
            "buffer_size",
            "must be greater than 0",
        ));
    }

    if ds.enabled {
        if ds.url.is_empty() {
            return Err(ConfigError::missing_field("datastore", "url"));
        }
        if ds.database.is_empty() {
            return Err(ConfigError::missing_field("datastore", "database"));
        }
        if ds.table.is_empty() {
            return Err(ConfigError::missing_field("datastore", "table"));
        }
    }

    Ok(())
}

fn validate_batching(section: &'static str, batch_size: usize, interval: Duration) -> Result<()> {
    if batch_size == 0 {
        return Err(ConfigError::invalid_value(
            section,
            "batch_size",
            "must be greater than 0",
        ));
    }
    if interval.is_zero() {
        return Err(ConfigError::invalid_value(
            section,
            "flush_interval",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_timeout(section: &'static str, timeout: Duration) -> Result<()> {
    if timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            section,
            "timeout",
            "must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::{Config, ConfigError};

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = Config::from_str("[datastore]\nbatch_size = 0");
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                section: "datastore",
                field: "batch_size",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_buffer_size_rejected() {
        let result = Config::from_str("[datastore]\nbuffer_size = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_flush_interval_rejected() {
        let result = Config::from_str("[analytics]\nflush_interval = \"0s\"");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("flush_interval"));
    }

    #[test]
    fn test_enabled_datastore_needs_url() {
        let result = Config::from_str("[datastore]\nenabled = true\nurl = \"\"");
        assert!(matches!(
            result,
            Err(ConfigError::MissingField {
                section: "datastore",
                field: "url"
            })
        ));
    }

    #[test]
    fn test_disabled_datastore_skips_url_check() {
        assert!(Config::from_str("[datastore]\nurl = \"\"").is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = Config::from_str("[insights]\ntimeout = \"0s\"");
        assert!(result.is_err());
    }
}
