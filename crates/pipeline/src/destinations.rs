//! Config sections to sink settings

use tally_config::{AnalyticsConfig, DatastoreConfig, InsightsConfig};
use tally_sinks::{ClickHouseConfig, ForwarderConfig, WriterConfig};

/// Writer settings for the `[datastore]` section
pub fn writer_config(config: &DatastoreConfig) -> WriterConfig {
    WriterConfig::default()
        .with_batch_size(config.batch_size)
        .with_flush_interval(config.flush_interval)
        .with_async_insert(config.async_insert)
        .with_buffer_size(config.buffer_size)
        .with_table(config.qualified_table())
}

/// Connection settings for the `[datastore]` section
pub fn clickhouse_config(config: &DatastoreConfig) -> ClickHouseConfig {
    ClickHouseConfig {
        url: config.url.clone(),
        username: config.username.clone(),
        password: config.password.clone(),
    }
}

/// Forwarder settings for the `[insights]` section
pub fn insights_config(config: &InsightsConfig) -> ForwarderConfig {
    ForwarderConfig::new(config.endpoint.as_str())
        .with_batch_size(config.batch_size)
        .with_flush_interval(config.flush_interval)
        .with_timeout(config.timeout)
        .with_async(config.async_mode)
}

/// Forwarder settings for the `[analytics]` section
pub fn analytics_config(config: &AnalyticsConfig) -> ForwarderConfig {
    ForwarderConfig::new(config.endpoint.as_str())
        .with_batch_size(config.batch_size)
        .with_flush_interval(config.flush_interval)
        .with_timeout(config.timeout)
        .with_async(config.async_mode)
}
