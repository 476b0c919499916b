//! Datastore writer and ClickHouse connection configuration

use std::time::Duration;

use clickhouse::Client;

// =============================================================================
// Constants
// =============================================================================

/// Default events per batch
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Default flush interval for partial batches
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Default queue capacity
pub const DEFAULT_BUFFER_SIZE: usize = 10_000;

/// Default fully-qualified events table
pub const DEFAULT_TABLE: &str = "commerce.events";

/// Default database created by the schema bootstrap
pub const DEFAULT_DATABASE: &str = "commerce";

// =============================================================================
// Writer configuration
// =============================================================================

/// Configuration for [`DatastoreWriter`](super::DatastoreWriter)
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Events per batch before a size-triggered flush
    pub batch_size: usize,

    /// Maximum time a partial batch waits
    pub flush_interval: Duration,

    /// Fire-and-forget per-event inserts instead of atomic batches
    pub async_insert: bool,

    /// Capacity of the producer queue
    pub buffer_size: usize,

    /// Fully-qualified target table
    pub table: String,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            async_insert: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
            table: DEFAULT_TABLE.into(),
        }
    }
}

impl WriterConfig {
    /// Set the batch size
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the flush interval
    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Choose async-insert (true) or transactional batch (false) mode
    #[must_use]
    pub fn with_async_insert(mut self, enabled: bool) -> Self {
        self.async_insert = enabled;
        self
    }

    /// Set the queue capacity
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Set the target table
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

// =============================================================================
// ClickHouse connection
// =============================================================================

/// Connection settings for [`ClickHouseStore`](super::ClickHouseStore)
///
/// The client is built without a default database: the bootstrap has to be
/// able to run `CREATE DATABASE` before the database exists, so every table
/// is addressed by its qualified name.
#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    /// ClickHouse HTTP URL (e.g., "http://localhost:8123")
    pub url: String,

    /// Username for authentication (optional)
    pub username: Option<String>,

    /// Password for authentication (optional)
    pub password: Option<String>,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".into(),
            username: None,
            password: None,
        }
    }
}

impl ClickHouseConfig {
    /// Create a config for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set authentication credentials
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Build the ClickHouse client from this config
    pub fn build_client(&self) -> Client {
        let mut client = Client::default().with_url(&self.url);

        if let Some(ref username) = self.username {
            client = client.with_user(username);
        }

        if let Some(ref password) = self.password {
            client = client.with_password(password);
        }

        client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_defaults() {
        let config = WriterConfig::default();
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.flush_interval, Duration::from_secs(5));
        assert!(config.async_insert);
        assert_eq!(config.buffer_size, 10_000);
        assert_eq!(config.table, "commerce.events");
    }

    #[test]
    fn test_writer_builders_clamp_zero() {
        let config = WriterConfig::default()
            .with_batch_size(0)
            .with_buffer_size(0)
            .with_async_insert(false)
            .with_table("shop.events");
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.buffer_size, 1);
        assert!(!config.async_insert);
        assert_eq!(config.table, "shop.events");
    }

    #[test]
    fn test_clickhouse_credentials() {
        let config = ClickHouseConfig::new("http://ch:8123").with_credentials("writer", "secret");
        assert_eq!(config.url, "http://ch:8123");
        assert_eq!(config.username.as_deref(), Some("writer"));
        assert_eq!(config.password.as_deref(), Some("secret"));
    }
}
