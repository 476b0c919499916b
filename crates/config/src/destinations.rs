//! Destination configuration types
//!
//! One section per destination. The primary store is ClickHouse; the two
//! secondaries are optional HTTP analytics APIs. A secondary that is enabled
//! but lacks its endpoint or credential is treated as not configured rather
//! than as an error.

use serde::Deserialize;
use std::time::Duration;

/// Primary store (ClickHouse) configuration
///
/// # Example
///
/// ```toml
/// [datastore]
/// enabled = true
/// url = "http://localhost:8123"
/// database = "commerce"
/// batch_size = 500
/// flush_interval = "5s"
/// async_insert = true
/// buffer_size = 10000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatastoreConfig {
    /// Whether events are written to the primary store
    /// Default: false
    pub enabled: bool,

    /// ClickHouse HTTP URL
    /// Default: http://localhost:8123
    pub url: String,

    /// Database holding the events tables
    /// Default: commerce
    pub database: String,

    /// Username for authentication (optional)
    pub username: Option<String>,

    /// Password for authentication (optional)
    pub password: Option<String>,

    /// Events table name
    /// Default: events
    pub table: String,

    /// Events per batch before a flush
    /// Default: 500
    pub batch_size: usize,

    /// Maximum time a partial batch waits before a flush
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,

    /// Use fire-and-forget async inserts instead of atomic batches
    /// Default: true
    pub async_insert: bool,

    /// Queue capacity between producers and the writer
    /// Default: 10000
    pub buffer_size: usize,

    /// Timeout for the startup schema bootstrap
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub schema_timeout: Duration,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:8123".into(),
            database: "commerce".into(),
            username: None,
            password: None,
            table: "events".into(),
            batch_size: 500,
            flush_interval: Duration::from_secs(5),
            async_insert: true,
            buffer_size: 10_000,
            schema_timeout: Duration::from_secs(30),
        }
    }
}

impl DatastoreConfig {
    /// Fully-qualified events table (`database.table`)
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }
}

/// Insights (PostHog-compatible) forwarding configuration
///
/// # Example
///
/// ```toml
/// [insights]
/// enabled = true
/// endpoint = "https://insights.example.com"
/// api_key = "phc_..."
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Whether events are forwarded
    /// Default: false
    pub enabled: bool,

    /// API base URL
    pub endpoint: String,

    /// Project API key
    pub api_key: String,

    /// Events per flush
    /// Default: 100
    pub batch_size: usize,

    /// Maximum time a partial batch waits
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,

    /// Per-request timeout
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Queue and batch in the background (false = send on every call)
    /// Default: true
    #[serde(rename = "async")]
    pub async_mode: bool,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            api_key: String::new(),
            batch_size: 100,
            flush_interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            async_mode: true,
        }
    }
}

impl InsightsConfig {
    /// Enabled and has both endpoint and API key
    pub fn is_active(&self) -> bool {
        self.enabled && !self.endpoint.is_empty() && !self.api_key.is_empty()
    }
}

/// Analytics (Umami-compatible) forwarding configuration
///
/// # Example
///
/// ```toml
/// [analytics]
/// enabled = true
/// endpoint = "https://analytics.example.com"
/// website_id = "5f2c..."
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Whether events are forwarded
    /// Default: false
    pub enabled: bool,

    /// API base URL
    pub endpoint: String,

    /// Website identifier
    pub website_id: String,

    /// Events per flush
    /// Default: 50
    pub batch_size: usize,

    /// Maximum time a partial batch waits
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,

    /// Per-request timeout
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Queue and batch in the background (false = send on every call)
    /// Default: true
    #[serde(rename = "async")]
    pub async_mode: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            website_id: String::new(),
            batch_size: 50,
            flush_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(5),
            async_mode: true,
        }
    }
}

impl AnalyticsConfig {
    /// Enabled and has both endpoint and website ID
    pub fn is_active(&self) -> bool {
        self.enabled && !self.endpoint.is_empty() && !self.website_id.is_empty()
    }
}
