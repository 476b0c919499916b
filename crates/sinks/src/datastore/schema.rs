//! Schema bootstrap for the events database
//!
//! Idempotent `CREATE ... IF NOT EXISTS` statements executed in dependency
//! order. This is a bootstrap, not a migration system: statements that fail
//! (for example because an incompatible table already exists) are logged and
//! skipped.

use super::error::StoreError;
use super::store::Datastore;

/// One named DDL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaStatement {
    /// Object created by the statement
    pub name: String,
    /// DDL text
    pub ddl: String,
}

/// Result of a bootstrap run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    /// Objects whose statement succeeded
    pub applied: Vec<String>,
    /// Objects whose statement failed, with the error text
    pub failed: Vec<(String, String)>,
}

impl SchemaReport {
    /// True when every statement succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// `CREATE DATABASE` statement
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {database}")
}

/// Table and view statements, target tables before the views that feed them
///
/// `table` names the events table; its hourly rollup and the view feeding it
/// are named after it (`{table}_hourly`, `{table}_hourly_mv`).
pub fn statements(database: &str, table: &str) -> Vec<SchemaStatement> {
    let db = database;
    vec![
        SchemaStatement {
            name: format!("{db}.{table}"),
            ddl: format!(
                r#"CREATE TABLE IF NOT EXISTS {db}.{table} (
    event_id UUID DEFAULT generateUUIDv4(),
    distinct_id String,
    event String,

    timestamp DateTime64(3) DEFAULT now64(3),
    sent_at DateTime64(3) DEFAULT now64(3),
    created_at DateTime64(3) DEFAULT now64(3),

    organization_id String,
    project_id String DEFAULT '',

    session_id String DEFAULT '',
    visit_id String DEFAULT '',

    properties String DEFAULT '{{}}',
    person_properties String DEFAULT '{{}}',

    group_type String DEFAULT '',
    group_key String DEFAULT '',
    group_properties String DEFAULT '{{}}',

    url String DEFAULT '',
    url_path String DEFAULT '',
    referrer String DEFAULT '',
    referrer_domain String DEFAULT '',
    hostname String DEFAULT '',

    browser String DEFAULT '',
    browser_version String DEFAULT '',
    os String DEFAULT '',
    os_version String DEFAULT '',
    device String DEFAULT '',
    device_type LowCardinality(String) DEFAULT '',
    screen String DEFAULT '',
    language String DEFAULT '',

    country LowCardinality(String) DEFAULT '',
    region String DEFAULT '',
    city String DEFAULT '',

    utm_source String DEFAULT '',
    utm_medium String DEFAULT '',
    utm_campaign String DEFAULT '',
    utm_content String DEFAULT '',
    utm_term String DEFAULT '',

    gclid String DEFAULT '',
    fbclid String DEFAULT '',
    msclkid String DEFAULT '',

    ip String DEFAULT '',
    user_agent String DEFAULT '',

    order_id String DEFAULT '',
    product_id String DEFAULT '',
    cart_id String DEFAULT '',
    revenue Decimal64(4) DEFAULT 0,
    quantity UInt32 DEFAULT 0,

    ast_context String DEFAULT '',
    ast_type String DEFAULT '',
    page_title String DEFAULT '',
    page_description String DEFAULT '',
    page_type LowCardinality(String) DEFAULT '',

    element_id String DEFAULT '',
    element_type LowCardinality(String) DEFAULT '',
    element_selector String DEFAULT '',
    element_text String DEFAULT '',
    element_href String DEFAULT '',

    section_name String DEFAULT '',
    section_type LowCardinality(String) DEFAULT '',
    section_id String DEFAULT '',

    component_path String DEFAULT '',
    component_data String DEFAULT '',

    model_provider LowCardinality(String) DEFAULT '',
    model_name String DEFAULT '',
    token_count UInt32 DEFAULT 0,
    token_price Decimal64(6) DEFAULT 0,
    prompt_tokens UInt32 DEFAULT 0,
    output_tokens UInt32 DEFAULT 0,

    lib String DEFAULT 'tally',
    lib_version String DEFAULT '',

    _partition_date Date DEFAULT toDate(timestamp)
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(_partition_date)
ORDER BY (organization_id, toStartOfHour(timestamp), distinct_id, session_id, event_id)
SETTINGS index_granularity = 8192"#
            ),
        },
        SchemaStatement {
            name: format!("{db}.{table}_hourly"),
            ddl: format!(
                r#"CREATE TABLE IF NOT EXISTS {db}.{table}_hourly (
    organization_id String,
    hour DateTime,
    event String,
    url_path String,
    referrer_domain String,
    country LowCardinality(String),
    device_type LowCardinality(String),
    browser String,
    os String,
    event_count UInt64,
    unique_users UInt64,
    unique_sessions UInt64,
    total_revenue Decimal64(4)
)
ENGINE = SummingMergeTree()
PARTITION BY toYYYYMM(hour)
ORDER BY (organization_id, hour, event, url_path, referrer_domain, country, device_type, browser, os)"#
            ),
        },
        SchemaStatement {
            name: format!("{db}.{table}_hourly_mv"),
            ddl: format!(
                r#"CREATE MATERIALIZED VIEW IF NOT EXISTS {db}.{table}_hourly_mv
TO {db}.{table}_hourly
AS SELECT
    organization_id,
    toStartOfHour(timestamp) AS hour,
    event,
    url_path,
    referrer_domain,
    country,
    device_type,
    browser,
    os,
    count() AS event_count,
    uniqExact(distinct_id) AS unique_users,
    uniqExact(session_id) AS unique_sessions,
    sum(revenue) AS total_revenue
FROM {db}.{table}
GROUP BY organization_id, hour, event, url_path, referrer_domain, country, device_type, browser, os"#
            ),
        },
        SchemaStatement {
            name: format!("{db}.persons"),
            ddl: format!(
                r#"CREATE TABLE IF NOT EXISTS {db}.persons (
    distinct_id String,
    organization_id String,
    properties String DEFAULT '{{}}',
    created_at DateTime64(3) DEFAULT now64(3),
    updated_at DateTime64(3) DEFAULT now64(3),
    email String DEFAULT '',
    name String DEFAULT '',
    _partition_date Date DEFAULT toDate(created_at)
)
ENGINE = ReplacingMergeTree(updated_at)
PARTITION BY toYYYYMM(_partition_date)
ORDER BY (organization_id, distinct_id)"#
            ),
        },
        SchemaStatement {
            name: format!("{db}.sessions"),
            ddl: format!(
                r#"CREATE TABLE IF NOT EXISTS {db}.sessions (
    session_id String,
    distinct_id String,
    organization_id String,
    started_at DateTime64(3),
    ended_at DateTime64(3),
    duration_seconds UInt32 DEFAULT 0,
    entry_url String DEFAULT '',
    exit_url String DEFAULT '',
    pageview_count UInt32 DEFAULT 0,
    event_count UInt32 DEFAULT 0,
    is_bounce UInt8 DEFAULT 0,
    browser String DEFAULT '',
    os String DEFAULT '',
    device_type LowCardinality(String) DEFAULT '',
    country LowCardinality(String) DEFAULT '',
    _partition_date Date DEFAULT toDate(started_at)
)
ENGINE = ReplacingMergeTree(ended_at)
PARTITION BY toYYYYMM(_partition_date)
ORDER BY (organization_id, session_id)"#
            ),
        },
        SchemaStatement {
            name: format!("{db}.groups"),
            ddl: format!(
                r#"CREATE TABLE IF NOT EXISTS {db}.groups (
    group_type String,
    group_key String,
    organization_id String,
    properties String DEFAULT '{{}}',
    created_at DateTime64(3) DEFAULT now64(3),
    updated_at DateTime64(3) DEFAULT now64(3)
)
ENGINE = ReplacingMergeTree(updated_at)
ORDER BY (organization_id, group_type, group_key)"#
            ),
        },
    ]
}

/// Ensure the database and all tables exist
///
/// # Errors
///
/// Returns an error only if the database itself cannot be created. Failures
/// of individual table statements are logged and reported in the returned
/// [`SchemaReport`].
pub async fn ensure_schema(
    store: &dyn Datastore,
    database: &str,
    table: &str,
) -> Result<SchemaReport, StoreError> {
    store.exec(&create_database(database)).await?;

    let mut report = SchemaReport::default();
    for statement in statements(database, table) {
        match store.exec(&statement.ddl).await {
            Ok(()) => {
                tracing::debug!(object = %statement.name, "schema statement applied");
                report.applied.push(statement.name);
            }
            Err(e) => {
                tracing::warn!(object = %statement.name, error = %e, "schema statement failed");
                report.failed.push((statement.name, e.to_string()));
            }
        }
    }

    tracing::info!(
        database = %database,
        applied = report.applied.len(),
        failed = report.failed.len(),
        "schema bootstrap finished"
    );

    Ok(report)
}
