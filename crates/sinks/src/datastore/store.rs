//! Storage collaborator contract and its ClickHouse implementation
//!
//! The writer needs three capabilities from the store: an atomic prepared
//! batch, a fire-and-forget single-row insert, and DDL execution.

use async_trait::async_trait;
use clickhouse::Client;
use clickhouse::insert::Insert;

use super::config::ClickHouseConfig;
use super::error::StoreError;
use super::tables::EventRow;

// =============================================================================
// Contract
// =============================================================================

/// An open batch insert
///
/// Rows become visible only after `send`. Dropping or aborting discards
/// everything appended so far.
#[async_trait]
pub trait PreparedBatch: Send {
    /// Append one row
    async fn append(&mut self, row: &EventRow) -> Result<(), StoreError>;

    /// Commit all appended rows
    async fn send(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard all appended rows
    async fn abort(self: Box<Self>);
}

/// Storage capability required by the writer and schema bootstrap
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Open a batch insert into `table`
    async fn prepare_batch(&self, table: &str) -> Result<Box<dyn PreparedBatch>, StoreError>;

    /// Insert one row with server-side async insert
    ///
    /// With `wait = false` the call returns once the server has queued the
    /// row, not once it is durable.
    async fn async_insert(&self, table: &str, row: &EventRow, wait: bool)
    -> Result<(), StoreError>;

    /// Execute a DDL statement
    async fn exec(&self, ddl: &str) -> Result<(), StoreError>;
}

// =============================================================================
// ClickHouse
// =============================================================================

/// ClickHouse-backed [`Datastore`]
#[derive(Clone)]
pub struct ClickHouseStore {
    client: Client,
}

impl ClickHouseStore {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from connection settings
    pub fn from_config(config: &ClickHouseConfig) -> Self {
        Self::new(config.build_client())
    }
}

struct ClickHouseBatch {
    insert: Insert<EventRow>,
}

#[async_trait]
impl PreparedBatch for ClickHouseBatch {
    async fn append(&mut self, row: &EventRow) -> Result<(), StoreError> {
        self.insert.write(row).await?;
        Ok(())
    }

    async fn send(self: Box<Self>) -> Result<(), StoreError> {
        self.insert.end().await?;
        Ok(())
    }

    async fn abort(self: Box<Self>) {
        // An unfinished insert is cancelled on drop
        let Self { insert } = *self;
        drop(insert);
    }
}

#[async_trait]
impl Datastore for ClickHouseStore {
    async fn prepare_batch(&self, table: &str) -> Result<Box<dyn PreparedBatch>, StoreError> {
        let insert: Insert<EventRow> = self.client.insert(table).await?;
        Ok(Box::new(ClickHouseBatch { insert }))
    }

    async fn async_insert(
        &self,
        table: &str,
        row: &EventRow,
        wait: bool,
    ) -> Result<(), StoreError> {
        let client = self
            .client
            .clone()
            .with_option("async_insert", "1")
            .with_option("wait_for_async_insert", if wait { "1" } else { "0" });

        let mut insert: Insert<EventRow> = client.insert(table).await?;
        insert.write(row).await?;
        insert.end().await?;
        Ok(())
    }

    async fn exec(&self, ddl: &str) -> Result<(), StoreError> {
        self.client.query(ddl).execute().await?;
        Ok(())
    }
}
