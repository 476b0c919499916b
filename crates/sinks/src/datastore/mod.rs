//! Datastore - Primary Batch Writer
//!
//! Writes every event to the wide `commerce.events` ClickHouse table, the
//! single source of truth that analytics dashboards query.
//!
//! # Insert modes
//!
//! | Mode | Per batch | On row failure |
//! |------|-----------|----------------|
//! | async insert (default) | one server-side async insert per event | counted in [`BatchOutcome`], logged, batch continues |
//! | transactional | one prepared batch, committed atomically | whole batch aborted, error returned |
//!
//! The store is reached through the [`Datastore`] trait so the writer can be
//! exercised without a server; [`ClickHouseStore`] is the production
//! implementation.

mod config;
mod error;
mod metrics;
pub mod schema;
mod store;
mod tables;
mod writer;

pub use config::{
    ClickHouseConfig, DEFAULT_BATCH_SIZE, DEFAULT_BUFFER_SIZE, DEFAULT_DATABASE,
    DEFAULT_FLUSH_INTERVAL, DEFAULT_TABLE, WriterConfig,
};
pub use error::{StoreError, WriterError};
pub use metrics::{MetricsSnapshot, WriterMetrics};
pub use schema::{SchemaReport, ensure_schema};
pub use store::{ClickHouseStore, Datastore, PreparedBatch};
pub use tables::{EventRow, REVENUE_SCALE, TOKEN_PRICE_SCALE, to_decimal};
pub use writer::{BatchOutcome, DatastoreWriter};

#[cfg(test)]
#[path = "datastore_test.rs"]
mod datastore_test;
