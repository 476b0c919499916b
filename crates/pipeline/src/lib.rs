//! Tally - Pipeline
//!
//! The event emitter that connects producers to destinations.
//!
//! # Architecture
//!
//! ```text
//!                                 ┌──→ DatastoreWriter ──→ ClickHouse (primary)
//! [Producers] ──→ Emitter::emit_* ┼──→ InsightsForwarder ──→ POST /batch/
//!                                 └──→ AnalyticsForwarder ──→ POST /api/send
//! ```
//!
//! # Key Design
//!
//! - **Partial failure isolation**: every configured destination is
//!   attempted; failures are collected into one [`EmitError`]
//! - **No producer blocking**: destinations queue and batch in their own
//!   tasks, falling back to a synchronous write only when a queue is full
//! - **Swappable primary**: the writer sits behind a read/write lock so
//!   `set_datastore` can replace it while emits are in flight
//!
//! # Example
//!
//! ```ignore
//! use tally_config::Config;
//! use tally_pipeline::Emitter;
//!
//! let config = Config::from_file("tally.toml")?;
//! let emitter = Emitter::connect(&config).await?;
//!
//! emitter.emit_order_completed(&order).await?;
//!
//! emitter.close().await?;
//! ```

mod destinations;
mod emitter;
mod error;

pub use destinations::{analytics_config, clickhouse_config, insights_config, writer_config};
pub use emitter::Emitter;
pub use error::{Destination, DestinationError, EmitError, Failure, Operation};
