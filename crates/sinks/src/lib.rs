//! Tally - Sinks
//!
//! Destinations for commerce events.
//!
//! # Architecture
//!
//! Every destination owns a bounded queue drained by one tokio task that
//! batches by size and by interval. Producers never wait on a slow
//! destination: when a queue is full the event is written synchronously
//! instead.
//!
//! ```text
//! [Emitter] --RawEvent--> [DatastoreWriter queue] --> [worker] --> ClickHouse
//!           --Capture---> [Insights queue]        --> [worker] --> POST /batch/
//!           --Event-----> [Analytics queue]       --> [worker] --> POST /api/send
//! ```
//!
//! # Destinations
//!
//! | Module | Destination | Role |
//! |--------|-------------|------|
//! | `datastore` | ClickHouse | primary, source of truth |
//! | `forwarder` | Insights / Analytics HTTP APIs | secondary, best effort |

// =============================================================================
// Destinations
// =============================================================================

/// Primary batch writer and schema bootstrap for ClickHouse
pub mod datastore;

/// Secondary HTTP forwarders
pub mod forwarder;

// =============================================================================
// Shared utilities
// =============================================================================

pub mod util;

/// In-memory store for tests
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// =============================================================================
// Public re-exports
// =============================================================================

pub use datastore::{
    BatchOutcome, ClickHouseConfig, ClickHouseStore, Datastore, DatastoreWriter, StoreError,
    WriterConfig, WriterError,
};
pub use forwarder::{
    Analytics, AnalyticsEvent, AnalyticsForwarder, Capture, ForwarderConfig, ForwarderError,
    Insights, InsightsForwarder,
};
