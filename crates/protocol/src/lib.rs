//! Tally Protocol - Canonical event types
//!
//! This crate provides the types that flow from producers to destinations:
//! - `RawEvent` - The wide, append-only record written to the primary store
//! - `EventName` - The fixed table of standard event names
//! - `Order`, `Product`, `User`, `PageView` - Typed commerce inputs
//!
//! # Lifecycle
//!
//! A `RawEvent` is built by the emitter, handed to a writer (which fills in
//! timestamp and library defaults), queued, and discarded after a single write
//! attempt. There is no update or delete path.

mod commerce;
mod error;
mod event;
mod schema;

pub use commerce::{Order, OrderItem, PageView, Product, User};
pub use error::ProtocolError;
pub use event::{Properties, RawEvent, into_properties};
pub use schema::EventName;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Library name stamped on events that do not carry one
pub const DEFAULT_LIB: &str = "tally";

/// Library method reported to secondary analytics APIs
pub const LIB_METHOD: &str = "server";

// Test modules - only compiled during testing
#[cfg(test)]
mod commerce_test;
#[cfg(test)]
mod event_test;
#[cfg(test)]
mod schema_test;
