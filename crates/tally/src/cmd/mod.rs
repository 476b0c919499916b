//! Command implementations for the Tally CLI

pub mod replay;
pub mod schema;
