//! Datastore errors

/// Errors from the storage collaborator
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// ClickHouse client error
    #[error("clickhouse error: {0}")]
    ClickHouse(#[from] clickhouse::error::Error),

    /// Row could not be encoded for insertion
    #[error("failed to encode {field}: {source}")]
    Encode {
        /// Column being encoded
        field: &'static str,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Numeric value does not fit its Decimal64 column
    #[error("{field} is not a representable decimal: {value}")]
    Decimal {
        /// Column being encoded
        field: &'static str,
        /// Rejected value
        value: f64,
    },

    /// Any other store failure (used by alternative store implementations)
    #[error("store error: {0}")]
    Other(String),
}

/// Errors returned to callers of the datastore writer
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// Writer was closed; the event was not accepted
    #[error("writer is closed")]
    Closed,

    /// Preparing the batch failed
    #[error("failed to prepare batch: {0}")]
    Prepare(#[source] StoreError),

    /// Appending a row failed; the whole batch was aborted
    #[error("failed to append event: {0}")]
    Append(#[source] StoreError),

    /// Committing the batch failed
    #[error("failed to send batch: {0}")]
    Send(#[source] StoreError),

    /// The writer task went away while a flush was pending
    #[error("writer task stopped")]
    WorkerGone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_message() {
        assert_eq!(WriterError::Closed.to_string(), "writer is closed");
    }

    #[test]
    fn test_append_wraps_store_error() {
        let err = WriterError::Append(StoreError::Other("row rejected".into()));
        assert_eq!(err.to_string(), "failed to append event: store error: row rejected");
    }
}
