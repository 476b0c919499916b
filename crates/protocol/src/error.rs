//! Protocol error types

use thiserror::Error;

/// Errors from parsing or encoding protocol types
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Event name is not part of the standard table
    #[error("unknown event name: {0}")]
    UnknownEventName(String),

    /// JSON encoding failed
    #[error("failed to encode {what}: {source}")]
    Encode {
        /// What was being encoded (e.g., "properties")
        what: &'static str,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// JSON decoding failed
    #[error("failed to decode event: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Create an Encode error
    pub fn encode(what: &'static str, source: serde_json::Error) -> Self {
        Self::Encode { what, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_event_name_display() {
        let err = ProtocolError::UnknownEventName("bogus".into());
        assert!(err.to_string().contains("bogus"));
        assert!(err.to_string().contains("unknown event name"));
    }

    #[test]
    fn test_decode_display() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ProtocolError::Decode(source);
        assert!(err.to_string().starts_with("failed to decode event"));
    }
}
