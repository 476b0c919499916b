//! Emitter error types
//!
//! An emit, flush or close touches every configured destination and never
//! stops at the first failure. Each failure is recorded against the
//! destination it came from and all of them are returned together.

use std::fmt;

use tally_sinks::{ForwarderError, WriterError};
use thiserror::Error;

/// Destinations the emitter fans out to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Primary ClickHouse store
    Datastore,
    /// PostHog-compatible HTTP API
    Insights,
    /// Umami-compatible HTTP API
    Analytics,
}

impl Destination {
    /// Lowercase name used in messages and logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Datastore => "datastore",
            Self::Insights => "insights",
            Self::Analytics => "analytics",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation that produced an [`EmitError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Emit,
    Flush,
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Emit => "event emission",
            Self::Flush => "flush",
            Self::Close => "close",
        })
    }
}

/// Error from a single destination
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error(transparent)]
    Writer(#[from] WriterError),

    #[error(transparent)]
    Forwarder(#[from] ForwarderError),

    /// Destination required by the call is not set up
    #[error("not configured")]
    NotConfigured,
}

/// One destination's failure within an operation
#[derive(Debug)]
pub struct Failure {
    pub destination: Destination,
    /// Sub-step within the destination (e.g. "identify", "flush")
    pub step: Option<&'static str>,
    pub error: DestinationError,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(step) => write!(f, "{} {}: {}", self.destination, step, self.error),
            None => write!(f, "{}: {}", self.destination, self.error),
        }
    }
}

/// Aggregated failures of one emitter operation
///
/// Displays as `"<operation> errors: datastore: ...; insights: ..."`.
#[derive(Debug)]
pub struct EmitError {
    operation: Operation,
    failures: Vec<Failure>,
}

impl EmitError {
    /// Operation that failed
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Individual failures, in the order destinations were attempted
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Whether any failure came from `destination`
    pub fn involves(&self, destination: Destination) -> bool {
        self.failures.iter().any(|f| f.destination == destination)
    }

    pub(crate) fn not_configured(destination: Destination) -> Self {
        Self {
            operation: Operation::Emit,
            failures: vec![Failure {
                destination,
                step: None,
                error: DestinationError::NotConfigured,
            }],
        }
    }
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors: ", self.operation)?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|f| &f.error as &(dyn std::error::Error + 'static))
    }
}

/// Collects per-destination results for one operation
pub(crate) struct Failures {
    operation: Operation,
    failures: Vec<Failure>,
}

impl Failures {
    pub(crate) fn new(operation: Operation) -> Self {
        Self {
            operation,
            failures: Vec::new(),
        }
    }

    /// Record the result of one destination call
    pub(crate) fn check<T, E>(
        &mut self,
        destination: Destination,
        step: Option<&'static str>,
        result: Result<T, E>,
    ) where
        E: Into<DestinationError>,
    {
        if let Err(e) = result {
            self.failures.push(Failure {
                destination,
                step,
                error: e.into(),
            });
        }
    }

    pub(crate) fn finish(self) -> Result<(), EmitError> {
        if self.failures.is_empty() {
            return Ok(());
        }
        Err(EmitError {
            operation: self.operation,
            failures: self.failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_joins_failures() {
        let mut failures = Failures::new(Operation::Emit);
        failures.check(Destination::Datastore, None, Err::<(), _>(WriterError::Closed));
        failures.check(Destination::Insights, None, Ok::<(), ForwarderError>(()));
        failures.check(
            Destination::Insights,
            Some("identify"),
            Err::<(), _>(ForwarderError::Status {
                destination: "insights",
                status: 502,
            }),
        );

        let err = failures.finish().unwrap_err();
        assert_eq!(
            err.to_string(),
            "event emission errors: datastore: writer is closed; \
             insights identify: insights API error: status 502"
        );
        assert_eq!(err.failures().len(), 2);
        assert!(err.involves(Destination::Insights));
        assert!(!err.involves(Destination::Analytics));
    }

    #[test]
    fn test_no_failures_is_ok() {
        let mut failures = Failures::new(Operation::Flush);
        failures.check(Destination::Analytics, Some("flush"), Ok::<(), ForwarderError>(()));
        assert!(failures.finish().is_ok());
    }

    #[test]
    fn test_not_configured() {
        let err = EmitError::not_configured(Destination::Datastore);
        assert_eq!(err.operation(), Operation::Emit);
        assert_eq!(
            err.to_string(),
            "event emission errors: datastore: not configured"
        );
    }

    #[test]
    fn test_operation_labels() {
        assert_eq!(Operation::Flush.to_string(), "flush");
        assert_eq!(Operation::Close.to_string(), "close");
        assert_eq!(Destination::Analytics.to_string(), "analytics");
    }
}
