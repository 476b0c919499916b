//! Rate-limited error logging
//!
//! Fire-and-forget paths (async inserts, background HTTP flushes) can fail
//! once per event when a destination is down. This logger emits at most one
//! line per interval and reports how many failures were suppressed since.
//!
//! # Example
//!
//! ```ignore
//! use tally_sinks::util::RateLimitedLogger;
//! use std::time::Duration;
//!
//! let logger = RateLimitedLogger::new(Duration::from_secs(10));
//!
//! // Only logs once per 10 seconds, even if called frequently
//! for _ in 0..1000 {
//!     logger.error("async insert failed", &err);
//! }
//! ```

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between log lines
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Logger that emits at most one line per interval
pub struct RateLimitedLogger {
    min_interval: Duration,
    last_log_time: Mutex<Option<Instant>>,
    /// Failures since the last emitted line
    pending: AtomicU64,
    /// Failures ever recorded
    total: AtomicU64,
}

impl RateLimitedLogger {
    /// Create a logger with the given interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log_time: Mutex::new(None),
            pending: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Record a failure at error level
    ///
    /// Returns true if a line was emitted, false if it was suppressed.
    pub fn error(&self, message: &str, error: &dyn Display) -> bool {
        let Some((suppressed, total)) = self.record() else {
            return false;
        };
        tracing::error!(
            message = %message,
            error = %error,
            suppressed_count = suppressed,
            total_errors = total,
            "error (rate-limited)"
        );
        true
    }

    /// Record a failure at warn level
    ///
    /// Returns true if a line was emitted, false if it was suppressed.
    pub fn warn(&self, message: &str, error: &dyn Display) -> bool {
        let Some((suppressed, total)) = self.record() else {
            return false;
        };
        tracing::warn!(
            message = %message,
            error = %error,
            suppressed_count = suppressed,
            total_errors = total,
            "warning (rate-limited)"
        );
        true
    }

    /// Count a failure; returns (suppressed, total) when a line is due
    fn record(&self) -> Option<(u64, u64)> {
        self.pending.fetch_add(1, Ordering::Relaxed);
        let total = self.total.fetch_add(1, Ordering::Relaxed) + 1;

        {
            let mut last = self.last_log_time.lock();
            let now = Instant::now();
            match *last {
                Some(at) if now.duration_since(at) < self.min_interval => return None,
                _ => *last = Some(now),
            }
        }

        let count = self.pending.swap(0, Ordering::Relaxed);
        Some((count.saturating_sub(1), total))
    }

    /// Failures recorded since the last emitted line
    pub fn pending_count(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    /// Failures ever recorded
    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interval() {
        let logger = RateLimitedLogger::default();
        assert_eq!(logger.min_interval, DEFAULT_LOG_INTERVAL);
        assert_eq!(logger.total_count(), 0);
    }

    #[test]
    fn test_first_error_always_logs() {
        let logger = RateLimitedLogger::new(Duration::from_secs(10));
        assert!(logger.error("insert failed", &"connection refused"));
        assert_eq!(logger.total_count(), 1);
        assert_eq!(logger.pending_count(), 0);
    }

    #[test]
    fn test_rapid_errors_suppressed() {
        let logger = RateLimitedLogger::new(Duration::from_secs(10));
        assert!(logger.error("insert failed", &"boom"));

        for _ in 0..10 {
            assert!(!logger.warn("insert failed", &"boom"));
        }

        assert_eq!(logger.total_count(), 11);
        assert_eq!(logger.pending_count(), 10);
    }

    #[test]
    fn test_zero_interval_logs_every_time() {
        let logger = RateLimitedLogger::new(Duration::ZERO);
        assert!(logger.error("a", &"x"));
        assert!(logger.error("b", &"y"));
        assert_eq!(logger.pending_count(), 0);
    }
}
