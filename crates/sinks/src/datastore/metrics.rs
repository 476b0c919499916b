//! Datastore writer metrics
//!
//! Atomic counters for tracking writer throughput and health.

use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// Metrics
// =============================================================================

/// Metrics for the datastore writer
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Events accepted by `write`
    pub events_received: AtomicU64,

    /// Events persisted (or queued server-side in async mode)
    pub events_written: AtomicU64,

    /// Async inserts that failed and were discarded
    pub async_failures: AtomicU64,

    /// Batches written
    pub batches_written: AtomicU64,

    /// Failed batch writes
    pub write_errors: AtomicU64,

    /// Writes that took the synchronous path because the queue was full
    pub sync_fallbacks: AtomicU64,
}

impl WriterMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            events_written: AtomicU64::new(0),
            async_failures: AtomicU64::new(0),
            batches_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            sync_fallbacks: AtomicU64::new(0),
        }
    }

    /// Record an accepted event
    #[inline]
    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a written batch
    #[inline]
    pub fn record_batch(&self, written: u64, failed: u64) {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        self.events_written.fetch_add(written, Ordering::Relaxed);
        self.async_failures.fetch_add(failed, Ordering::Relaxed);
    }

    /// Record a failed batch
    #[inline]
    pub fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a synchronous fallback
    #[inline]
    pub fn record_sync_fallback(&self) {
        self.sync_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_written: self.events_written.load(Ordering::Relaxed),
            async_failures: self.async_failures.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            sync_fallbacks: self.sync_fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of writer metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_written: u64,
    pub async_failures: u64,
    pub batches_written: u64,
    pub write_errors: u64,
    pub sync_fallbacks: u64,
}
