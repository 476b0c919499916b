//! Primary batch writer
//!
//! Producers call [`DatastoreWriter::write`] from any task. Events go into a
//! bounded queue drained by one background task that flushes when the batch
//! reaches `batch_size`, when the flush interval elapses, or when a caller
//! asks for a flush. When the queue is full the caller writes its event
//! synchronously instead of waiting, so a producer never blocks longer than
//! one store round-trip and no event is dropped.
//!
//! ```text
//! write() --try_send--> [queue] --> [worker: batch] --> Datastore
//!    |                                   ^
//!    +--(queue full)--> write_batch -----+
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tally_protocol::RawEvent;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::util::RateLimitedLogger;

use super::config::WriterConfig;
use super::error::WriterError;
use super::metrics::{MetricsSnapshot, WriterMetrics};
use super::store::Datastore;
use super::tables::EventRow;

/// Capacity of the control channel (flush requests)
const COMMAND_QUEUE_SIZE: usize = 16;

// =============================================================================
// Batch outcome
// =============================================================================

/// Result of writing one batch
///
/// In async-insert mode individual rows can fail without failing the batch;
/// those failures are counted here instead of being returned as an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[must_use]
pub struct BatchOutcome {
    /// Rows accepted by the store
    pub written: usize,
    /// Rows the store rejected (async-insert mode only)
    pub failed: usize,
}

enum Command {
    Flush(oneshot::Sender<Result<BatchOutcome, WriterError>>),
}

// =============================================================================
// Shared state
// =============================================================================

struct Inner {
    store: Arc<dyn Datastore>,
    config: WriterConfig,
    metrics: Arc<WriterMetrics>,
    async_errors: RateLimitedLogger,
}

impl Inner {
    /// Write a batch with the configured insert mode
    async fn write_batch(&self, events: Vec<RawEvent>) -> Result<BatchOutcome, WriterError> {
        if events.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let created_at = Utc::now();
        let result = if self.config.async_insert {
            Ok(self.write_async(&events, created_at).await)
        } else {
            self.write_transactional(&events, created_at).await
        };

        match &result {
            Ok(outcome) => self
                .metrics
                .record_batch(outcome.written as u64, outcome.failed as u64),
            Err(_) => self.metrics.record_error(),
        }

        result
    }

    /// One fire-and-forget insert per event; failures are counted, not returned
    async fn write_async(&self, events: &[RawEvent], created_at: DateTime<Utc>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for event in events {
            let inserted = match EventRow::from_event(event, created_at) {
                Ok(row) => {
                    self.store
                        .async_insert(&self.config.table, &row, false)
                        .await
                }
                Err(e) => Err(e),
            };

            match inserted {
                Ok(()) => outcome.written += 1,
                Err(e) => {
                    outcome.failed += 1;
                    self.async_errors.error("async insert failed", &e);
                }
            }
        }

        outcome
    }

    /// All-or-nothing batch; the first append failure aborts everything
    async fn write_transactional(
        &self,
        events: &[RawEvent],
        created_at: DateTime<Utc>,
    ) -> Result<BatchOutcome, WriterError> {
        let mut batch = self
            .store
            .prepare_batch(&self.config.table)
            .await
            .map_err(WriterError::Prepare)?;

        for event in events {
            let appended = match EventRow::from_event(event, created_at) {
                Ok(row) => batch.append(&row).await,
                Err(e) => Err(e),
            };
            if let Err(e) = appended {
                batch.abort().await;
                return Err(WriterError::Append(e));
            }
        }

        batch.send().await.map_err(WriterError::Send)?;

        Ok(BatchOutcome {
            written: events.len(),
            failed: 0,
        })
    }

    /// Flush the worker's pending batch, logging the result
    async fn flush_pending(&self, batch: &mut Vec<RawEvent>, trigger: &'static str) {
        let pending = std::mem::replace(batch, Vec::with_capacity(self.config.batch_size));
        let count = pending.len();

        match self.write_batch(pending).await {
            Ok(outcome) => {
                tracing::debug!(
                    table = %self.config.table,
                    trigger,
                    written = outcome.written,
                    failed = outcome.failed,
                    "flushed batch"
                );
            }
            Err(e) => {
                tracing::error!(
                    table = %self.config.table,
                    trigger,
                    count,
                    error = %e,
                    "failed to write batch"
                );
            }
        }
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Batching writer for the primary store
pub struct DatastoreWriter {
    inner: Arc<Inner>,

    /// Queue sender; `None` once closed
    sender: RwLock<Option<mpsc::Sender<RawEvent>>>,

    /// Flush requests to the worker
    commands: mpsc::Sender<Command>,

    /// Worker task, taken by the first `close`
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DatastoreWriter {
    /// Create a writer and spawn its worker
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(store: Arc<dyn Datastore>, config: WriterConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.buffer_size.max(1));
        let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE_SIZE);

        let inner = Arc::new(Inner {
            store,
            config,
            metrics: Arc::new(WriterMetrics::new()),
            async_errors: RateLimitedLogger::default(),
        });

        let worker = tokio::spawn(run(Arc::clone(&inner), receiver, command_rx));

        Self {
            inner,
            sender: RwLock::new(Some(sender)),
            commands,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Get reference to config
    pub fn config(&self) -> &WriterConfig {
        &self.inner.config
    }

    /// Get a snapshot of metrics
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Queue an event for writing
    ///
    /// Unset timestamps and library fields are filled in first. If the queue
    /// is full the event is written synchronously and the store's error, if
    /// any, is returned.
    ///
    /// # Errors
    ///
    /// [`WriterError::Closed`] after `close`, or the store error from the
    /// synchronous fallback.
    pub async fn write(&self, mut event: RawEvent) -> Result<(), WriterError> {
        event.apply_defaults(Utc::now());

        let event = {
            let sender = self.sender.read();
            let Some(tx) = sender.as_ref() else {
                return Err(WriterError::Closed);
            };
            match tx.try_send(event) {
                Ok(()) => {
                    self.inner.metrics.record_received();
                    return Ok(());
                }
                Err(TrySendError::Full(event)) => event,
                Err(TrySendError::Closed(_)) => return Err(WriterError::Closed),
            }
        };

        self.inner.metrics.record_received();
        self.inner.metrics.record_sync_fallback();
        tracing::debug!(table = %self.inner.config.table, "queue full, writing synchronously");

        self.inner.write_batch(vec![event]).await.map(|_| ())
    }

    /// Write everything queued so far as one batch
    ///
    /// Includes events the worker has already taken off the queue but not
    /// yet written. Returns the batch error, if any.
    pub async fn flush(&self) -> Result<BatchOutcome, WriterError> {
        if self.is_closed() {
            return Ok(BatchOutcome::default());
        }

        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Flush(reply)).await.is_err() {
            return Ok(BatchOutcome::default());
        }

        response.await.map_err(|_| WriterError::WorkerGone)?
    }

    /// Stop accepting events, drain the queue and wait for the worker
    ///
    /// Idempotent. The wait is unbounded: it lasts as long as the final
    /// flush takes.
    pub async fn close(&self) -> Result<(), WriterError> {
        let Some(sender) = self.sender.write().take() else {
            return Ok(());
        };
        drop(sender);

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.await.map_err(|_| WriterError::WorkerGone)?;
        }

        Ok(())
    }
}

// =============================================================================
// Worker
// =============================================================================

async fn run(
    inner: Arc<Inner>,
    mut events: mpsc::Receiver<RawEvent>,
    mut commands: mpsc::Receiver<Command>,
) {
    tracing::info!(
        table = %inner.config.table,
        batch_size = inner.config.batch_size,
        async_insert = inner.config.async_insert,
        "datastore writer starting"
    );

    let period = inner.config.flush_interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut batch: Vec<RawEvent> = Vec::with_capacity(inner.config.batch_size);

    loop {
        tokio::select! {
            received = events.recv() => {
                match received {
                    Some(event) => {
                        batch.push(event);
                        if batch.len() >= inner.config.batch_size {
                            inner.flush_pending(&mut batch, "size").await;
                        }
                    }
                    None => break, // Queue closed
                }
            }
            _ = ticker.tick() => {
                if !batch.is_empty() {
                    inner.flush_pending(&mut batch, "interval").await;
                }
            }
            Some(command) = commands.recv() => {
                match command {
                    Command::Flush(reply) => {
                        while let Ok(event) = events.try_recv() {
                            batch.push(event);
                        }
                        let pending = std::mem::take(&mut batch);
                        let result = inner.write_batch(pending).await;
                        // Caller may have stopped waiting
                        let _ = reply.send(result);
                    }
                }
            }
        }
    }

    // Final flush
    if !batch.is_empty() {
        inner.flush_pending(&mut batch, "shutdown").await;
    }

    let snapshot = inner.metrics.snapshot();
    tracing::info!(
        table = %inner.config.table,
        received = snapshot.events_received,
        written = snapshot.events_written,
        async_failures = snapshot.async_failures,
        errors = snapshot.write_errors,
        "datastore writer shutting down"
    );
}
