//! Forwarder - Secondary HTTP destinations
//!
//! Best-effort relay of events to external analytics APIs. Every destination
//! runs the same pipeline as the datastore writer (bounded queue, one worker,
//! size/interval flush, synchronous send when the queue is full) and differs
//! only in how a batch is turned into HTTP requests.
//!
//! # Destinations
//!
//! | Destination | Path | Requests per flush |
//! |-------------|------|--------------------|
//! | [`Insights`] (PostHog-compatible) | `/batch/` | one, JSON array |
//! | [`Analytics`] (Umami-compatible) | `/api/send` | one per event |
//!
//! Requests within a flush are sent in order and the flush stops at the
//! first transport error or non-200/204 response; the remaining events of
//! that flush are not sent.

mod analytics;
mod insights;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use reqwest::header::CONTENT_TYPE;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::util::RateLimitedLogger;

pub use analytics::{Analytics, AnalyticsEvent, AnalyticsEventKind, AnalyticsForwarder};
pub use insights::{Capture, Insights, InsightsForwarder};

// =============================================================================
// Destination
// =============================================================================

/// How a destination turns a batch into HTTP request bodies
pub trait HttpDestination: Send + Sync + 'static {
    /// Queued item type
    type Event: Send + Sync + 'static;

    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Request path appended to the endpoint
    fn path(&self) -> &'static str;

    /// Encode a batch into request bodies, sent in order
    fn encode(&self, events: &[Self::Event]) -> Result<Vec<Vec<u8>>, ForwarderError>;
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for an [`HttpForwarder`]
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// API base URL (no trailing path)
    pub endpoint: String,

    /// Events per flush
    pub batch_size: usize,

    /// Maximum time a partial batch waits
    pub flush_interval: Duration,

    /// Per-request timeout
    pub timeout: Duration,

    /// Queue and batch in a background task; false sends on every call
    pub async_mode: bool,
}

impl ForwarderConfig {
    /// Create a config with the generic defaults (50 / 10s / 5s, async)
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            batch_size: 50,
            flush_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(5),
            async_mode: true,
        }
    }

    /// Set the batch size
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the flush interval
    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable background batching
    #[must_use]
    pub fn with_async(mut self, enabled: bool) -> Self {
        self.async_mode = enabled;
        self
    }

    /// Queue capacity (ten batches)
    pub fn queue_size(&self) -> usize {
        self.batch_size.max(1) * 10
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), path)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Forwarder errors
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    /// Forwarder was closed; the event was not accepted
    #[error("forwarder is closed")]
    Closed,

    /// Payload could not be encoded
    #[error("failed to encode {what}: {source}")]
    Encode {
        /// What was being encoded
        what: &'static str,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// HTTP client could not be built
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport failure
    #[error("failed to send request: {0}")]
    Request(#[source] reqwest::Error),

    /// Destination answered with a non-success status
    #[error("{destination} API error: status {status}")]
    Status {
        /// Destination name
        destination: &'static str,
        /// HTTP status code
        status: u16,
    },

    /// The worker task went away while a flush was pending
    #[error("forwarder task stopped")]
    WorkerGone,
}

impl ForwarderError {
    /// Create an Encode error
    pub fn encode(what: &'static str, source: serde_json::Error) -> Self {
        Self::Encode { what, source }
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Metrics for an HTTP forwarder
#[derive(Debug, Default)]
pub struct ForwarderMetrics {
    /// Events accepted by `send`
    pub events_received: AtomicU64,

    /// Events delivered
    pub events_sent: AtomicU64,

    /// Successful requests
    pub requests_sent: AtomicU64,

    /// Flushes that stopped on an error
    pub flushes_failed: AtomicU64,

    /// Sends that bypassed the full queue
    pub sync_fallbacks: AtomicU64,
}

impl ForwarderMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            events_sent: AtomicU64::new(0),
            requests_sent: AtomicU64::new(0),
            flushes_failed: AtomicU64::new(0),
            sync_fallbacks: AtomicU64::new(0),
        }
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> ForwarderMetricsSnapshot {
        ForwarderMetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_sent: self.events_sent.load(Ordering::Relaxed),
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            flushes_failed: self.flushes_failed.load(Ordering::Relaxed),
            sync_fallbacks: self.sync_fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of forwarder metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderMetricsSnapshot {
    pub events_received: u64,
    pub events_sent: u64,
    pub requests_sent: u64,
    pub flushes_failed: u64,
    pub sync_fallbacks: u64,
}

// =============================================================================
// Forwarder
// =============================================================================

enum Command {
    Flush(oneshot::Sender<Result<(), ForwarderError>>),
}

/// How `send` hands events over
enum Intake<E> {
    /// Background worker owns the receiver
    Queued(mpsc::Sender<E>),
    /// No worker; every call sends immediately
    Direct,
    Closed,
}

struct Shared<D: HttpDestination> {
    destination: D,
    client: reqwest::Client,
    url: String,
    config: ForwarderConfig,
    metrics: ForwarderMetrics,
    worker_errors: RateLimitedLogger,
}

impl<D: HttpDestination> Shared<D> {
    /// Encode and POST a batch, stopping at the first failure
    async fn send_events(&self, events: &[D::Event]) -> Result<(), ForwarderError> {
        if events.is_empty() {
            return Ok(());
        }

        let result = self.post_all(events).await;
        if result.is_err() {
            self.metrics.flushes_failed.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    async fn post_all(&self, events: &[D::Event]) -> Result<(), ForwarderError> {
        let bodies = self.destination.encode(events)?;

        for body in bodies {
            let response = self
                .client
                .post(&self.url)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .map_err(ForwarderError::Request)?;

            let status = response.status().as_u16();
            if status != 200 && status != 204 {
                return Err(ForwarderError::Status {
                    destination: self.destination.name(),
                    status,
                });
            }
            self.metrics.requests_sent.fetch_add(1, Ordering::Relaxed);
        }

        self.metrics
            .events_sent
            .fetch_add(events.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn flush_pending(&self, batch: &mut Vec<D::Event>, trigger: &'static str) {
        let pending = std::mem::replace(batch, Vec::with_capacity(self.config.batch_size));

        match self.send_events(&pending).await {
            Ok(()) => {
                tracing::debug!(
                    destination = self.destination.name(),
                    trigger,
                    count = pending.len(),
                    "flushed events"
                );
            }
            Err(e) => {
                self.worker_errors.error("forward failed", &e);
            }
        }
    }
}

/// Batching HTTP forwarder for one destination
pub struct HttpForwarder<D: HttpDestination> {
    shared: Arc<Shared<D>>,
    intake: RwLock<Intake<D::Event>>,
    commands: Option<mpsc::Sender<Command>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<D: HttpDestination> HttpForwarder<D> {
    /// Create a forwarder; in async mode its worker is spawned
    ///
    /// Must be called from within a tokio runtime when `async_mode` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(destination: D, config: ForwarderConfig) -> Result<Self, ForwarderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ForwarderError::Client)?;

        let url = config.url(destination.path());
        let async_mode = config.async_mode;
        let queue_size = config.queue_size();

        let shared = Arc::new(Shared {
            destination,
            client,
            url,
            config,
            metrics: ForwarderMetrics::new(),
            worker_errors: RateLimitedLogger::default(),
        });

        if !async_mode {
            return Ok(Self {
                shared,
                intake: RwLock::new(Intake::Direct),
                commands: None,
                worker: Mutex::new(None),
            });
        }

        let (sender, receiver) = mpsc::channel(queue_size);
        let (commands, command_rx) = mpsc::channel(16);
        let worker = tokio::spawn(run(Arc::clone(&shared), receiver, command_rx));

        Ok(Self {
            shared,
            intake: RwLock::new(Intake::Queued(sender)),
            commands: Some(commands),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Destination name
    pub fn name(&self) -> &'static str {
        self.shared.destination.name()
    }

    /// Full request URL
    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// Get reference to config
    pub fn config(&self) -> &ForwarderConfig {
        &self.shared.config
    }

    /// Get a snapshot of metrics
    pub fn metrics_snapshot(&self) -> ForwarderMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        matches!(*self.intake.read(), Intake::Closed)
    }

    /// Queue an event, or send it now in sync mode or when the queue is full
    ///
    /// # Errors
    ///
    /// [`ForwarderError::Closed`] after `close`; otherwise only errors from
    /// an immediate send.
    pub async fn send(&self, event: D::Event) -> Result<(), ForwarderError> {
        let event = {
            let intake = self.intake.read();
            match &*intake {
                Intake::Closed => return Err(ForwarderError::Closed),
                Intake::Direct => event,
                Intake::Queued(tx) => match tx.try_send(event) {
                    Ok(()) => {
                        self.shared
                            .metrics
                            .events_received
                            .fetch_add(1, Ordering::Relaxed);
                        return Ok(());
                    }
                    Err(TrySendError::Full(event)) => {
                        self.shared
                            .metrics
                            .sync_fallbacks
                            .fetch_add(1, Ordering::Relaxed);
                        event
                    }
                    Err(TrySendError::Closed(_)) => return Err(ForwarderError::Closed),
                },
            }
        };

        self.shared
            .metrics
            .events_received
            .fetch_add(1, Ordering::Relaxed);
        self.shared.send_events(std::slice::from_ref(&event)).await
    }

    /// Send everything queued so far
    ///
    /// A no-op in sync mode and after `close`.
    pub async fn flush(&self) -> Result<(), ForwarderError> {
        let Some(commands) = &self.commands else {
            return Ok(());
        };
        if self.is_closed() {
            return Ok(());
        }

        let (reply, response) = oneshot::channel();
        if commands.send(Command::Flush(reply)).await.is_err() {
            return Ok(());
        }

        response.await.map_err(|_| ForwarderError::WorkerGone)?
    }

    /// Stop accepting events, drain the queue and wait for the worker
    ///
    /// Idempotent; waits as long as the final flush takes.
    pub async fn close(&self) -> Result<(), ForwarderError> {
        let previous = std::mem::replace(&mut *self.intake.write(), Intake::Closed);
        if matches!(previous, Intake::Closed) {
            return Ok(());
        }
        drop(previous);

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.await.map_err(|_| ForwarderError::WorkerGone)?;
        }

        Ok(())
    }
}

async fn run<D: HttpDestination>(
    shared: Arc<Shared<D>>,
    mut events: mpsc::Receiver<D::Event>,
    mut commands: mpsc::Receiver<Command>,
) {
    let name = shared.destination.name();
    tracing::info!(
        destination = name,
        url = %shared.url,
        batch_size = shared.config.batch_size,
        "forwarder starting"
    );

    let period = shared.config.flush_interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut batch: Vec<D::Event> = Vec::with_capacity(shared.config.batch_size);

    loop {
        tokio::select! {
            received = events.recv() => {
                match received {
                    Some(event) => {
                        batch.push(event);
                        if batch.len() >= shared.config.batch_size {
                            shared.flush_pending(&mut batch, "size").await;
                        }
                    }
                    None => break, // Queue closed
                }
            }
            _ = ticker.tick() => {
                if !batch.is_empty() {
                    shared.flush_pending(&mut batch, "interval").await;
                }
            }
            Some(command) = commands.recv() => {
                match command {
                    Command::Flush(reply) => {
                        while let Ok(event) = events.try_recv() {
                            batch.push(event);
                        }
                        let pending = std::mem::take(&mut batch);
                        let result = shared.send_events(&pending).await;
                        // Caller may have stopped waiting
                        let _ = reply.send(result);
                    }
                }
            }
        }
    }

    // Final flush
    if !batch.is_empty() {
        shared.flush_pending(&mut batch, "shutdown").await;
    }

    let snapshot = shared.metrics.snapshot();
    tracing::info!(
        destination = name,
        received = snapshot.events_received,
        sent = snapshot.events_sent,
        failed_flushes = snapshot.flushes_failed,
        "forwarder shutting down"
    );
}
