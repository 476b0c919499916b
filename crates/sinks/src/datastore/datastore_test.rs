//! Tests for the datastore writer

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tally_protocol::RawEvent;

use super::*;
use crate::testing::MemoryStore;

// =============================================================================
// Test Helpers
// =============================================================================

fn event(n: usize) -> RawEvent {
    RawEvent::new(format!("user_{n}"), "order_completed").with_organization("org1")
}

fn transactional(batch_size: usize) -> WriterConfig {
    WriterConfig::default()
        .with_async_insert(false)
        .with_batch_size(batch_size)
        .with_flush_interval(Duration::from_secs(3600))
}

fn writer(store: &MemoryStore, config: WriterConfig) -> DatastoreWriter {
    DatastoreWriter::new(Arc::new(store.clone()), config)
}

// =============================================================================
// Size and interval triggers
// =============================================================================

#[tokio::test]
async fn test_full_batch_written_once() {
    let store = MemoryStore::new();
    let writer = writer(&store, transactional(3));

    for i in 0..3 {
        writer.write(event(i)).await.unwrap();
    }
    writer.close().await.unwrap();

    let batches = store.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 3);
    assert_eq!(batches[0][0].distinct_id, "user_0");
    assert_eq!(batches[0][2].distinct_id, "user_2");
    assert_eq!(store.prepared(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_partial_batch_written_after_interval() {
    let store = MemoryStore::new();
    let config = transactional(100).with_flush_interval(Duration::from_secs(5));
    let writer = writer(&store, config);

    writer.write(event(1)).await.unwrap();
    assert!(store.batches().is_empty());

    tokio::time::sleep(Duration::from_secs(6)).await;

    let batches = store.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[0][0].distinct_id, "user_1");

    writer.close().await.unwrap();
    assert_eq!(store.batches().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_interval_tick_with_empty_batch_writes_nothing() {
    let store = MemoryStore::new();
    let config = transactional(100).with_flush_interval(Duration::from_secs(1));
    let writer = writer(&store, config);

    tokio::time::sleep(Duration::from_secs(5)).await;
    writer.close().await.unwrap();

    assert_eq!(store.prepared(), 0);
}

// =============================================================================
// Backpressure fallback
// =============================================================================

#[tokio::test]
async fn test_full_queue_falls_back_to_sync_write() {
    let store = MemoryStore::new();
    let config = transactional(100).with_buffer_size(2);
    let writer = writer(&store, config);

    // The worker has not run yet on this single-threaded runtime, so the
    // third write finds the queue full.
    writer.write(event(0)).await.unwrap();
    writer.write(event(1)).await.unwrap();
    writer.write(event(2)).await.unwrap();

    let batches = store.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0][0].distinct_id, "user_2");

    writer.close().await.unwrap();

    let mut ids: Vec<_> = store.rows().into_iter().map(|r| r.distinct_id).collect();
    ids.sort();
    assert_eq!(ids, vec!["user_0", "user_1", "user_2"]);

    let snap = writer.metrics_snapshot();
    assert_eq!(snap.sync_fallbacks, 1);
    assert_eq!(snap.events_received, 3);
    assert_eq!(snap.events_written, 3);
}

#[tokio::test]
async fn test_sync_fallback_surfaces_store_error() {
    let store = MemoryStore::new();
    store.set_unavailable(true);
    let config = transactional(100).with_buffer_size(1);
    let writer = writer(&store, config);

    writer.write(event(0)).await.unwrap();
    let err = writer.write(event(1)).await.unwrap_err();
    assert!(matches!(err, WriterError::Prepare(_)));
}

// =============================================================================
// Flush and close
// =============================================================================

#[tokio::test]
async fn test_write_then_flush_persists_one_record() {
    let store = MemoryStore::new();
    let writer = writer(&store, transactional(100));

    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut input = RawEvent::new("u1", "product_viewed")
        .with_organization("org1")
        .with_timestamp(ts)
        .with_property("sku", "SKU-1");
    input.product_id = "p1".into();
    input.revenue = 9.99;

    writer.write(input).await.unwrap();
    let outcome = writer.flush().await.unwrap();
    assert_eq!(outcome.written, 1);

    let rows = store.rows();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.distinct_id, "u1");
    assert_eq!(row.event, "product_viewed");
    assert_eq!(row.organization_id, "org1");
    assert_eq!(row.product_id, "p1");
    assert_eq!(row.revenue, 99_900);
    assert_eq!(row.timestamp, ts.timestamp_millis());
    assert_eq!(row.properties, r#"{"sku":"SKU-1"}"#);
    assert_eq!(row.lib, tally_protocol::DEFAULT_LIB);

    writer.close().await.unwrap();
    assert_eq!(store.rows().len(), 1);
}

#[tokio::test]
async fn test_flush_with_nothing_queued() {
    let store = MemoryStore::new();
    let writer = writer(&store, transactional(100));

    let outcome = writer.flush().await.unwrap();
    assert_eq!(outcome, BatchOutcome::default());
    assert_eq!(store.prepared(), 0);
}

#[tokio::test]
async fn test_close_twice_is_noop() {
    let store = MemoryStore::new();
    let writer = writer(&store, transactional(100));

    writer.write(event(0)).await.unwrap();
    writer.close().await.unwrap();
    writer.close().await.unwrap();

    assert!(writer.is_closed());
    assert_eq!(store.rows().len(), 1);
}

#[tokio::test]
async fn test_write_after_close_rejected() {
    let store = MemoryStore::new();
    let writer = writer(&store, transactional(100));
    writer.close().await.unwrap();

    let err = writer.write(event(0)).await.unwrap_err();
    assert!(matches!(err, WriterError::Closed));

    // Flush after close has nothing to do
    assert_eq!(writer.flush().await.unwrap(), BatchOutcome::default());
}

#[tokio::test]
async fn test_close_drains_queue() {
    let store = MemoryStore::new();
    let writer = writer(&store, transactional(2));

    for i in 0..5 {
        writer.write(event(i)).await.unwrap();
    }
    writer.close().await.unwrap();

    let sizes: Vec<_> = store.batches().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
}

// =============================================================================
// Insert modes
// =============================================================================

#[tokio::test]
async fn test_transactional_append_failure_aborts_batch() {
    let store = MemoryStore::new();
    store.fail_append_at(1);
    let writer = writer(&store, transactional(100));

    for i in 0..3 {
        writer.write(event(i)).await.unwrap();
    }
    let err = writer.flush().await.unwrap_err();

    assert!(matches!(err, WriterError::Append(_)));
    assert!(store.rows().is_empty());
    assert_eq!(store.aborted(), 1);
    assert_eq!(writer.metrics_snapshot().write_errors, 1);
}

#[tokio::test]
async fn test_async_insert_failures_do_not_abort_batch() {
    let store = MemoryStore::new();
    store.fail_async_for("user_1");
    let config = WriterConfig::default()
        .with_batch_size(100)
        .with_flush_interval(Duration::from_secs(3600));
    let writer = writer(&store, config);

    for i in 0..3 {
        writer.write(event(i)).await.unwrap();
    }
    let outcome = writer.flush().await.unwrap();

    assert_eq!(outcome, BatchOutcome { written: 2, failed: 1 });
    let ids: Vec<_> = store.async_rows().into_iter().map(|r| r.distinct_id).collect();
    assert_eq!(ids, vec!["user_0", "user_2"]);
    assert_eq!(store.prepared(), 0);

    let snap = writer.metrics_snapshot();
    assert_eq!(snap.async_failures, 1);
    assert_eq!(snap.events_written, 2);
    assert_eq!(snap.write_errors, 0);
}

#[tokio::test]
async fn test_write_applies_defaults() {
    let store = MemoryStore::new();
    let writer = writer(&store, transactional(100));

    let before = Utc::now().timestamp_millis();
    writer.write(RawEvent::new("u1", "custom")).await.unwrap();
    writer.flush().await.unwrap();

    let row = &store.rows()[0];
    assert!(row.timestamp >= before);
    assert!(row.sent_at >= before);
    assert_eq!(row.lib, "tally");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers() {
    let store = MemoryStore::new();
    let writer = Arc::new(writer(&store, transactional(50).with_buffer_size(16)));

    let mut handles = Vec::new();
    for p in 0..4 {
        let writer = Arc::clone(&writer);
        handles.push(tokio::spawn(async move {
            for i in 0..100 {
                writer.write(event(p * 1000 + i)).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    writer.close().await.unwrap();

    assert_eq!(store.rows().len(), 400);
}
