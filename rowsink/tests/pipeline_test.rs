use std::time::{Duration, Instant};

use rowsink::pipeline::SinkPipeline;
use rowsink::schema::{ColumnDescriptor, ColumnType};
use rowsink::store::memory::MemoryStore;
use rowsink::types::{Cell, Event};
use rowsink_config::shared::{BatchConfig, HostSelection, SinkConfig};
use rowsink_telemetry::init_test_tracing;

fn config(bulk_actions: usize, flush_interval_secs: u64, concurrent: u16) -> SinkConfig {
    SinkConfig {
        table: "logs".to_string(),
        hosts: vec!["memory://".to_string()],
        fields: vec!["a".to_string(), "b".to_string()],
        batch: BatchConfig {
            bulk_actions,
            flush_interval_secs,
        },
        concurrent,
        host_selection: HostSelection::First,
    }
}

fn store() -> MemoryStore {
    MemoryStore::new(vec![
        ColumnDescriptor::new("a", ColumnType::Integer),
        ColumnDescriptor::new("b", ColumnType::Text),
    ])
}

fn event(a: i64, b: Option<&str>) -> Event {
    let mut event = Event::new();
    event.set("a", Cell::I64(a));
    match b {
        Some(b) => event.set("b", Cell::String(b.to_string())),
        None => event.set("b", Cell::Null),
    }
    event
}

/// Polls the store until `expected` rows have been committed or the deadline
/// passes.
async fn wait_for_rows(store: &MemoryStore, expected: usize, deadline: Duration) {
    let started = Instant::now();
    loop {
        if store.committed_rows().await.len() >= expected {
            return;
        }
        assert!(
            started.elapsed() < deadline,
            "expected {expected} committed rows, got {}",
            store.committed_rows().await.len()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn size_based_flush_binds_column_defaults() {
    init_test_tracing();

    let store = store();
    let pipeline = SinkPipeline::start(config(2, 30, 1), &store)
        .await
        .expect("pipeline should start");

    pipeline.emit(event(1, Some("x"))).await.unwrap();
    pipeline.emit(event(2, None)).await.unwrap();

    wait_for_rows(&store, 2, Duration::from_secs(5)).await;

    // Exactly one dispatched batch of two rows, with the null `b` bound to
    // the default for the column's declared type.
    let batches = store.committed_batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[0][0], vec![Cell::I64(1), Cell::String("x".into())]);
    assert_eq!(batches[0][1], vec![Cell::I64(2), Cell::String(String::new())]);

    pipeline.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn time_based_flush_dispatches_partial_batch() {
    init_test_tracing();

    let store = store();
    let pipeline = SinkPipeline::start(config(10, 1, 1), &store)
        .await
        .expect("pipeline should start");

    for n in 0..5 {
        pipeline.emit(event(n, Some("v"))).await.unwrap();
    }

    // Nothing reaches the size threshold; the 1s timer must flush instead.
    wait_for_rows(&store, 5, Duration::from_secs(5)).await;

    let batches = store.committed_batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 5);

    pipeline.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_flushes_buffered_events() {
    init_test_tracing();

    let store = store();
    let pipeline = SinkPipeline::start(config(100, 30, 2), &store)
        .await
        .expect("pipeline should start");

    for n in 0..3 {
        pipeline.emit(event(n, Some("v"))).await.unwrap();
    }

    // Neither threshold nor timer fired yet; graceful shutdown must not lose
    // the buffered events.
    pipeline.shutdown(Duration::from_secs(5)).await.unwrap();

    let rows = store.committed_rows().await;
    assert_eq!(rows.len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_row_does_not_poison_its_batch() {
    init_test_tracing();

    let store = store();
    store.fail_rows_containing(Some(Cell::I64(1))).await;

    let pipeline = SinkPipeline::start(config(3, 30, 1), &store)
        .await
        .expect("pipeline should start");

    for n in 0..3 {
        pipeline.emit(event(n, Some("v"))).await.unwrap();
    }

    wait_for_rows(&store, 2, Duration::from_secs(5)).await;

    let rows = store.committed_rows().await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], Cell::I64(0));
    assert_eq!(rows[1][0], Cell::I64(2));

    pipeline.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_returns_within_timeout_when_store_hangs() {
    init_test_tracing();

    let store = store();
    store.hang_execute(true).await;

    let pipeline = SinkPipeline::start(config(3, 30, 1), &store)
        .await
        .expect("pipeline should start");

    // The first full batch wedges the single worker, the second fills the
    // one-slot dispatch queue, and the last two events stay buffered so the
    // final flush has to block on the queue.
    for n in 0..8 {
        pipeline.emit(event(n, Some("v"))).await.unwrap();
    }

    let started = Instant::now();
    pipeline.shutdown(Duration::from_millis(100)).await.unwrap();
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "shutdown must return no later than its timeout"
    );

    assert!(store.committed_rows().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn startup_rejects_invalid_config() {
    init_test_tracing();

    let mut invalid = config(2, 30, 1);
    invalid.fields.clear();

    assert!(SinkPipeline::start(invalid, &store()).await.is_err());
}
