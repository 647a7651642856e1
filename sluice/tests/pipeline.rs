use std::time::Duration;

use sluice::config::{BatchConfig, PipelineConfig, QueueConfig, RetryConfig};
use sluice::destination::memory::MemoryDestination;
use sluice::error::ErrorKind;
use sluice::pipeline::Sink;
use sluice::test_utils::{CollectingCompletion, FaultInjectingDestination};
use sluice::types::{Field, Method, Record, SqlValue};
use sluice_telemetry::init_test_tracing;

fn pipeline_config(max_size: usize, max_fill_ms: u64) -> PipelineConfig {
    PipelineConfig {
        id: 1,
        queue: QueueConfig { capacity: 64 },
        batch: BatchConfig {
            max_size,
            max_fill_ms,
        },
        retry: RetryConfig { delay_ms: 5_000 },
    }
}

fn insert_record(id: i64, name: &str) -> Record {
    Record::new(
        Method::Insert,
        "users",
        vec![
            Field::new("id", SqlValue::I64(id)),
            Field::new("name", SqlValue::String(name.to_string())),
        ],
        Some("id".to_string()),
    )
}

async fn wait_for_applied(memory: &MemoryDestination<u64>, count: usize) {
    while memory.applied_commands().await.len() < count {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn records_flow_through_chunks_in_order() {
    init_test_tracing();

    let memory = MemoryDestination::new();
    let completion = CollectingCompletion::new();
    let mut sink = Sink::new(pipeline_config(2, 50), memory.clone(), completion.clone());
    sink.start().unwrap();

    for reference in 0..5u64 {
        let record = insert_record(reference as i64, "ann");
        sink.process_record(reference, record).await.unwrap();
    }

    wait_for_applied(&memory, 5).await;
    sink.shutdown_and_wait().await.unwrap();

    // Statement execution order equals enqueue order, across chunk boundaries.
    let applied = memory.applied_commands().await;
    assert_eq!(
        applied.iter().map(|c| c.reference).collect::<Vec<_>>(),
        vec![0, 1, 2, 3, 4]
    );

    // No chunk ever exceeds the configured maximum size.
    for chunk in memory.applied_chunks().await {
        assert!(chunk.len() <= 2);
    }

    // Completions fire once per command, in the same order.
    let completed = completion.completed();
    assert_eq!(
        completed.iter().map(|(r, _)| *r).collect::<Vec<_>>(),
        vec![0, 1, 2, 3, 4]
    );

    // The translated statement reaches the destination unchanged.
    assert_eq!(
        applied[0].query,
        "INSERT INTO \"users\" (\"id\",\"name\") VALUES (:primary_val,:val_0)"
    );
}

#[tokio::test(start_paused = true)]
async fn failed_chunk_is_retried_whole_and_acknowledged_once() {
    init_test_tracing();

    let memory = MemoryDestination::new();
    let destination = FaultInjectingDestination::failing(memory.clone(), 2);
    let completion = CollectingCompletion::new();
    let mut sink = Sink::new(
        pipeline_config(3, 50),
        destination.clone(),
        completion.clone(),
    );
    sink.start().unwrap();

    for reference in 0..3u64 {
        let record = insert_record(reference as i64, "ann");
        sink.process_record(reference, record).await.unwrap();
    }

    wait_for_applied(&memory, 3).await;
    sink.shutdown_and_wait().await.unwrap();

    // Two failed attempts, then the commit.
    assert_eq!(destination.attempts(), 3);

    // The chunk was committed exactly once, as a unit.
    let chunks = memory.applied_chunks().await;
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].len(), 3);

    // Each command was acknowledged exactly once, after the commit.
    let completed = completion.completed();
    assert_eq!(
        completed.iter().map(|(r, _)| *r).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[tokio::test(start_paused = true)]
async fn translation_errors_surface_synchronously() {
    init_test_tracing();

    let memory = MemoryDestination::new();
    let mut sink = Sink::new(pipeline_config(10, 50), memory.clone(), |_: u64, _: Record| {});
    sink.start().unwrap();

    let record = Record::new(
        Method::Insert,
        "users",
        vec![Field::new("name", SqlValue::String("ann".to_string()))],
        Some("id".to_string()),
    );

    let err = sink.process_record(0, record).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingPrimaryKey);

    sink.shutdown_and_wait().await.unwrap();
    assert!(memory.applied_commands().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn untranslatable_records_are_silently_skipped() {
    init_test_tracing();

    let memory = MemoryDestination::new();
    let mut sink = Sink::new(pipeline_config(10, 50), memory.clone(), |_: u64, _: Record| {});
    sink.start().unwrap();

    let update_without_primary = Record::new(
        Method::Update,
        "users",
        vec![Field::new("name", SqlValue::String("ann".to_string()))],
        None,
    );
    let delete_without_primary = Record::new(
        Method::Delete,
        "users",
        vec![Field::new("id", SqlValue::I64(1))],
        None,
    );
    let unsupported = Record::new(Method::Unsupported, "users", vec![], None);

    sink.process_record(0, update_without_primary).await.unwrap();
    sink.process_record(1, delete_without_primary).await.unwrap();
    sink.process_record(2, unsupported).await.unwrap();

    sink.shutdown_and_wait().await.unwrap();
    assert!(memory.applied_commands().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_the_open_chunk() {
    init_test_tracing();

    let memory = MemoryDestination::new();
    let completion = CollectingCompletion::new();
    let mut sink = Sink::new(
        pipeline_config(100, 60_000),
        memory.clone(),
        completion.clone(),
    );
    sink.start().unwrap();

    sink.process_record(0, insert_record(0, "ann")).await.unwrap();
    sink.process_record(1, insert_record(1, "bob")).await.unwrap();

    // Let the consumer pull both commands into the open chunk, then stop the
    // sink before either the size or the idle threshold is reached.
    tokio::time::sleep(Duration::from_millis(1)).await;
    sink.shutdown_and_wait().await.unwrap();

    let applied = memory.applied_commands().await;
    assert_eq!(
        applied.iter().map(|c| c.reference).collect::<Vec<_>>(),
        vec![0, 1]
    );
    assert_eq!(completion.completed().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn starting_twice_is_an_error() {
    init_test_tracing();

    let memory = MemoryDestination::<u64>::new();
    let mut sink = Sink::new(pipeline_config(10, 50), memory, |_: u64, _: Record| {});

    sink.start().unwrap();
    let err = sink.start().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    sink.shutdown_and_wait().await.unwrap();
}
