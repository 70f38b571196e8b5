//! Concurrency tests: overlapping pipeline runs share coordinators safely.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;

use fleet::config::Config;
use fleet::coordinator::{Coordinator, StageMetrics};
use fleet::core::RecordStatus;
use fleet::store::RecordStore;
use fleet::worker::{PayloadKind, PoolSettings, WorkPayload, WorkerPool};
use fleet::Pipeline;

use super::fixtures::{memory_pipeline, reference_task};

/// Test: Concurrent runs lose no learning updates
/// Given 16 tasks submitted concurrently to one pipeline
/// When all finish
/// Then every coordinator learned 16 records and every record was stored
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_lose_no_updates() {
    let (pipeline, store) = memory_pipeline();
    let pipeline = Arc::new(pipeline);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.submit(reference_task()).await })
        })
        .collect();

    for joined in join_all(handles).await {
        assert_eq!(joined.unwrap().status, RecordStatus::Completed);
    }

    for metrics in pipeline.metrics().await {
        assert_eq!(metrics.records_learned, 16, "{}", metrics.name);
    }
    match pipeline.evaluator().stage_metrics().await {
        StageMetrics::Evaluation { tasks_evaluated, .. } => assert_eq!(tasks_evaluated, 16),
        other => panic!("unexpected metrics {:?}", other),
    }
    assert_eq!(store.tasks(None).await.unwrap().len(), 16);
    for status in pipeline.statuses().await {
        assert_eq!(status.pending_work, 0);
    }
}

/// Test: Sub-workers within a dispatch run concurrently
/// Given a pool with 100ms latency
/// When 5 units are dispatched
/// Then the dispatch takes about one latency, not five
#[tokio::test]
async fn test_dispatch_is_concurrent() {
    let pool = WorkerPool::new(
        "timing",
        PoolSettings {
            size: 5,
            latency: Duration::from_millis(100),
            ..PoolSettings::default()
        },
    );
    let payload = WorkPayload::new(PayloadKind::SubtaskExecution, serde_json::json!({}))
        .with_allocation(5);

    let start = Instant::now();
    let outcomes = pool.dispatch(payload, 5).await;
    let elapsed = start.elapsed();

    assert_eq!(outcomes.len(), 5);
    assert!(
        elapsed < Duration::from_millis(400),
        "dispatch took {:?}",
        elapsed
    );
}

/// Test: Timed-out units count as failures without failing the run
/// Given a dispatch timeout shorter than the sub-worker latency
/// When a task is submitted
/// Then the run completes with every subtask at rate 0
#[tokio::test]
async fn test_dispatch_timeout_degrades_gracefully() {
    let config = Config {
        worker_latency_ms: 200,
        dispatch_timeout_ms: Some(10),
        ..Config::default()
    };
    let pipeline = Pipeline::from_config(&config);
    let record = pipeline.submit(reference_task()).await;

    assert_eq!(record.status, RecordStatus::Completed);
    let execution = record.execution.unwrap();
    assert!(execution
        .subtask_results
        .iter()
        .all(|r| r.success_rate == 0.0));
    assert!(execution.subtask_results[0]
        .outcomes
        .iter()
        .all(|o| o.status.as_deref() == Some("timed_out")));
}
