//! Learning statistics integration tests.

use serde_json::json;

use fleet::coordinator::Coordinator;
use fleet::worker::SuccessPredicate;

use super::fixtures::{pipeline, pipeline_with_predicate, reference_task};

/// Test: Coordinators start with no learning
#[tokio::test]
async fn test_fresh_pipeline_has_zero_rates() {
    let pipeline = pipeline();
    for metrics in pipeline.metrics().await {
        assert_eq!(metrics.recent_success_rate, 0.0);
        assert_eq!(metrics.records_learned, 0);
    }
}

/// Test: A completed execution counts as a success for all coordinators
/// Given a run whose sub-workers all fail
/// When the execution completes
/// Then every coordinator still learns rate 1.0, since the execution's
/// status is "completed"
#[tokio::test]
async fn test_completed_status_counts_as_success() {
    let pipeline = pipeline_with_predicate(<dyn SuccessPredicate>::from_fn(|_, _| false));
    let record = pipeline.submit(reference_task()).await;
    assert_eq!(record.execution.unwrap().success_rate(), 0.0);

    for metrics in pipeline.metrics().await {
        assert_eq!(metrics.records_learned, 1, "{}", metrics.name);
        assert_eq!(metrics.recent_success_rate, 1.0, "{}", metrics.name);
    }
}

/// Test: Empty feedback resets the rate
/// Given a coordinator that has learned rate 1.0
/// When learn_from receives an empty batch
/// Then the rate is exactly 0
#[tokio::test]
async fn test_empty_feedback_resets_rate() {
    let pipeline = pipeline();
    pipeline.submit(reference_task()).await;
    let evaluator = pipeline.evaluator();
    assert_eq!(evaluator.metrics().await.recent_success_rate, 1.0);

    evaluator.learn_from(Vec::new()).await;
    assert_eq!(evaluator.metrics().await.recent_success_rate, 0.0);
}

/// Test: Success predicate checks all three signals
/// Given records succeeding through each signal plus failures
/// When ingested
/// Then the rate counts exactly the succeeding ones
#[tokio::test]
async fn test_success_predicate_signals() {
    let pipeline = pipeline();
    let planner = pipeline.planner();

    planner
        .learn_from(vec![
            json!({"success": true}),
            json!({"status": "completed"}),
            json!({"success_rate": 0.75}),
            json!({"success_rate": 0.5}),
            json!({"success": false, "status": "failed"}),
            json!("not a record"),
        ])
        .await;

    let metrics = planner.metrics().await;
    assert_eq!(metrics.records_learned, 5);
    assert!((metrics.recent_success_rate - 0.6).abs() < 1e-9);
}

/// Test: Each coordinator keeps its own statistics
#[tokio::test]
async fn test_coordinators_learn_independently() {
    let pipeline = pipeline();
    pipeline
        .executor()
        .learn_from(vec![json!({"success": false})])
        .await;

    assert_eq!(pipeline.executor().metrics().await.records_learned, 1);
    assert_eq!(pipeline.evaluator().metrics().await.records_learned, 0);
    assert!(pipeline.executor().status().await.last_activity.is_some());
    assert!(pipeline.planner().status().await.last_activity.is_none());
}
