//! Failure handling tests: errors stop at the pipeline boundary.

use tokio::sync::mpsc;

use fleet::coordinator::Coordinator;
use fleet::core::RecordStatus;
use fleet::store::RecordStore;
use fleet::worker::SuccessPredicate;
use fleet::{Error, PipelineEvent};

use super::fixtures::{memory_pipeline, pipeline, pipeline_with_predicate, reference_task};

/// Test: Deactivated coordinator produces a failed record
/// Given a pipeline whose planner is deactivated
/// When a task is submitted
/// Then the record is failed with the error text, keeps the task, and is stored
#[tokio::test]
async fn test_inactive_planner_yields_failed_record() {
    let (pipeline, store) = memory_pipeline();
    pipeline.planner().set_active(false);

    let task = reference_task();
    let record = pipeline.submit(task.clone()).await;

    assert_eq!(record.status, RecordStatus::Failed);
    assert_eq!(record.task, task);
    assert!(record.evaluation.is_none());
    assert!(record.plan.is_none());
    assert!(record
        .error
        .as_deref()
        .unwrap()
        .contains("Coordinator is inactive: planner"));
    assert!(record.completed_at.is_some());

    let stored = store.tasks(None).await.unwrap();
    assert_eq!(stored, vec![record]);
}

/// Test: A failed run teaches nothing
#[tokio::test]
async fn test_failed_run_skips_learning() {
    let pipeline = pipeline();
    pipeline.executor().set_active(false);
    pipeline.submit(reference_task()).await;

    for metrics in pipeline.metrics().await {
        assert_eq!(metrics.records_learned, 0, "{}", metrics.name);
    }
    let executor = pipeline.executor().status().await;
    assert!(!executor.active);
    assert_eq!(executor.pending_work, 0);
}

/// Test: Reactivating a coordinator restores the pipeline
#[tokio::test]
async fn test_reactivated_coordinator_recovers() {
    let pipeline = pipeline();
    pipeline.evaluator().set_active(false);
    assert!(matches!(
        pipeline.run(&reference_task()).await,
        Err(Error::TaskFailed { .. })
    ));

    pipeline.evaluator().set_active(true);
    assert!(pipeline.run(&reference_task()).await.is_ok());
}

/// Test: Failed event is emitted
#[tokio::test]
async fn test_failed_event_is_emitted() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = pipeline().with_events(tx);
    pipeline.executor().set_active(false);
    let task = reference_task();
    let id = task.id;
    pipeline.submit(task).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    // submitted, evaluation done, planning done, failed
    assert_eq!(events.len(), 4);
    match events.last().unwrap() {
        PipelineEvent::Failed { task_id, error } => {
            assert_eq!(*task_id, id);
            assert!(error.contains("executor"));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

/// Test: Failing sub-workers never fail the task
/// Given sub-workers that reject every payload
/// When a task is submitted
/// Then the record is completed with a zero execution success rate
#[tokio::test]
async fn test_failing_sub_workers_are_absorbed() {
    let pipeline = pipeline_with_predicate(<dyn SuccessPredicate>::from_fn(|_, _| false));
    let record = pipeline.submit(reference_task()).await;

    assert_eq!(record.status, RecordStatus::Completed);
    let execution = record.execution.unwrap();
    assert_eq!(execution.subtask_results.len(), 3);
    assert_eq!(execution.success_rate(), 0.0);
    assert_eq!(execution.summary.unwrap().successful_subtasks, 0);
}
