//! JSON record store integration tests.

use fleet::coordinator::{Coordinator, StageMetrics};
use fleet::core::RecordStatus;
use fleet::report::ReportKind;
use fleet::store::{JsonStore, RecordStore};

use super::fixtures::{reference_task, TestStore};

/// Test: Submitted tasks are persisted as JSON files
/// Given a pipeline with a JSON store
/// When a task is submitted
/// Then tasks/<id>.json exists and reads back equal to the returned record
#[tokio::test]
async fn test_submitted_record_round_trips() {
    let test_store = TestStore::new();
    let pipeline = test_store.pipeline();

    let record = pipeline.submit(reference_task()).await;

    let path = test_store
        .temp_dir
        .path()
        .join("tasks")
        .join(format!("{}.json", record.id()));
    assert!(path.exists());

    let stored = test_store.store.tasks(None).await.unwrap();
    assert_eq!(stored, vec![record]);
}

/// Test: A second store over the same directory sees earlier records
#[tokio::test]
async fn test_records_survive_reopen() {
    let test_store = TestStore::new();
    test_store.pipeline().submit(reference_task()).await;
    test_store.pipeline().submit(reference_task()).await;

    let reopened = JsonStore::new(test_store.temp_dir.path());
    let records = reopened.tasks(None).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|r| r.status == RecordStatus::Completed));
    assert_eq!(reopened.tasks(Some(1)).await.unwrap().len(), 1);
}

/// Test: Saving a record with the same id keeps the last write
#[tokio::test]
async fn test_last_write_wins() {
    let test_store = TestStore::new();
    let pipeline = test_store.pipeline();
    let task = reference_task();

    let first = pipeline.submit(task.clone()).await;
    pipeline.executor().set_active(false);
    let second = pipeline.submit(task).await;
    assert_eq!(first.id(), second.id());

    let stored = test_store.store.tasks(None).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, RecordStatus::Failed);
}

/// Test: Reports are generated from stored records and persisted
#[tokio::test]
async fn test_weekly_report_is_stored() {
    let test_store = TestStore::new();
    let pipeline = test_store.pipeline();
    pipeline.submit(reference_task()).await;
    pipeline.submit(reference_task()).await;

    let report = pipeline.report(ReportKind::Weekly).await.unwrap();
    assert_eq!(report.kind, ReportKind::Weekly);
    assert_eq!(report.tasks_completed, 2);
    assert_eq!(report.tasks_failed, 0);
    assert_eq!(report.team_performance.get("executor"), Some(&1.0));

    let reports = test_store.store.reports(None).await.unwrap();
    assert_eq!(reports, vec![report]);
}

/// Test: A fresh pipeline over an existing store picks up where runs left off
/// Given earlier runs that stored one completed and one failed task
/// When a new pipeline over the same directory restores and reports
/// Then coordinator rates, counters and team performance reflect the stored runs
#[tokio::test]
async fn test_fresh_pipeline_restores_from_store() {
    let test_store = TestStore::new();
    let earlier = test_store.pipeline();
    earlier.submit(reference_task()).await;
    earlier.executor().set_active(false);
    earlier.submit(reference_task()).await;

    let fresh = test_store.pipeline();
    assert_eq!(fresh.restore().await.unwrap(), 2);

    let report = fresh.report(ReportKind::Daily).await.unwrap();
    assert_eq!(report.tasks_completed, 1);
    assert_eq!(report.tasks_failed, 1);
    for name in ["evaluator", "planner", "executor"] {
        assert_eq!(report.team_performance.get(name), Some(&1.0), "{}", name);
    }

    for metrics in fresh.metrics().await {
        assert_eq!(metrics.records_learned, 1, "{}", metrics.name);
    }
    match fresh.evaluator().stage_metrics().await {
        StageMetrics::Evaluation {
            tasks_evaluated,
            reports_generated,
        } => {
            assert_eq!(tasks_evaluated, 1);
            // the report above was counted live, not replayed
            assert_eq!(reports_generated, 1);
        }
        other => panic!("unexpected metrics {:?}", other),
    }
}
