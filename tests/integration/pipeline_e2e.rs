//! End-to-end pipeline tests.

use fleet::coordinator::{Coordinator, StageMetrics};
use fleet::core::{ExecutionStatus, Priority, RecordStatus, SubtaskGraph};

use super::fixtures::{banded_tasks, pipeline, reference_task};

/// Test: Reference task runs to completion
/// Given task {complexity 3, urgency 2, impact 4}
/// When submitted through the pipeline
/// Then priority is critical, 3 subtasks are planned and all 3 execute
#[tokio::test]
async fn test_reference_task_end_to_end() {
    let pipeline = pipeline();
    let task = reference_task();
    let id = task.id;

    let record = pipeline.submit(task).await;

    assert_eq!(record.status, RecordStatus::Completed);
    assert_eq!(record.id(), id);
    assert!(record.error.is_none());

    let evaluation = record.evaluation.expect("evaluation");
    assert_eq!(evaluation.task_id, id);
    assert_eq!(evaluation.priority, Priority::Critical);
    assert_eq!(evaluation.complexity, 3);
    assert_eq!(evaluation.insights.len(), 3);

    let plan = record.plan.expect("plan");
    assert_eq!(plan.task_id, id);
    assert_eq!(plan.subtasks.len(), 3);
    assert_eq!(plan.resources.sub_workers, 6);
    assert!(SubtaskGraph::from_subtasks(&plan.subtasks).is_ok());

    let execution = record.execution.expect("execution");
    assert_eq!(execution.plan_id, plan.id);
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.subtask_results.len(), 3);
    assert_eq!(execution.success_rate(), 1.0);
}

/// Test: Priority bands hold through the whole pipeline
/// Given tasks whose scores fall in each band
/// When each is run
/// Then the evaluation carries the expected band
#[tokio::test]
async fn test_priority_bands_end_to_end() {
    let pipeline = pipeline();
    let expected = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    for (task, want) in banded_tasks().into_iter().zip(expected) {
        let record = pipeline.submit(task).await;
        assert_eq!(record.evaluation.unwrap().priority, want);
    }
}

/// Test: Complexity is clamped before planning
/// Given a task with complexity 15
/// When run
/// Then the evaluation clamps to 10 and 10 subtasks are planned
#[tokio::test]
async fn test_high_complexity_is_clamped() {
    let pipeline = pipeline();
    let task = reference_task().with_complexity(15);
    let record = pipeline.submit(task).await;

    let evaluation = record.evaluation.unwrap();
    assert_eq!(evaluation.complexity, 10);
    assert_eq!(
        evaluation.recommended_actions,
        vec!["allocate maximum sub-workers", "enable advanced monitoring"]
    );

    let plan = record.plan.unwrap();
    assert_eq!(plan.subtasks.len(), 10);
    assert!(plan.risk.high_risk());
    assert_eq!(plan.subtasks[9].dependencies, (0..9).collect::<Vec<_>>());
}

/// Test: run() returns the execution directly
#[tokio::test]
async fn test_run_returns_execution() {
    let pipeline = pipeline();
    let execution = pipeline.run(&reference_task()).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.summary.unwrap().total_subtasks, 3);
}

/// Test: Stage counters move once per run
#[tokio::test]
async fn test_stage_counters() {
    let pipeline = pipeline();
    pipeline.submit(reference_task()).await;
    pipeline.submit(reference_task().with_complexity(1)).await;

    match pipeline.planner().stage_metrics().await {
        StageMetrics::Planning {
            plans_created,
            subtasks_planned,
            ..
        } => {
            assert_eq!(plans_created, 2);
            assert_eq!(subtasks_planned, 4);
        }
        other => panic!("unexpected metrics {:?}", other),
    }

    match pipeline.executor().stage_metrics().await {
        StageMetrics::Execution {
            executions_completed,
            subtasks_executed,
            average_success_rate,
            ..
        } => {
            assert_eq!(executions_completed, 2);
            assert_eq!(subtasks_executed, 4);
            assert_eq!(average_success_rate, 1.0);
        }
        other => panic!("unexpected metrics {:?}", other),
    }
}

/// Test: Accessors are idempotent
/// Given a pipeline after one run
/// When status and metrics are read twice
/// Then both reads are equal
#[tokio::test]
async fn test_accessors_are_idempotent() {
    let pipeline = pipeline();
    pipeline.submit(reference_task()).await;

    assert_eq!(pipeline.statuses().await, pipeline.statuses().await);
    assert_eq!(pipeline.metrics().await, pipeline.metrics().await);

    let statuses = pipeline.statuses().await;
    let names: Vec<_> = statuses.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["evaluator", "planner", "executor"]);
    assert!(statuses.iter().all(|s| s.active && s.pending_work == 0));
    assert!(statuses.iter().all(|s| s.sub_workers_active == 10));
}
