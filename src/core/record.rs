//! Task records handed to the persistence sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::evaluation::Evaluation;
use super::execution::ExecutionResult;
use super::plan::Plan;
use super::task::{Task, TaskId};

/// Terminal (or initial) status of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Submitted,
    Completed,
    Failed,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Submitted => write!(f, "submitted"),
            RecordStatus::Completed => write!(f, "completed"),
            RecordStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A task together with whatever the pipeline produced for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(flatten)]
    pub task: Task,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn submitted(task: Task) -> Self {
        Self {
            task,
            status: RecordStatus::Submitted,
            evaluation: None,
            plan: None,
            execution: None,
            error: None,
            completed_at: None,
        }
    }

    pub fn completed(
        task: Task,
        evaluation: Evaluation,
        plan: Plan,
        execution: ExecutionResult,
    ) -> Self {
        Self {
            task,
            status: RecordStatus::Completed,
            evaluation: Some(evaluation),
            plan: Some(plan),
            execution: Some(execution),
            error: None,
            completed_at: Some(Utc::now()),
        }
    }

    pub fn failed(task: Task, error: &str) -> Self {
        Self {
            task,
            status: RecordStatus::Failed,
            evaluation: None,
            plan: None,
            execution: None,
            error: Some(error.to_string()),
            completed_at: Some(Utc::now()),
        }
    }

    pub fn id(&self) -> TaskId {
        self.task.id
    }

    /// Check if the record is in a terminal state (Completed or Failed).
    pub fn is_finished(&self) -> bool {
        matches!(self.status, RecordStatus::Completed | RecordStatus::Failed)
    }
}
