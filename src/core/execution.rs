//! Executor output: per-subtask results and the derived summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use super::id::ExecutionId;
use super::outcome::SubWorkerOutcome;
use super::plan::PlanId;

/// Success rate a subtask must exceed to count as a successful subtask.
///
/// Distinct from the 0.5 graded threshold of the outcome success predicate.
pub const SUCCESSFUL_SUBTASK_THRESHOLD: f64 = 0.8;

/// Execution lifecycle. There is no failed terminal state: a run always
/// ends `Completed`, with failures expressed as low success rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    InProgress,
    Completed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::InProgress => write!(f, "in_progress"),
            ExecutionStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Result of dispatching one subtask to the executor's pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskResult {
    pub subtask_index: usize,
    /// Outcomes of the final attempt.
    pub outcomes: Vec<SubWorkerOutcome>,
    pub success_rate: f64,
    /// Dispatches made for this subtask, including retries.
    pub attempts: u32,
    pub completed_at: DateTime<Utc>,
}

impl SubtaskResult {
    pub fn is_successful(&self) -> bool {
        self.success_rate > SUCCESSFUL_SUBTASK_THRESHOLD
    }
}

/// Aggregate numbers for a finished execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total_subtasks: usize,
    pub successful_subtasks: usize,
    pub success_rate: f64,
    pub duration_seconds: f64,
    /// Subtasks per second.
    pub throughput: f64,
    /// Subtasks that received at least one sub-worker outcome.
    pub resources_utilized: usize,
}

impl ExecutionSummary {
    pub fn derive(
        results: &[SubtaskResult],
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let total_subtasks = results.len();
        let successful_subtasks = results.iter().filter(|r| r.is_successful()).count();
        let success_rate = if total_subtasks > 0 {
            successful_subtasks as f64 / total_subtasks as f64
        } else {
            0.0
        };
        let duration_seconds = (finished_at - started_at)
            .num_microseconds()
            .map(|us| us as f64 / 1_000_000.0)
            .unwrap_or(0.0)
            .max(0.0);
        let throughput = if duration_seconds > 0.0 {
            total_subtasks as f64 / duration_seconds
        } else {
            0.0
        };
        let resources_utilized = results.iter().filter(|r| !r.outcomes.is_empty()).count();

        Self {
            total_subtasks,
            successful_subtasks,
            success_rate,
            duration_seconds,
            throughput,
            resources_utilized,
        }
    }
}

/// One executor run over a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: ExecutionId,
    pub plan_id: PlanId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
    pub subtask_results: Vec<SubtaskResult>,
    pub summary: Option<ExecutionSummary>,
}

impl ExecutionResult {
    /// Open a new in-progress execution for a plan.
    pub fn start(plan_id: PlanId) -> Self {
        Self {
            id: ExecutionId::new(),
            plan_id,
            started_at: Utc::now(),
            finished_at: None,
            status: ExecutionStatus::InProgress,
            subtask_results: Vec::new(),
            summary: None,
        }
    }

    /// Append a subtask result. Ignored once the execution is completed.
    pub fn record(&mut self, result: SubtaskResult) {
        if self.status == ExecutionStatus::InProgress {
            self.subtask_results.push(result);
        }
    }

    /// Close the execution and derive its summary.
    pub fn complete(mut self) -> Self {
        if self.status == ExecutionStatus::Completed {
            return self;
        }
        let finished_at = Utc::now();
        self.summary = Some(ExecutionSummary::derive(
            &self.subtask_results,
            self.started_at,
            finished_at,
        ));
        self.finished_at = Some(finished_at);
        self.status = ExecutionStatus::Completed;
        self
    }

    /// Overall success rate, 0.0 while in progress.
    pub fn success_rate(&self) -> f64 {
        self.summary.as_ref().map(|s| s.success_rate).unwrap_or(0.0)
    }
}
