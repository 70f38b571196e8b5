//! Sub-workers and the pools that fan work out to them.
//!
//! Each coordinator owns one [`WorkerPool`]. A dispatch hands the same
//! [`WorkPayload`] to several identical [`SubWorker`]s concurrently and joins
//! their [`SubWorkerOutcome`](crate::core::SubWorkerOutcome)s.

mod pool;
mod sub_worker;

pub use pool::{PoolSettings, WorkerPool, DEFAULT_ALLOCATION};
pub use sub_worker::{
    AlwaysSucceed, HistoryEntry, SubWorker, SubWorkerStatus, SuccessPredicate,
};

use serde::{Deserialize, Serialize};

/// What a coordinator is asking its sub-workers to help with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    TaskEvaluation,
    PlanningAssistance,
    SubtaskExecution,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::TaskEvaluation => "task_evaluation",
            PayloadKind::PlanningAssistance => "planning_assistance",
            PayloadKind::SubtaskExecution => "subtask_execution",
        }
    }
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of work every dispatched sub-worker receives an identical copy of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPayload {
    pub kind: PayloadKind,
    /// Id reported back in each outcome's `task_id`; a fresh UUID when absent.
    pub reference: Option<String>,
    /// Fan-out the payload itself declares; [`DEFAULT_ALLOCATION`] when absent.
    pub allocation: Option<usize>,
    /// Capability tags the work requires.
    pub requirements: Vec<String>,
    /// Stage-specific context (task, evaluation, subtask...).
    pub body: serde_json::Value,
}

impl WorkPayload {
    pub fn new(kind: PayloadKind, body: serde_json::Value) -> Self {
        Self {
            kind,
            reference: None,
            allocation: None,
            requirements: Vec::new(),
            body,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_allocation(mut self, allocation: usize) -> Self {
        self.allocation = Some(allocation);
        self
    }

    pub fn with_requirements(mut self, requirements: Vec<String>) -> Self {
        self.requirements = requirements;
        self
    }
}
