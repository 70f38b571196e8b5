//! Core domain models for the fleet pipeline.
//!
//! Task → Evaluation → Plan → ExecutionResult form a forward-only chain of
//! value objects connected by identifiers. Each is created by exactly one
//! stage and never edited by a later one.

pub mod dag;
pub mod evaluation;
pub mod execution;
pub mod id;
pub mod outcome;
pub mod plan;
pub mod record;
pub mod success;
pub mod task;

pub use dag::SubtaskGraph;
pub use evaluation::{Evaluation, Priority};
pub use execution::{ExecutionResult, ExecutionStatus, ExecutionSummary, SubtaskResult};
pub use id::{ExecutionId, PlanId, ReportId, TaskId};
pub use outcome::{OutcomeMetrics, SubWorkerOutcome};
pub use plan::{Milestone, Plan, ResourceAllocation, RiskAssessment, RiskLevel, Subtask, Timeline};
pub use record::{RecordStatus, TaskRecord};
pub use success::{success_rate, SuccessSignal};
pub use task::Task;
