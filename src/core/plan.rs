//! Planner output: resources, timeline, subtask breakdown and risk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use super::id::PlanId;
use super::evaluation::Priority;
use super::outcome::SubWorkerOutcome;
use super::task::TaskId;

/// Resources the planner sets aside for a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    pub sub_workers: usize,
    pub compute_budget: f64,
    pub time_budget_hours: f64,
    pub priority_level: Priority,
}

/// One phase of the plan timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub phase: String,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub estimate_hours: f64,
    pub milestones: Vec<Milestone>,
    pub deadline: DateTime<Utc>,
}

/// One step of the breakdown.
///
/// `dependencies` only ever name strictly-earlier indices, so the subtask
/// graph is acyclic by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    /// Zero-based position in the plan.
    pub index: usize,
    pub description: String,
    pub estimated_minutes: f64,
    pub required_capabilities: Vec<String>,
    pub dependencies: Vec<usize>,
}

/// Risk band of a plan. Exactly one band applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// ≥8 high, 5..8 medium, otherwise low.
    pub fn from_complexity(complexity: u32) -> Self {
        match complexity {
            c if c >= 8 => RiskLevel::High,
            c if c >= 5 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub mitigation_strategies: Vec<String>,
}

impl RiskAssessment {
    pub fn high_risk(&self) -> bool {
        self.level == RiskLevel::High
    }

    pub fn medium_risk(&self) -> bool {
        self.level == RiskLevel::Medium
    }

    pub fn low_risk(&self) -> bool {
        self.level == RiskLevel::Low
    }
}

/// A plan derived from one evaluation.
///
/// Immutable once the planner returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    /// Task the originating evaluation was about.
    pub task_id: TaskId,
    pub priority: Priority,
    pub resources: ResourceAllocation,
    pub timeline: Timeline,
    pub subtasks: Vec<Subtask>,
    /// External conditions the plan assumes.
    pub prerequisites: Vec<String>,
    pub risk: RiskAssessment,
    pub contributions: Vec<SubWorkerOutcome>,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn total_estimated_minutes(&self) -> f64 {
        self.subtasks.iter().map(|s| s.estimated_minutes).sum()
    }
}
