//! Evaluator output: priority, complexity and recommended actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::SubWorkerOutcome;
use super::task::TaskId;

/// Priority assigned to a task by the evaluator. Ordered low → critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Map a `complexity + urgency + impact` score onto a band.
    ///
    /// Inclusive lower bounds, checked highest first: ≥8 critical, ≥5 high,
    /// ≥3 medium, anything else low.
    pub fn from_score(score: u32) -> Self {
        if score >= 8 {
            Priority::Critical
        } else if score >= 5 {
            Priority::High
        } else if score >= 3 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The evaluator's verdict on a task. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// The evaluated task.
    pub task_id: TaskId,
    pub priority: Priority,
    /// Task complexity capped at 10.
    pub complexity: u32,
    pub recommended_actions: Vec<String>,
    /// Advisory sub-worker outcomes; they never change the fields above.
    pub insights: Vec<SubWorkerOutcome>,
    pub created_at: DateTime<Utc>,
}
