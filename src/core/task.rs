//! Task data model.
//!
//! A task is the unit of work a caller submits to the pipeline. It is
//! immutable once submitted; later stages reference it by id only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use super::id::TaskId;

/// Value used for a numeric attribute the caller left out.
pub const DEFAULT_ATTRIBUTE: u32 = 1;

/// Kind given to tasks produced by the automation cycle.
pub const AUTOMATED_KIND: &str = "automated_analysis";

fn default_attribute() -> u32 {
    DEFAULT_ATTRIBUTE
}

/// A unit of work submitted by a caller.
///
/// Missing numeric attributes deserialize to [`DEFAULT_ATTRIBUTE`] instead
/// of failing, so loosely-formed input still reaches the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for this task.
    #[serde(default)]
    pub id: TaskId,
    /// Free-form category, e.g. "analysis".
    #[serde(rename = "type", default)]
    pub kind: String,
    /// What the task should accomplish.
    #[serde(default)]
    pub description: String,
    /// Nominally 1..=10.
    #[serde(default = "default_attribute")]
    pub complexity: u32,
    /// Nominally 1..=10.
    #[serde(default = "default_attribute")]
    pub urgency: u32,
    /// Nominally 1..=10.
    #[serde(default = "default_attribute")]
    pub impact: u32,
    /// Sub-workers the caller asks for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocated_sub_workers: Option<usize>,
    /// When the task was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a task with all numeric attributes at their default.
    pub fn new(kind: &str, description: &str) -> Self {
        Self {
            id: TaskId::new(),
            kind: kind.to_string(),
            description: description.to_string(),
            complexity: DEFAULT_ATTRIBUTE,
            urgency: DEFAULT_ATTRIBUTE,
            impact: DEFAULT_ATTRIBUTE,
            allocated_sub_workers: None,
            created_at: Utc::now(),
        }
    }

    /// The task the automation cycle submits on every tick.
    pub fn automated(now: DateTime<Utc>) -> Self {
        let description = format!(
            "Automated system analysis - {}",
            now.format("%Y-%m-%d %H:%M")
        );
        let mut task = Self::new(AUTOMATED_KIND, &description)
            .with_complexity(3)
            .with_urgency(2)
            .with_impact(4);
        task.created_at = now;
        task
    }

    pub fn with_complexity(mut self, complexity: u32) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_urgency(mut self, urgency: u32) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_impact(mut self, impact: u32) -> Self {
        self.impact = impact;
        self
    }

    pub fn with_allocation(mut self, sub_workers: usize) -> Self {
        self.allocated_sub_workers = Some(sub_workers);
        self
    }

    /// complexity + urgency + impact
    pub fn priority_score(&self) -> u32 {
        self.complexity
            .saturating_add(self.urgency)
            .saturating_add(self.impact)
    }
}
