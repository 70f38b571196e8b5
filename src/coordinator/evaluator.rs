use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use super::{Coordinator, CoordinatorCore, Stage, StageMetrics};
use crate::config::Config;
use crate::core::{Evaluation, Priority, Task};
use crate::error::Result;
use crate::worker::{PayloadKind, PoolSettings, WorkPayload};
use crate::flog;

pub const NAME: &str = "evaluator";

/// Priority band for `complexity + urgency + impact`.
pub fn assign_priority(task: &Task) -> Priority {
    Priority::from_score(task.priority_score())
}

/// Complexity clamped to the 0-10 scale.
pub fn assess_complexity(complexity: u32) -> u32 {
    complexity.min(10)
}

/// Recommended actions by raw complexity.
pub fn suggest_actions(complexity: u32) -> Vec<String> {
    let actions: &[&str] = if complexity >= 7 {
        &["allocate maximum sub-workers", "enable advanced monitoring"]
    } else if complexity >= 4 {
        &["allocate moderate sub-workers", "standard monitoring"]
    } else {
        &["minimal resource allocation"]
    };
    actions.iter().map(|a| a.to_string()).collect()
}

/// First stage: scores a task and gathers sub-worker insights on it.
pub struct Evaluator {
    core: CoordinatorCore,
    fanout: usize,
    tasks_evaluated: AtomicU64,
    reports_generated: AtomicU64,
}

impl Evaluator {
    pub fn new(pool: PoolSettings, learning_capacity: usize, fanout: usize) -> Self {
        Self {
            core: CoordinatorCore::new(NAME, pool, learning_capacity),
            fanout,
            tasks_evaluated: AtomicU64::new(0),
            reports_generated: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &Config, pool: PoolSettings) -> Self {
        Self::new(pool, config.learning_history, config.default_fanout)
    }

    /// Evaluate a task.
    ///
    /// The fan-out width follows the task's own allocation when it declares
    /// one. Sub-worker failures only show up in the insights.
    ///
    /// # Errors
    /// Fails only when the evaluator has been deactivated.
    pub async fn evaluate(&self, task: &Task) -> Result<Evaluation> {
        let _guard = self.core.begin().await?;

        let priority = assign_priority(task);
        let complexity = assess_complexity(task.complexity);
        let recommended_actions = suggest_actions(task.complexity);

        let payload = WorkPayload::new(
            PayloadKind::TaskEvaluation,
            json!({
                "task": serde_json::to_value(task).unwrap_or_default(),
                "priority": priority.as_str(),
                "complexity": complexity,
            }),
        )
        .with_reference(task.id.to_string())
        .with_allocation(task.allocated_sub_workers.unwrap_or(self.fanout));

        let insights = self.core.pool().dispatch(payload, self.core.pool().size()).await;
        self.tasks_evaluated.fetch_add(1, Ordering::SeqCst);

        flog!(
            NAME,
            "task {} ({}) priority={} complexity={} insights={}",
            task.id.short(),
            task.kind,
            priority,
            complexity,
            insights.len()
        );

        Ok(Evaluation {
            task_id: task.id,
            priority,
            complexity,
            recommended_actions,
            insights,
            created_at: Utc::now(),
        })
    }

    /// Count a generated report against this coordinator.
    pub fn record_report(&self) {
        self.reports_generated.fetch_add(1, Ordering::SeqCst);
    }

    /// Fold stored evaluations and reports into the stage counters.
    pub fn replay(&self, evaluations: u64, reports: u64) {
        self.tasks_evaluated.fetch_add(evaluations, Ordering::SeqCst);
        self.reports_generated.fetch_add(reports, Ordering::SeqCst);
    }
}

#[async_trait]
impl Coordinator for Evaluator {
    fn core(&self) -> &CoordinatorCore {
        &self.core
    }

    fn stage(&self) -> Stage {
        Stage::Evaluation
    }

    async fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::Evaluation {
            tasks_evaluated: self.tasks_evaluated.load(Ordering::SeqCst),
            reports_generated: self.reports_generated.load(Ordering::SeqCst),
        }
    }
}
