use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use super::{Coordinator, CoordinatorCore, Stage, StageMetrics};
use crate::config::Config;
use crate::core::{
    Evaluation, Milestone, Plan, PlanId, Priority, ResourceAllocation, RiskAssessment, RiskLevel,
    Subtask, SubtaskGraph, Timeline,
};
use crate::error::Result;
use crate::worker::{PayloadKind, PoolSettings, WorkPayload};
use crate::flog;

pub const NAME: &str = "planner";

/// Checks every plan lists before execution may start.
pub const PREREQUISITES: [&str; 3] = ["data_availability", "resource_allocation", "approval_process"];

const MAX_SUBTASKS: u32 = 10;
const MINUTES_PER_COMPLEXITY: f64 = 30.0;

pub fn allocate_resources(complexity: u32, priority: Priority) -> ResourceAllocation {
    let c = f64::from(complexity);
    ResourceAllocation {
        sub_workers: complexity.saturating_mul(2).clamp(2, 10) as usize,
        compute_budget: c * 0.1,
        time_budget_hours: c * 0.5,
        priority_level: priority,
    }
}

/// Planning, execution and review phases; deadline is `now + 2c` hours.
pub fn create_timeline(complexity: u32, now: DateTime<Utc>) -> Timeline {
    let c = f64::from(complexity);
    let deadline = now
        .checked_add_signed(Duration::hours(i64::from(complexity) * 2))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    Timeline {
        estimate_hours: c * 2.0,
        milestones: vec![
            Milestone {
                phase: "planning".to_string(),
                duration_hours: 0.5,
            },
            Milestone {
                phase: "execution".to_string(),
                duration_hours: c * 1.5,
            },
            Milestone {
                phase: "review".to_string(),
                duration_hours: 0.5,
            },
        ],
        deadline,
    }
}

/// Split the work into `clamp(c, 1, 10)` sequential subtasks.
///
/// Subtask `i` depends on every subtask before it and the estimates add up
/// to `30 * c` minutes.
pub fn breakdown_subtasks(task_ref: &str, complexity: u32) -> Vec<Subtask> {
    let count = complexity.clamp(1, MAX_SUBTASKS) as usize;
    let minutes = MINUTES_PER_COMPLEXITY * f64::from(complexity) / count as f64;

    (0..count)
        .map(|i| Subtask {
            index: i,
            description: format!("Subtask {} for {}", i + 1, task_ref),
            estimated_minutes: minutes,
            required_capabilities: vec!["execution".to_string()],
            dependencies: (0..i).collect(),
        })
        .collect()
}

/// Mitigations attached to every plan.
pub const MITIGATION_STRATEGIES: &[&str] = &[
    "Allocate backup resources",
    "Implement progress monitoring",
    "Prepare contingency plans",
];

/// Risk band by complexity; every band carries the full mitigation set.
pub fn assess_risks(complexity: u32) -> RiskAssessment {
    RiskAssessment {
        level: RiskLevel::from_complexity(complexity),
        mitigation_strategies: MITIGATION_STRATEGIES.iter().map(|m| m.to_string()).collect(),
    }
}

/// Second stage: turns an evaluation into an executable plan.
pub struct Planner {
    core: CoordinatorCore,
    fanout: usize,
    plans_created: AtomicU64,
    subtasks_planned: AtomicU64,
}

impl Planner {
    pub fn new(pool: PoolSettings, learning_capacity: usize, fanout: usize) -> Self {
        Self {
            core: CoordinatorCore::new(NAME, pool, learning_capacity),
            fanout,
            plans_created: AtomicU64::new(0),
            subtasks_planned: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &Config, pool: PoolSettings) -> Self {
        Self::new(pool, config.learning_history, config.default_fanout)
    }

    /// Build a plan for an evaluated task.
    ///
    /// # Errors
    /// Fails when the planner is inactive or the subtask graph is not a
    /// forward-only DAG.
    pub async fn plan(&self, evaluation: &Evaluation) -> Result<Plan> {
        let _guard = self.core.begin().await?;

        let now = Utc::now();
        let complexity = evaluation.complexity;
        let subtasks = breakdown_subtasks(&evaluation.task_id.to_string(), complexity);
        let graph = SubtaskGraph::from_subtasks(&subtasks)?;

        let payload = WorkPayload::new(
            PayloadKind::PlanningAssistance,
            json!({
                "task_id": evaluation.task_id,
                "priority": evaluation.priority.as_str(),
                "complexity": complexity,
                "subtasks": subtasks.len(),
            }),
        )
        .with_reference(evaluation.task_id.to_string())
        .with_allocation(self.fanout);
        let contributions = self.core.pool().dispatch(payload, self.core.pool().size()).await;

        let plan = Plan {
            id: PlanId::new(),
            task_id: evaluation.task_id,
            priority: evaluation.priority,
            resources: allocate_resources(complexity, evaluation.priority),
            timeline: create_timeline(complexity, now),
            subtasks,
            prerequisites: PREREQUISITES.iter().map(|p| p.to_string()).collect(),
            risk: assess_risks(complexity),
            contributions,
            created_at: now,
        };

        self.plans_created.fetch_add(1, Ordering::SeqCst);
        self.subtasks_planned
            .fetch_add(plan.subtasks.len() as u64, Ordering::SeqCst);

        flog!(
            NAME,
            "plan {} for task {}: {} subtasks, {} dependencies, risk={:?}",
            plan.id.short(),
            plan.task_id.short(),
            graph.len(),
            graph.dependency_count(),
            plan.risk.level
        );

        Ok(plan)
    }

    /// Fold a stored plan into the stage counters.
    pub fn replay(&self, plan: &Plan) {
        self.plans_created.fetch_add(1, Ordering::SeqCst);
        self.subtasks_planned
            .fetch_add(plan.subtasks.len() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl Coordinator for Planner {
    fn core(&self) -> &CoordinatorCore {
        &self.core
    }

    fn stage(&self) -> Stage {
        Stage::Planning
    }

    async fn stage_metrics(&self) -> StageMetrics {
        let plans_created = self.plans_created.load(Ordering::SeqCst);
        let subtasks_planned = self.subtasks_planned.load(Ordering::SeqCst);
        let average_subtasks = if plans_created == 0 {
            0.0
        } else {
            subtasks_planned as f64 / plans_created as f64
        };
        StageMetrics::Planning {
            plans_created,
            subtasks_planned,
            average_subtasks,
        }
    }
}
