//! Stage coordinators.
//!
//! A coordinator owns a [`WorkerPool`](crate::worker::WorkerPool), exposes one
//! stage operation (evaluate, plan or execute), and keeps rolling
//! [`LearningStatistics`] fed by [`Coordinator::learn_from`]. The shared
//! plumbing lives in [`CoordinatorCore`]; the three variants add their stage
//! logic and counters on top.
//!
//! Learning state is shared by every pipeline run that goes through the
//! coordinator, so it sits behind an async `RwLock` and is only reachable
//! through the accessor and update operations below.

mod evaluator;
mod executor;
pub mod learning;
mod planner;

pub use evaluator::{assess_complexity, assign_priority, suggest_actions, Evaluator};
pub use executor::{Executor, RetryPolicy};
pub use learning::{to_records, LearningStatistics, Record};
pub use planner::{
    allocate_resources, assess_risks, breakdown_subtasks, create_timeline, Planner,
    MITIGATION_STRATEGIES, PREREQUISITES,
};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::worker::{PoolSettings, SubWorkerStatus, WorkerPool};
use crate::flog_debug;

/// Pipeline stage a coordinator is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Evaluation,
    Planning,
    Execution,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Evaluation => write!(f, "evaluation"),
            Stage::Planning => write!(f, "planning"),
            Stage::Execution => write!(f, "execution"),
        }
    }
}

/// Display snapshot of a coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub name: String,
    pub active: bool,
    pub sub_workers_active: usize,
    pub sub_workers_total: usize,
    /// Stage operations currently in flight.
    pub pending_work: usize,
    /// Last stage operation or learning update, if any.
    pub last_activity: Option<DateTime<Utc>>,
}

/// Stage-specific counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageMetrics {
    Evaluation {
        tasks_evaluated: u64,
        reports_generated: u64,
    },
    Planning {
        plans_created: u64,
        subtasks_planned: u64,
        average_subtasks: f64,
    },
    Execution {
        executions_completed: u64,
        subtasks_executed: u64,
        retries: u64,
        average_success_rate: f64,
    },
}

/// Aggregate numbers shown for a coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorMetrics {
    pub name: String,
    pub recent_success_rate: f64,
    /// Records ever ingested by the learning loop.
    pub records_learned: u64,
    #[serde(flatten)]
    pub stage: StageMetrics,
}

/// Decrements the in-flight counter when a stage operation ends.
pub struct ActivityGuard<'a> {
    pending: &'a AtomicUsize,
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// State every coordinator variant shares.
pub struct CoordinatorCore {
    name: String,
    pool: WorkerPool,
    learning: RwLock<LearningStatistics>,
    active: AtomicBool,
    pending: AtomicUsize,
    last_activity: RwLock<Option<DateTime<Utc>>>,
}

impl CoordinatorCore {
    pub fn new(name: &str, pool: PoolSettings, learning_capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            pool: WorkerPool::new(name, pool),
            learning: RwLock::new(LearningStatistics::new(learning_capacity)),
            active: AtomicBool::new(true),
            pending: AtomicUsize::new(0),
            last_activity: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Enter a stage operation.
    ///
    /// # Errors
    /// Returns [`Error::CoordinatorInactive`] when the coordinator is switched off.
    pub async fn begin(&self) -> Result<ActivityGuard<'_>> {
        if !self.is_active() {
            return Err(Error::CoordinatorInactive {
                name: self.name.clone(),
            });
        }
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.touch().await;
        Ok(ActivityGuard {
            pending: &self.pending,
        })
    }

    async fn touch(&self) {
        *self.last_activity.write().await = Some(Utc::now());
    }

    pub async fn learn_from(&self, records: Vec<Value>) {
        let (accepted, rate) = {
            let mut learning = self.learning.write().await;
            let accepted = learning.learn(records);
            (accepted, learning.recent_success_rate())
        };
        self.touch().await;
        flog_debug!(
            "learning",
            "{} ingested {} records, recent_success_rate={:.3}",
            self.name,
            accepted,
            rate
        );
    }

    pub async fn recent_success_rate(&self) -> f64 {
        self.learning.read().await.recent_success_rate()
    }

    pub async fn records_learned(&self) -> u64 {
        self.learning.read().await.total_ingested()
    }

    /// Records currently held in the learning history.
    pub async fn history_len(&self) -> usize {
        self.learning.read().await.history_len()
    }

    pub async fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            name: self.name.clone(),
            active: self.is_active(),
            sub_workers_active: self.pool.active_count(),
            sub_workers_total: self.pool.size(),
            pending_work: self.pending.load(Ordering::SeqCst),
            last_activity: *self.last_activity.read().await,
        }
    }
}

/// Contract shared by the evaluator, planner and executor.
///
/// The status and metrics accessors are read-only.
#[async_trait]
pub trait Coordinator: Send + Sync {
    fn core(&self) -> &CoordinatorCore;

    fn stage(&self) -> Stage;

    async fn stage_metrics(&self) -> StageMetrics;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn set_active(&self, active: bool) {
        self.core().set_active(active);
    }

    /// Feed completed results into the learning statistics. Never fails.
    async fn learn_from(&self, records: Vec<Value>) {
        self.core().learn_from(records).await;
    }

    async fn status(&self) -> CoordinatorStatus {
        self.core().status().await
    }

    async fn metrics(&self) -> CoordinatorMetrics {
        CoordinatorMetrics {
            name: self.name().to_string(),
            recent_success_rate: self.core().recent_success_rate().await,
            records_learned: self.core().records_learned().await,
            stage: self.stage_metrics().await,
        }
    }

    async fn sub_workers(&self) -> Vec<SubWorkerStatus> {
        self.core().pool().statuses().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn core() -> CoordinatorCore {
        CoordinatorCore::new(
            "test",
            PoolSettings {
                size: 4,
                latency: std::time::Duration::ZERO,
                ..PoolSettings::default()
            },
            100,
        )
    }

    #[tokio::test]
    async fn test_begin_tracks_pending_work() {
        let core = core();
        {
            let _a = core.begin().await.unwrap();
            let _b = core.begin().await.unwrap();
            assert_eq!(core.status().await.pending_work, 2);
        }
        let status = core.status().await;
        assert_eq!(status.pending_work, 0);
        assert!(status.last_activity.is_some());
    }

    #[tokio::test]
    async fn test_inactive_core_rejects_work() {
        let core = core();
        core.set_active(false);
        let err = core.begin().await.err().unwrap();
        assert!(matches!(err, Error::CoordinatorInactive { .. }));
        assert!(!core.status().await.active);
    }

    #[tokio::test]
    async fn test_status_is_idempotent() {
        let core = core();
        core.learn_from(vec![json!({"success": true})]).await;
        assert_eq!(core.status().await, core.status().await);
    }

    #[tokio::test]
    async fn test_concurrent_learning_loses_no_records() {
        let core = Arc::new(core());
        let mut handles = Vec::new();
        for _ in 0..20 {
            let core = Arc::clone(&core);
            handles.push(tokio::spawn(async move {
                core.learn_from(vec![json!({"status": "completed"}), json!({"success": true})])
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(core.records_learned().await, 40);
        assert_eq!(core.history_len().await, 40);
        assert_eq!(core.recent_success_rate().await, 1.0);
    }

    #[test]
    fn test_stage_metrics_are_tagged() {
        let metrics = CoordinatorMetrics {
            name: "evaluator".into(),
            recent_success_rate: 1.0,
            records_learned: 2,
            stage: StageMetrics::Evaluation {
                tasks_evaluated: 2,
                reports_generated: 0,
            },
        };
        let value = serde_json::to_value(&metrics).unwrap();
        assert_eq!(value["stage"], "evaluation");
        assert_eq!(value["tasks_evaluated"], 2);
    }
}
