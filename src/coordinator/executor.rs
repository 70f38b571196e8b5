use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::Mutex;

use super::{Coordinator, CoordinatorCore, Stage, StageMetrics};
use crate::config::Config;
use crate::core::{success_rate, ExecutionResult, Plan, Subtask, SubtaskGraph, SubtaskResult};
use crate::core::execution::SUCCESSFUL_SUBTASK_THRESHOLD;
use crate::error::Result;
use crate::util::backoff_delay;
use crate::worker::{PayloadKind, PoolSettings, WorkPayload};
use crate::{flog, flog_debug};

pub const NAME: &str = "executor";

/// Re-dispatch policy for subtasks that miss the success threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first; 0 disables retries.
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        backoff: Duration::ZERO,
    };

    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: config.retry_backoff(),
        }
    }
}

#[derive(Debug, Default)]
struct ExecutionTally {
    completed: u64,
    success_rate_sum: f64,
}

/// Third stage: runs a plan's subtasks in order and records the results.
pub struct Executor {
    core: CoordinatorCore,
    fanout: usize,
    retry: RetryPolicy,
    tally: Mutex<ExecutionTally>,
    subtasks_executed: AtomicU64,
    retries: AtomicU64,
}

impl Executor {
    pub fn new(
        pool: PoolSettings,
        learning_capacity: usize,
        fanout: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            core: CoordinatorCore::new(NAME, pool, learning_capacity),
            fanout,
            retry,
            tally: Mutex::new(ExecutionTally::default()),
            subtasks_executed: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &Config, pool: PoolSettings) -> Self {
        Self::new(
            pool,
            config.learning_history,
            config.default_fanout,
            RetryPolicy::from_config(config),
        )
    }

    /// Execute every subtask of `plan` in dependency order and return the
    /// completed result.
    ///
    /// Subtasks run one after another, each only once everything it depends
    /// on has run. A subtask whose units all fail still yields a result, with
    /// rate 0.
    ///
    /// # Errors
    /// Fails when the executor has been deactivated or the plan's subtasks
    /// do not form a forward-only DAG.
    pub async fn execute(&self, plan: &Plan) -> Result<ExecutionResult> {
        let _guard = self.core.begin().await?;
        let graph = SubtaskGraph::from_subtasks(&plan.subtasks)?;

        let mut execution = ExecutionResult::start(plan.id);
        for index in graph.execution_order() {
            let Some(subtask) = plan.subtasks.get(index) else {
                continue;
            };
            let result = self.execute_subtask(plan, subtask).await;
            execution.record(result);
        }
        let execution = execution.complete();
        self.tally_execution(&execution).await;

        if let Some(summary) = &execution.summary {
            flog!(
                NAME,
                "execution {} of plan {}: {}/{} subtasks successful in {:.2}s",
                execution.id.short(),
                plan.id.short(),
                summary.successful_subtasks,
                summary.total_subtasks,
                summary.duration_seconds
            );
        }

        Ok(execution)
    }

    async fn tally_execution(&self, execution: &ExecutionResult) {
        let mut tally = self.tally.lock().await;
        tally.completed += 1;
        tally.success_rate_sum += execution.success_rate();
    }

    /// Fold a stored execution into the stage counters.
    pub async fn replay(&self, execution: &ExecutionResult) {
        let attempts: u64 = execution
            .subtask_results
            .iter()
            .map(|r| u64::from(r.attempts))
            .sum();
        let retries: u64 = execution
            .subtask_results
            .iter()
            .map(|r| u64::from(r.attempts.saturating_sub(1)))
            .sum();
        self.subtasks_executed.fetch_add(attempts, Ordering::SeqCst);
        self.retries.fetch_add(retries, Ordering::SeqCst);
        self.tally_execution(execution).await;
    }

    async fn execute_subtask(&self, plan: &Plan, subtask: &Subtask) -> SubtaskResult {
        let pool = self.core.pool();
        let mut attempts = 0;

        loop {
            let payload = WorkPayload::new(
                PayloadKind::SubtaskExecution,
                json!({
                    "plan_id": plan.id,
                    "subtask": serde_json::to_value(subtask).unwrap_or_default(),
                }),
            )
            .with_reference(format!("{}/{}", plan.id, subtask.index))
            .with_allocation(self.fanout)
            .with_requirements(subtask.required_capabilities.clone());

            let outcomes = pool.dispatch(payload, pool.size()).await;
            attempts += 1;
            self.subtasks_executed.fetch_add(1, Ordering::SeqCst);

            let rate = success_rate(&outcomes);
            let retries_used = attempts - 1;
            if rate > SUCCESSFUL_SUBTASK_THRESHOLD || retries_used >= self.retry.max_retries {
                return SubtaskResult {
                    subtask_index: subtask.index,
                    outcomes,
                    success_rate: rate,
                    attempts,
                    completed_at: Utc::now(),
                };
            }

            let delay = backoff_delay(self.retry.backoff, retries_used);
            flog_debug!(
                NAME,
                "subtask {} of plan {} at {:.2}, retrying in {:?}",
                subtask.index,
                plan.id.short(),
                rate,
                delay
            );
            self.retries.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Coordinator for Executor {
    fn core(&self) -> &CoordinatorCore {
        &self.core
    }

    fn stage(&self) -> Stage {
        Stage::Execution
    }

    async fn stage_metrics(&self) -> StageMetrics {
        let tally = self.tally.lock().await;
        let average_success_rate = if tally.completed == 0 {
            0.0
        } else {
            tally.success_rate_sum / tally.completed as f64
        };
        StageMetrics::Execution {
            executions_completed: tally.completed,
            subtasks_executed: self.subtasks_executed.load(Ordering::SeqCst),
            retries: self.retries.load(Ordering::SeqCst),
            average_success_rate,
        }
    }
}
