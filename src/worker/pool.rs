//! Worker pool for fan-out/fan-in dispatch.
//!
//! The `WorkerPool` owns a fixed set of identical sub-workers. A dispatch
//! picks a width, hands every selected unit the same payload, runs them
//! concurrently and joins all of them before returning.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use uuid::Uuid;

use super::sub_worker::{AlwaysSucceed, SubWorker, SubWorkerStatus, SuccessPredicate};
use super::WorkPayload;
use crate::config::Config;
use crate::core::SubWorkerOutcome;
use crate::error::Error;
use crate::util::maybe_timeout;
use crate::{flog_debug, flog_warn};

/// Fan-out used when a payload declares no allocation of its own.
pub const DEFAULT_ALLOCATION: usize = 3;

/// How a pool builds and bounds its sub-workers.
#[derive(Clone)]
pub struct PoolSettings {
    pub size: usize,
    pub latency: Duration,
    /// Per-unit wait bound; `None` waits for every unit.
    pub timeout: Option<Duration>,
    pub history_capacity: usize,
    pub predicate: Arc<dyn SuccessPredicate>,
}

impl PoolSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            size: config.pool_size,
            latency: config.worker_latency(),
            timeout: config.dispatch_timeout(),
            history_capacity: config.worker_history,
            predicate: Arc::new(AlwaysSucceed),
        }
    }

    pub fn with_predicate(mut self, predicate: Arc<dyn SuccessPredicate>) -> Self {
        self.predicate = predicate;
        self
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// A fixed-size collection of identical sub-workers owned by one coordinator.
///
/// # Example
///
/// ```ignore
/// use fleet::worker::{PayloadKind, PoolSettings, WorkPayload, WorkerPool};
///
/// let pool = WorkerPool::new("planner", PoolSettings::default());
/// let payload = WorkPayload::new(PayloadKind::PlanningAssistance, serde_json::json!({}));
/// let outcomes = pool.dispatch(payload, pool.size()).await;
/// assert_eq!(outcomes.len(), 3);
/// ```
pub struct WorkerPool {
    owner: String,
    workers: Vec<Arc<SubWorker>>,
    timeout: Option<Duration>,
}

impl WorkerPool {
    /// Build `settings.size` sub-workers named `{owner}_sub_{i}`.
    pub fn new(owner: &str, settings: PoolSettings) -> Self {
        let workers = (0..settings.size)
            .map(|i| {
                Arc::new(SubWorker::new(
                    format!("{}_sub_{}", owner, i),
                    settings.latency,
                    settings.history_capacity,
                    Arc::clone(&settings.predicate),
                ))
            })
            .collect();

        Self {
            owner: owner.to_string(),
            workers,
            timeout: settings.timeout,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Number of sub-workers in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn workers(&self) -> &[Arc<SubWorker>] {
        &self.workers
    }

    /// Get the number of active sub-workers.
    pub fn active_count(&self) -> usize {
        self.workers.iter().filter(|w| w.is_active()).count()
    }

    /// Fan-out width for a dispatch.
    ///
    /// `min(pool size, requested, payload allocation or 3)`. Requested units
    /// beyond the pool size are dropped, not queued.
    pub fn width(&self, payload: &WorkPayload, requested: usize) -> usize {
        let allocation = payload.allocation.unwrap_or(DEFAULT_ALLOCATION);
        self.size().min(requested).min(allocation)
    }

    /// Dispatch `payload` to `width(payload, requested)` sub-workers and join
    /// their outcomes in sub-worker order.
    ///
    /// Never fails: a unit that times out or whose task aborts is reported as
    /// a failed outcome, so the result always has exactly `width` entries.
    pub async fn dispatch(&self, payload: WorkPayload, requested: usize) -> Vec<SubWorkerOutcome> {
        let width = self.width(&payload, requested);
        if width < requested {
            flog_debug!(
                "pool",
                "{}: requested {} units, dispatching {}",
                self.owner,
                requested,
                width
            );
        }
        if width == 0 {
            return Vec::new();
        }

        // Failed stand-ins need a reference even when the payload has none.
        let reference = payload
            .reference
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let payload = Arc::new(payload);

        let units: Vec<_> = self.workers[..width]
            .iter()
            .map(|worker| {
                let worker = Arc::clone(worker);
                let payload = Arc::clone(&payload);
                let timeout = self.timeout;
                tokio::spawn(async move { maybe_timeout(timeout, worker.execute(&payload)).await })
            })
            .collect();

        let joined = join_all(units).await;

        joined
            .into_iter()
            .zip(&self.workers[..width])
            .map(|(joined, worker)| match joined {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(Error::Timeout(after))) => {
                    flog_warn!("pool", "{} timed out after {:?}", worker.name(), after);
                    SubWorkerOutcome::failed(
                        worker.name(),
                        &reference,
                        "timed_out",
                        format!("No response within {:?}", after),
                    )
                }
                Ok(Err(e)) => SubWorkerOutcome::failed(
                    worker.name(),
                    &reference,
                    "aborted",
                    e.to_string(),
                ),
                Err(join_err) => {
                    flog_warn!("pool", "{} aborted: {}", worker.name(), join_err);
                    SubWorkerOutcome::failed(
                        worker.name(),
                        &reference,
                        "aborted",
                        join_err.to_string(),
                    )
                }
            })
            .collect()
    }

    pub async fn statuses(&self) -> Vec<SubWorkerStatus> {
        let mut statuses = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            statuses.push(worker.status().await);
        }
        statuses
    }
}
