use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{PayloadKind, WorkPayload};
use crate::core::SubWorkerOutcome;
use crate::flog_trace;

/// Decides whether a sub-worker's attempt at a payload succeeds.
///
/// The stub deployment uses [`AlwaysSucceed`]; real deployments plug in
/// their own check without touching the pool's aggregation.
pub trait SuccessPredicate: Send + Sync {
    fn succeeds(&self, worker: &str, payload: &WorkPayload) -> bool;
}

impl dyn SuccessPredicate {
    /// Wrap a closure as a shareable predicate.
    pub fn from_fn<F>(f: F) -> Arc<dyn SuccessPredicate>
    where
        F: Fn(&str, &WorkPayload) -> bool + Send + Sync + 'static,
    {
        Arc::new(FnPredicate(f))
    }
}

struct FnPredicate<F>(F);

impl<F> SuccessPredicate for FnPredicate<F>
where
    F: Fn(&str, &WorkPayload) -> bool + Send + Sync,
{
    fn succeeds(&self, worker: &str, payload: &WorkPayload) -> bool {
        (self.0)(worker, payload)
    }
}

/// Every attempt succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSucceed;

impl SuccessPredicate for AlwaysSucceed {
    fn succeeds(&self, _worker: &str, _payload: &WorkPayload) -> bool {
        true
    }
}

/// One remembered invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: PayloadKind,
    pub reference: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// Display snapshot of a sub-worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubWorkerStatus {
    pub name: String,
    pub active: bool,
    pub invocations: usize,
}

/// Leaf execution unit.
///
/// Holds no state besides its active flag and a bounded history of the
/// invocations it served.
pub struct SubWorker {
    name: String,
    active: AtomicBool,
    latency: Duration,
    predicate: Arc<dyn SuccessPredicate>,
    history: Mutex<VecDeque<HistoryEntry>>,
    history_capacity: usize,
}

impl SubWorker {
    pub fn new(
        name: String,
        latency: Duration,
        history_capacity: usize,
        predicate: Arc<dyn SuccessPredicate>,
    ) -> Self {
        Self {
            name,
            active: AtomicBool::new(true),
            latency,
            predicate,
            history: Mutex::new(VecDeque::new()),
            history_capacity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Perform one unit of work.
    ///
    /// Never fails the caller: an inactive worker or a rejected attempt is
    /// reported as an unsuccessful outcome.
    pub async fn execute(&self, payload: &WorkPayload) -> SubWorkerOutcome {
        let reference = payload
            .reference
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if !self.is_active() {
            return SubWorkerOutcome::failed(
                &self.name,
                &reference,
                "inactive",
                format!("{} is inactive", self.name),
            );
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let success = self.predicate.succeeds(&self.name, payload);
        flog_trace!(
            "worker",
            "{} executed {} ref={} success={}",
            self.name,
            payload.kind,
            reference,
            success
        );
        self.remember(HistoryEntry {
            kind: payload.kind,
            reference: reference.clone(),
            success,
            timestamp: Utc::now(),
        })
        .await;

        let verb = if success { "Completed" } else { "Failed" };
        SubWorkerOutcome::finished(
            &self.name,
            &reference,
            format!("{} {} task", verb, payload.kind),
            success,
        )
    }

    async fn remember(&self, entry: HistoryEntry) {
        if self.history_capacity == 0 {
            return;
        }
        let mut history = self.history.lock().await;
        while history.len() >= self.history_capacity {
            history.pop_front();
        }
        history.push_back(entry);
    }

    /// Snapshot of the remembered invocations, oldest first.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().await.iter().cloned().collect()
    }

    pub async fn status(&self) -> SubWorkerStatus {
        SubWorkerStatus {
            name: self.name.clone(),
            active: self.is_active(),
            invocations: self.history.lock().await.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SuccessSignal;
    use serde_json::json;

    fn worker(capacity: usize, predicate: Arc<dyn SuccessPredicate>) -> SubWorker {
        SubWorker::new("test_sub_0".into(), Duration::ZERO, capacity, predicate)
    }

    fn payload() -> WorkPayload {
        WorkPayload::new(PayloadKind::TaskEvaluation, json!({})).with_reference("task-1")
    }

    #[tokio::test]
    async fn test_execute_reports_success() {
        let worker = worker(10, Arc::new(AlwaysSucceed));
        let outcome = worker.execute(&payload()).await;
        assert!(outcome.is_successful());
        assert_eq!(outcome.sub_worker, "test_sub_0");
        assert_eq!(outcome.task_id, "task-1");
        assert_eq!(outcome.result, "Completed task_evaluation task");
    }

    #[tokio::test]
    async fn test_missing_reference_gets_fresh_uuid() {
        let worker = worker(10, Arc::new(AlwaysSucceed));
        let outcome = worker
            .execute(&WorkPayload::new(PayloadKind::SubtaskExecution, json!(null)))
            .await;
        assert!(Uuid::parse_str(&outcome.task_id).is_ok());
    }

    #[tokio::test]
    async fn test_pluggable_predicate() {
        let reject = <dyn SuccessPredicate>::from_fn(|_, p| p.kind != PayloadKind::TaskEvaluation);
        let worker = worker(10, reject);
        let outcome = worker.execute(&payload()).await;
        assert!(!outcome.is_successful());
        assert_eq!(outcome.result, "Failed task_evaluation task");
    }

    #[tokio::test]
    async fn test_inactive_worker_fails_without_history() {
        let worker = worker(10, Arc::new(AlwaysSucceed));
        worker.set_active(false);
        let outcome = worker.execute(&payload()).await;
        assert!(!outcome.is_successful());
        assert_eq!(outcome.status.as_deref(), Some("inactive"));
        assert!(worker.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let worker = worker(3, Arc::new(AlwaysSucceed));
        for i in 0..5 {
            let p = payload().with_reference(format!("ref-{}", i));
            worker.execute(&p).await;
        }
        let history = worker.history().await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].reference, "ref-2");
        assert_eq!(history[2].reference, "ref-4");
        assert_eq!(worker.status().await.invocations, 3);
    }
}
