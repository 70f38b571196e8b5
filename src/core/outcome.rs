//! Sub-worker outcome records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::success::SuccessSignal;

/// Quality numbers reported alongside a sub-worker result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct OutcomeMetrics {
    pub efficiency: f64,
    pub quality: f64,
}

impl OutcomeMetrics {
    /// Metrics the stub sub-worker reports for completed work.
    pub const NOMINAL: OutcomeMetrics = OutcomeMetrics {
        efficiency: 0.85,
        quality: 0.92,
    };
}

/// What a single sub-worker produced for one delegated unit of work.
///
/// Consumed by the owning pool's aggregation step; only the sub-worker's
/// own bounded history outlives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubWorkerOutcome {
    /// Name of the sub-worker that produced this outcome.
    pub sub_worker: String,
    /// Reference id of the work (task, plan or subtask).
    pub task_id: String,
    /// Human-readable result payload.
    pub result: String,
    /// Explicit success flag.
    pub success: bool,
    /// Terminal label for abnormal outcomes, e.g. "timed_out".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Graded success, when the worker reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    #[serde(default)]
    pub metrics: OutcomeMetrics,
    pub timestamp: DateTime<Utc>,
}

impl SubWorkerOutcome {
    /// Outcome of work the sub-worker finished, successfully or not.
    pub fn finished(sub_worker: &str, task_id: &str, result: String, success: bool) -> Self {
        Self {
            sub_worker: sub_worker.to_string(),
            task_id: task_id.to_string(),
            result,
            success,
            status: None,
            success_rate: None,
            metrics: if success {
                OutcomeMetrics::NOMINAL
            } else {
                OutcomeMetrics::default()
            },
            timestamp: Utc::now(),
        }
    }

    /// Outcome standing in for a unit that never answered properly.
    pub fn failed(sub_worker: &str, task_id: &str, status: &str, reason: String) -> Self {
        Self {
            sub_worker: sub_worker.to_string(),
            task_id: task_id.to_string(),
            result: reason,
            success: false,
            status: Some(status.to_string()),
            success_rate: None,
            metrics: OutcomeMetrics::default(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_success_rate(mut self, rate: f64) -> Self {
        self.success_rate = Some(rate);
        self
    }
}

impl SuccessSignal for SubWorkerOutcome {
    fn success_flag(&self) -> Option<bool> {
        Some(self.success)
    }

    fn status_label(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn graded_rate(&self) -> Option<f64> {
        self.success_rate
    }
}
