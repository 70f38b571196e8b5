//! Daily and weekly performance reports built from stored task records.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{RecordStatus, ReportId, TaskRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Daily,
    Weekly,
}

impl ReportKind {
    /// Length of the window the report covers.
    pub fn period(&self) -> Duration {
        match self {
            ReportKind::Daily => Duration::days(1),
            ReportKind::Weekly => Duration::days(7),
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportKind::Daily => write!(f, "daily"),
            ReportKind::Weekly => write!(f, "weekly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub kind: ReportKind,
    pub generated_at: DateTime<Utc>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    /// Recent success rate per coordinator name.
    pub team_performance: BTreeMap<String, f64>,
    pub tasks_completed: usize,
    pub tasks_failed: usize,
    /// Mean execution success rate of the completed tasks in the period.
    pub average_success_rate: f64,
}

impl Report {
    /// Summarize the records that finished within the `kind` window ending at `now`.
    pub fn generate(
        kind: ReportKind,
        now: DateTime<Utc>,
        records: &[TaskRecord],
        team_performance: BTreeMap<String, f64>,
    ) -> Self {
        let period_start = now - kind.period();
        let in_period = records.iter().filter(|r| {
            r.completed_at
                .map(|at| at >= period_start && at <= now)
                .unwrap_or(false)
        });

        let mut tasks_completed = 0;
        let mut tasks_failed = 0;
        let mut rate_sum = 0.0;
        for record in in_period {
            match record.status {
                RecordStatus::Completed => {
                    tasks_completed += 1;
                    rate_sum += record
                        .execution
                        .as_ref()
                        .map(|e| e.success_rate())
                        .unwrap_or(0.0);
                }
                RecordStatus::Failed => tasks_failed += 1,
                RecordStatus::Submitted => {}
            }
        }

        let average_success_rate = if tasks_completed == 0 {
            0.0
        } else {
            rate_sum / tasks_completed as f64
        };

        Self {
            id: ReportId::new(),
            kind,
            generated_at: now,
            period_start,
            period_end: now,
            team_performance,
            tasks_completed,
            tasks_failed,
            average_success_rate,
        }
    }
}
