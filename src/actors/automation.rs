//! Automation actor that periodically submits system analysis tasks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::{Task, TaskRecord};
use crate::pipeline::Pipeline;
use crate::{flog, flog_debug};

use super::ActorHandle;

/// Shortest period the actor ticks at.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Submits [`Task::automated`] to the pipeline every interval.
///
/// The first task goes out immediately. Finished records are forwarded on
/// the optional record channel. Intervals below [`MIN_INTERVAL`] are raised
/// to it.
pub struct AutomationActor {
    pipeline: Arc<Pipeline>,
    interval: Duration,
    cycles: Option<usize>,
    record_tx: Option<mpsc::UnboundedSender<TaskRecord>>,
}

impl AutomationActor {
    pub fn new(pipeline: Arc<Pipeline>, interval: Duration) -> Self {
        Self {
            pipeline,
            interval: interval.max(MIN_INTERVAL),
            cycles: None,
            record_tx: None,
        }
    }

    /// Stop after `cycles` submissions instead of running until cancelled.
    pub fn with_cycles(mut self, cycles: usize) -> Self {
        self.cycles = Some(cycles);
        self
    }

    pub fn with_records(mut self, record_tx: mpsc::UnboundedSender<TaskRecord>) -> Self {
        self.record_tx = Some(record_tx);
        self
    }

    pub fn spawn(self) -> ActorHandle {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        flog_debug!("automation", "spawn interval={:?} cycles={:?}", self.interval, self.cycles);

        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut completed = 0usize;

            loop {
                if self.cycles.is_some_and(|limit| completed >= limit) {
                    flog_debug!("automation", "cycle limit reached");
                    break;
                }

                tokio::select! {
                    _ = cancel_clone.cancelled() => {
                        flog_debug!("automation", "cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        let record = self.pipeline.submit(Task::automated(Utc::now())).await;
                        completed += 1;
                        flog!(
                            "automation",
                            "cycle {}: task {} {}",
                            completed,
                            record.id().short(),
                            record.status
                        );
                        if let Some(tx) = &self.record_tx {
                            if tx.send(record).is_err() {
                                flog_debug!("automation", "record channel closed");
                                break;
                            }
                        }
                    }
                }
            }
        });

        ActorHandle::new(cancel, join)
    }
}
