//! Evaluator → Planner → Executor chain.
//!
//! Each task runs the three stages strictly in order. Independent tasks may
//! run through the same pipeline concurrently; the coordinators are shared
//! behind `Arc`s and guard their own state.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::coordinator::{
    to_records, Coordinator, CoordinatorMetrics, CoordinatorStatus, Evaluator, Executor, Planner,
    Stage,
};
use crate::core::{Evaluation, ExecutionResult, Plan, Task, TaskId, TaskRecord};
use crate::error::{Error, Result};
use crate::report::{Report, ReportKind};
use crate::store::RecordStore;
use crate::worker::PoolSettings;
use crate::{flog, flog_error};

/// Progress notifications for a submitted task.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Submitted { task_id: TaskId },
    StageCompleted { task_id: TaskId, stage: Stage },
    Completed { task_id: TaskId, success_rate: f64 },
    Failed { task_id: TaskId, error: String },
}

pub struct Pipeline {
    evaluator: Arc<Evaluator>,
    planner: Arc<Planner>,
    executor: Arc<Executor>,
    store: Option<Arc<dyn RecordStore>>,
    events: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl Pipeline {
    pub fn new(evaluator: Arc<Evaluator>, planner: Arc<Planner>, executor: Arc<Executor>) -> Self {
        Self {
            evaluator,
            planner,
            executor,
            store: None,
            events: None,
        }
    }

    /// Build all three coordinators from configuration, each with its own pool.
    pub fn from_config(config: &Config) -> Self {
        Self::with_pool(config, PoolSettings::from_config(config))
    }

    /// Like [`from_config`](Self::from_config) but with explicit pool settings,
    /// e.g. a custom success predicate.
    pub fn with_pool(config: &Config, pool: PoolSettings) -> Self {
        Self::new(
            Arc::new(Evaluator::from_config(config, pool.clone())),
            Arc::new(Planner::from_config(config, pool.clone())),
            Arc::new(Executor::from_config(config, pool)),
        )
    }

    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn evaluator(&self) -> &Arc<Evaluator> {
        &self.evaluator
    }

    pub fn planner(&self) -> &Arc<Planner> {
        &self.planner
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn store(&self) -> Option<&Arc<dyn RecordStore>> {
        self.store.as_ref()
    }

    /// Coordinators in stage order.
    pub fn coordinators(&self) -> [&dyn Coordinator; 3] {
        [
            self.evaluator.as_ref(),
            self.planner.as_ref(),
            self.executor.as_ref(),
        ]
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    async fn stages(&self, task: &Task) -> Result<(Evaluation, Plan, ExecutionResult)> {
        let evaluation = self.evaluator.evaluate(task).await?;
        self.emit(PipelineEvent::StageCompleted {
            task_id: task.id,
            stage: Stage::Evaluation,
        });

        let plan = self.planner.plan(&evaluation).await?;
        self.emit(PipelineEvent::StageCompleted {
            task_id: task.id,
            stage: Stage::Planning,
        });

        let execution = self.executor.execute(&plan).await?;
        self.emit(PipelineEvent::StageCompleted {
            task_id: task.id,
            stage: Stage::Execution,
        });

        let records = to_records(std::slice::from_ref(&execution));
        for coordinator in self.coordinators() {
            coordinator.learn_from(records.clone()).await;
        }

        Ok((evaluation, plan, execution))
    }

    /// Run a task through all stages.
    ///
    /// # Errors
    /// Returns [`Error::TaskFailed`] wrapping the first stage error.
    pub async fn run(&self, task: &Task) -> Result<ExecutionResult> {
        self.stages(task)
            .await
            .map(|(_, _, execution)| execution)
            .map_err(|e| Error::TaskFailed {
                id: task.id.to_string(),
                error: e.to_string(),
            })
    }

    async fn persist(&self, record: &TaskRecord) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save_task(record).await {
                flog_error!(
                    "pipeline",
                    "could not persist {} task {}: {}",
                    record.status,
                    record.id().short(),
                    e
                );
            }
        }
    }

    /// Run a task and turn the outcome into a record, persisting it when a
    /// store is attached. The store sees a `submitted` record first, then the
    /// terminal one under the same id. Stage errors end up in a `failed`
    /// record.
    pub async fn submit(&self, task: Task) -> TaskRecord {
        let task_id = task.id;
        flog!("pipeline", "task {} submitted ({})", task_id.short(), task.kind);
        self.persist(&TaskRecord::submitted(task.clone())).await;
        self.emit(PipelineEvent::Submitted { task_id });

        let record = match self.stages(&task).await {
            Ok((evaluation, plan, execution)) => {
                self.emit(PipelineEvent::Completed {
                    task_id,
                    success_rate: execution.success_rate(),
                });
                TaskRecord::completed(task, evaluation, plan, execution)
            }
            Err(e) => {
                flog_error!("pipeline", "task {} failed: {}", task_id.short(), e);
                self.emit(PipelineEvent::Failed {
                    task_id,
                    error: e.to_string(),
                });
                TaskRecord::failed(task, &e.to_string())
            }
        };

        self.persist(&record).await;
        record
    }

    /// Rebuild coordinator statistics from the attached store.
    ///
    /// Finished records are replayed oldest first into the stage counters,
    /// then every coordinator learns from the stored executions as one batch.
    /// Call this once on a fresh pipeline, before submitting. Returns the
    /// number of records replayed.
    pub async fn restore(&self) -> Result<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let mut records: Vec<TaskRecord> = store
            .tasks(None)
            .await?
            .into_iter()
            .filter(|r| r.is_finished())
            .collect();
        records.reverse();
        let reports = store.reports(None).await?.len() as u64;

        let mut evaluations = 0;
        let mut executions = Vec::new();
        for record in &records {
            if record.evaluation.is_some() {
                evaluations += 1;
            }
            if let Some(plan) = &record.plan {
                self.planner.replay(plan);
            }
            if let Some(execution) = &record.execution {
                self.executor.replay(execution).await;
                executions.push(execution);
            }
        }
        self.evaluator.replay(evaluations, reports);

        if !executions.is_empty() {
            let learned = to_records(&executions);
            for coordinator in self.coordinators() {
                coordinator.learn_from(learned.clone()).await;
            }
        }

        flog!(
            "pipeline",
            "restored {} records ({} executions, {} reports)",
            records.len(),
            executions.len(),
            reports
        );
        Ok(records.len())
    }

    /// Build a report over the stored records and persist it.
    ///
    /// Without a store the report covers no tasks but still carries the
    /// coordinators' current success rates.
    pub async fn report(&self, kind: ReportKind) -> Result<Report> {
        let records = match &self.store {
            Some(store) => store.tasks(None).await?,
            None => Vec::new(),
        };

        let mut team = BTreeMap::new();
        for coordinator in self.coordinators() {
            team.insert(
                coordinator.name().to_string(),
                coordinator.core().recent_success_rate().await,
            );
        }

        let report = Report::generate(kind, Utc::now(), &records, team);
        self.evaluator.record_report();

        if let Some(store) = &self.store {
            store.save_report(&report).await?;
        }
        flog!(
            "pipeline",
            "{} report {}: {} completed, {} failed",
            kind,
            report.id.short(),
            report.tasks_completed,
            report.tasks_failed
        );
        Ok(report)
    }

    pub async fn statuses(&self) -> Vec<CoordinatorStatus> {
        let mut statuses = Vec::with_capacity(3);
        for coordinator in self.coordinators() {
            statuses.push(coordinator.status().await);
        }
        statuses
    }

    pub async fn metrics(&self) -> Vec<CoordinatorMetrics> {
        let mut metrics = Vec::with_capacity(3);
        for coordinator in self.coordinators() {
            metrics.push(coordinator.metrics().await);
        }
        metrics
    }
}
