//! Persistence sink for task records and reports.
//!
//! Records are keyed by id; saving the same id twice keeps the last write.
//! Listings come back newest first.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::{ReportId, TaskId, TaskRecord};
use crate::error::Result;
use crate::report::Report;
use crate::util::blocking;
use crate::{flog_debug, flog_warn};

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn save_task(&self, record: &TaskRecord) -> Result<()>;

    /// Stored task records, newest first, at most `limit` when given.
    async fn tasks(&self, limit: Option<usize>) -> Result<Vec<TaskRecord>>;

    async fn save_report(&self, report: &Report) -> Result<()>;

    /// Stored reports, newest first, at most `limit` when given.
    async fn reports(&self, limit: Option<usize>) -> Result<Vec<Report>>;
}

fn sort_tasks(records: &mut Vec<TaskRecord>, limit: Option<usize>) {
    records.sort_by(|a, b| {
        let key = |r: &TaskRecord| r.completed_at.unwrap_or(r.task.created_at);
        key(b).cmp(&key(a))
    });
    if let Some(limit) = limit {
        records.truncate(limit);
    }
}

fn sort_reports(reports: &mut Vec<Report>, limit: Option<usize>) {
    reports.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
    if let Some(limit) = limit {
        reports.truncate(limit);
    }
}

/// In-process store, used by tests and when no store directory is wanted.
#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<TaskId, TaskRecord>>,
    reports: RwLock<HashMap<ReportId, Report>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn save_task(&self, record: &TaskRecord) -> Result<()> {
        self.tasks.write().await.insert(record.id(), record.clone());
        Ok(())
    }

    async fn tasks(&self, limit: Option<usize>) -> Result<Vec<TaskRecord>> {
        let mut records: Vec<_> = self.tasks.read().await.values().cloned().collect();
        sort_tasks(&mut records, limit);
        Ok(records)
    }

    async fn save_report(&self, report: &Report) -> Result<()> {
        self.reports.write().await.insert(report.id, report.clone());
        Ok(())
    }

    async fn reports(&self, limit: Option<usize>) -> Result<Vec<Report>> {
        let mut reports: Vec<_> = self.reports.read().await.values().cloned().collect();
        sort_reports(&mut reports, limit);
        Ok(reports)
    }
}

/// One pretty-printed JSON file per record:
///
/// ```text
/// <root>/tasks/<task id>.json
/// <root>/reports/<report id>.json
/// ```
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tasks_dir(&self) -> PathBuf {
        self.root.join("tasks")
    }

    fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }
}

/// Write through a temp file and rename so readers never see a partial record.
fn write_json(
    dir: PathBuf,
    id: String,
    body: serde_json::Result<String>,
) -> impl FnOnce() -> Result<()> + Send + 'static {
    move || {
        let body = body?;
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", id));
        let tmp = dir.join(format!(".{}.{}.json.tmp", id, Uuid::new_v4().simple()));
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        flog_debug!("store", "wrote {}", path.display());
        Ok(())
    }
}

fn read_all<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut items = Vec::new();
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let parsed = fs::read_to_string(&path)
            .map_err(crate::Error::from)
            .and_then(|s| serde_json::from_str(&s).map_err(crate::Error::from));
        match parsed {
            Ok(item) => items.push(item),
            Err(e) => flog_warn!("store", "skipping {}: {}", path.display(), e),
        }
    }
    Ok(items)
}

#[async_trait]
impl RecordStore for JsonStore {
    async fn save_task(&self, record: &TaskRecord) -> Result<()> {
        let body = serde_json::to_string_pretty(record);
        blocking(write_json(self.tasks_dir(), record.id().to_string(), body)).await
    }

    async fn tasks(&self, limit: Option<usize>) -> Result<Vec<TaskRecord>> {
        let dir = self.tasks_dir();
        let mut records = blocking(move || read_all::<TaskRecord>(&dir)).await?;
        sort_tasks(&mut records, limit);
        Ok(records)
    }

    async fn save_report(&self, report: &Report) -> Result<()> {
        let body = serde_json::to_string_pretty(report);
        blocking(write_json(self.reports_dir(), report.id.to_string(), body)).await
    }

    async fn reports(&self, limit: Option<usize>) -> Result<Vec<Report>> {
        let dir = self.reports_dir();
        let mut reports = blocking(move || read_all::<Report>(&dir)).await?;
        sort_reports(&mut reports, limit);
        Ok(reports)
    }
}
