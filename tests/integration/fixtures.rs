//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - A zero-latency configuration
//! - Pipelines wired to memory or JSON stores
//! - Predefined tasks

use std::sync::Arc;

use tempfile::TempDir;

use fleet::config::Config;
use fleet::core::Task;
use fleet::store::{JsonStore, MemoryStore};
use fleet::worker::{PoolSettings, SuccessPredicate};
use fleet::Pipeline;

/// Default configuration with sub-worker latency removed.
pub fn fast_config() -> Config {
    Config {
        worker_latency_ms: 0,
        ..Config::default()
    }
}

/// Pipeline with no store attached.
pub fn pipeline() -> Pipeline {
    Pipeline::from_config(&fast_config())
}

/// Pipeline whose sub-workers all decide through `predicate`.
pub fn pipeline_with_predicate(predicate: Arc<dyn SuccessPredicate>) -> Pipeline {
    let config = fast_config();
    Pipeline::with_pool(&config, PoolSettings::from_config(&config).with_predicate(predicate))
}

/// Pipeline backed by an in-memory store.
pub fn memory_pipeline() -> (Pipeline, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline().with_store(store.clone());
    (pipeline, store)
}

/// A JSON store in a temporary directory. Keep the `TempDir` alive.
pub struct TestStore {
    pub temp_dir: TempDir,
    pub store: Arc<JsonStore>,
}

impl TestStore {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(JsonStore::new(temp_dir.path()));
        Self { temp_dir, store }
    }

    pub fn pipeline(&self) -> Pipeline {
        pipeline().with_store(self.store.clone())
    }
}

/// The reference task: complexity 3, urgency 2, impact 4.
pub fn reference_task() -> Task {
    Task::new("analysis", "Reference analysis task")
        .with_complexity(3)
        .with_urgency(2)
        .with_impact(4)
}

/// Tasks covering the low, medium, high and critical priority bands.
pub fn banded_tasks() -> Vec<Task> {
    [(0, 1, 1), (1, 1, 1), (2, 2, 2), (5, 5, 5)]
        .into_iter()
        .map(|(c, u, i)| {
            Task::new("banded", &format!("c={} u={} i={}", c, u, i))
                .with_complexity(c)
                .with_urgency(u)
                .with_impact(i)
        })
        .collect()
}
