//! Rolling learning statistics kept by every coordinator.

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::success_rate;

/// An ingested result record: any JSON object.
pub type Record = Map<String, Value>;

/// Coerce typed results into learning records via their serde form.
///
/// Items that fail to serialize are skipped; non-object forms are kept here
/// and dropped later by [`LearningStatistics::learn`].
pub fn to_records<T: Serialize>(items: &[T]) -> Vec<Value> {
    items
        .iter()
        .filter_map(|item| serde_json::to_value(item).ok())
        .collect()
}

/// Per-coordinator history of ingested records and the derived success rate.
///
/// The history is append-only but bounded: past `capacity` the oldest
/// records rotate out. Only [`learn`](Self::learn) mutates it.
#[derive(Debug, Clone)]
pub struct LearningStatistics {
    history: VecDeque<Record>,
    capacity: usize,
    recent_success_rate: f64,
    total_ingested: u64,
}

impl LearningStatistics {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::new(),
            capacity: capacity.max(1),
            recent_success_rate: 0.0,
            total_ingested: 0,
        }
    }

    /// Ingest one batch of result records and return how many were accepted.
    ///
    /// - empty batch: the rate resets to exactly 0
    /// - non-object entries are dropped
    /// - otherwise the rate becomes successes / accepted for this batch;
    ///   a batch with nothing acceptable leaves it untouched
    pub fn learn(&mut self, records: Vec<Value>) -> usize {
        if records.is_empty() {
            self.recent_success_rate = 0.0;
            return 0;
        }

        let accepted: Vec<Record> = records
            .into_iter()
            .filter_map(|record| match record {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        if accepted.is_empty() {
            return 0;
        }

        let count = accepted.len();
        self.recent_success_rate = success_rate(&accepted);
        for record in accepted {
            if self.history.len() >= self.capacity {
                self.history.pop_front();
            }
            self.history.push_back(record);
        }
        self.total_ingested += count as u64;
        count
    }

    pub fn recent_success_rate(&self) -> f64 {
        self.recent_success_rate
    }

    /// Records currently retained.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Records ever accepted, including rotated ones.
    pub fn total_ingested(&self) -> u64 {
        self.total_ingested
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained records, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Record> {
        self.history.iter()
    }
}
