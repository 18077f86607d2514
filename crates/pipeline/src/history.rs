//! Bounded log of past orchestration runs and aggregate statistics.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::{duration_ms, mean_duration};
use crate::{LayerId, OrchestrationResult, RunId, Timestamp};

/// Default number of retained records.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// One past run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub run_id: RunId,
    pub timestamp: Timestamp,
    pub layers: Vec<LayerId>,
    pub success: bool,
    pub total_changes: usize,
    #[serde(with = "duration_ms")]
    pub execution_time: Duration,
    pub improvements: Vec<String>,
}

impl HistoryRecord {
    pub fn from_result(run_id: RunId, layers: Vec<LayerId>, result: &OrchestrationResult) -> Self {
        Self {
            run_id,
            timestamp: Timestamp::now(),
            layers,
            success: result.success,
            total_changes: result.summary.total_changes,
            execution_time: result.summary.total_execution_time,
            improvements: result.improvements(),
        }
    }
}

/// Aggregates over the retained records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_executions: usize,
    /// Fraction of successful runs in `[0.0, 1.0]`; zero with no runs.
    pub success_rate: f64,
    pub average_changes: f64,
    #[serde(with = "duration_ms")]
    pub average_execution_time: Duration,
}

/// Recent records plus aggregate stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryReport {
    pub history: Vec<HistoryRecord>,
    pub stats: Stats,
}

/// Append-only run log keeping the most recent `capacity` records.
#[derive(Debug)]
pub struct ExecutionHistory {
    capacity: usize,
    records: Mutex<VecDeque<HistoryRecord>>,
}

impl ExecutionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Appends a record, dropping the oldest beyond capacity.
    pub fn append(&self, record: HistoryRecord) {
        let mut records = self.records.lock();
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    /// Up to `limit` records, newest first.
    pub fn recent(&self, limit: usize) -> Vec<HistoryRecord> {
        self.records.lock().iter().rev().take(limit).cloned().collect()
    }

    /// All retained records, oldest first.
    pub fn snapshot(&self) -> Vec<HistoryRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> Stats {
        let records = self.records.lock();
        let total = records.len();
        if total == 0 {
            return Stats {
                total_executions: 0,
                success_rate: 0.0,
                average_changes: 0.0,
                average_execution_time: Duration::ZERO,
            };
        }
        let successes = records.iter().filter(|r| r.success).count();
        let changes: usize = records.iter().map(|r| r.total_changes).sum();
        let time: Duration = records.iter().map(|r| r.execution_time).sum();
        Stats {
            total_executions: total,
            success_rate: successes as f64 / total as f64,
            average_changes: changes as f64 / total as f64,
            average_execution_time: mean_duration(time, total),
        }
    }

    pub fn report(&self, limit: usize) -> HistoryReport {
        HistoryReport {
            history: self.recent(limit),
            stats: self.stats(),
        }
    }
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
