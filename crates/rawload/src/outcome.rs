//! Per-entry outcomes and the batch summary

use crate::error::EntryError;
use crate::registry::MappingEntry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Every entry succeeded
pub const EXIT_SUCCESS: i32 = 0;
/// At least one entry failed
pub const EXIT_FAILURE: i32 = 1;
/// The batch was aborted before processing entries
pub const EXIT_FATAL: i32 = 2;

/// Pipeline state of a mapping entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStage {
    Pending,
    Checked,
    Loaded,
    Verified,
}

impl std::fmt::Display for EntryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStage::Pending => write!(f, "pending"),
            EntryStage::Checked => write!(f, "checked"),
            EntryStage::Loaded => write!(f, "loaded"),
            EntryStage::Verified => write!(f, "verified"),
        }
    }
}

/// Result of processing one mapping entry. Never revised once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadOutcome {
    pub source_id: String,
    pub target_table: String,
    pub rows_loaded: u64,
    pub succeeded: bool,
    pub error: Option<String>,
    /// Last stage reached before the failure
    pub failed_stage: Option<EntryStage>,
    pub elapsed_ms: u64,
}

impl LoadOutcome {
    pub fn success(entry: &MappingEntry, rows_loaded: u64, elapsed: Duration) -> Self {
        Self {
            source_id: entry.source_id().to_string(),
            target_table: entry.target_table().to_string(),
            rows_loaded,
            succeeded: true,
            error: None,
            failed_stage: None,
            elapsed_ms: millis(elapsed),
        }
    }

    /// Failed outcomes always report zero rows
    pub fn failure(entry: &MappingEntry, error: &EntryError, elapsed: Duration) -> Self {
        Self {
            source_id: entry.source_id().to_string(),
            target_table: entry.target_table().to_string(),
            rows_loaded: 0,
            succeeded: false,
            error: Some(error.to_string()),
            failed_stage: Some(error.stage()),
            elapsed_ms: millis(elapsed),
        }
    }

    pub fn from_result(entry: &MappingEntry, result: Result<u64, EntryError>, elapsed: Duration) -> Self {
        match result {
            Ok(rows) => Self::success(entry, rows, elapsed),
            Err(e) => Self::failure(entry, &e, elapsed),
        }
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Aggregate over every outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub outcomes: Vec<LoadOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchSummary {
    /// Derive counts from `outcomes`, which must already be in registry order
    pub fn new(outcomes: Vec<LoadOutcome>, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        let succeeded_count = outcomes.iter().filter(|o| o.succeeded).count();
        Self {
            total: outcomes.len(),
            succeeded_count,
            failed_count: outcomes.len() - succeeded_count,
            outcomes,
            started_at,
            finished_at,
        }
    }

    pub fn is_success(&self) -> bool {
        self.succeeded_count == self.total
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = &LoadOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded)
    }

    pub fn total_rows(&self) -> u64 {
        self.outcomes.iter().map(|o| o.rows_loaded).sum()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
