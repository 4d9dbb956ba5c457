//! Batch progress reporting
//!
//! The orchestrator emits events through a [`BatchReporter`] instead of
//! logging directly. [`TracingReporter`] is the production implementation;
//! tests substitute a recorder and assert on the outcomes it receives.

use crate::outcome::{BatchSummary, LoadOutcome};
use crate::registry::MappingEntry;
use comfy_table::{presets::ASCII_MARKDOWN, Cell, Table};
use tracing::{error, info, warn};

/// Sink for batch lifecycle events. Every method defaults to a no-op.
pub trait BatchReporter: Send + Sync {
    fn batch_started(&self, _total: usize) {}

    /// `position` is 1-based
    fn entry_started(&self, _position: usize, _total: usize, _entry: &MappingEntry) {}

    fn entry_finished(&self, _outcome: &LoadOutcome) {}

    fn batch_finished(&self, _summary: &BatchSummary) {}
}

/// Reporter that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl BatchReporter for NoopReporter {}

/// Writes events as structured `tracing` records
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl BatchReporter for TracingReporter {
    fn batch_started(&self, total: usize) {
        info!(total, "Starting batch load");
    }

    fn entry_started(&self, position: usize, total: usize, entry: &MappingEntry) {
        info!(
            source = entry.source_id(),
            table = %entry.target_table(),
            "[{}/{}] Loading {} into {}",
            position,
            total,
            entry.source_id(),
            entry.target_table()
        );
    }

    fn entry_finished(&self, outcome: &LoadOutcome) {
        if outcome.succeeded {
            info!(
                source = %outcome.source_id,
                table = %outcome.target_table,
                rows = outcome.rows_loaded,
                elapsed_ms = outcome.elapsed_ms,
                "Loaded {} rows into {}",
                outcome.rows_loaded,
                outcome.target_table
            );
        } else {
            error!(
                source = %outcome.source_id,
                table = %outcome.target_table,
                stage = ?outcome.failed_stage,
                error = outcome.error.as_deref().unwrap_or("unknown error"),
                "Failed to load {}",
                outcome.source_id
            );
        }
    }

    fn batch_finished(&self, summary: &BatchSummary) {
        for line in summary_table(summary).to_string().lines() {
            info!("{}", line);
        }

        info!(
            succeeded = summary.succeeded_count,
            failed = summary.failed_count,
            total = summary.total,
            rows = summary.total_rows(),
            elapsed_ms = summary.duration().num_milliseconds(),
            "Completed: {}/{} files loaded successfully",
            summary.succeeded_count,
            summary.total
        );

        if !summary.is_success() {
            warn!(
                failed = summary.failed_count,
                "Batch partially failed: {} of {} files did not load",
                summary.failed_count,
                summary.total
            );
        }
    }
}

/// Pass/fail table with one row per outcome, in registry order
pub fn summary_table(summary: &BatchSummary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_MARKDOWN)
        .set_header(vec!["Source", "Table", "Status", "Rows", "Error"]);

    for outcome in &summary.outcomes {
        let status = if outcome.succeeded { "OK" } else { "FAILED" };
        table.add_row(vec![
            Cell::new(&outcome.source_id),
            Cell::new(&outcome.target_table),
            Cell::new(status),
            Cell::new(outcome.rows_loaded),
            Cell::new(outcome.error.as_deref().unwrap_or("-")),
        ]);
    }

    table
}
