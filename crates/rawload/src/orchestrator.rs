//! Batch orchestration
//!
//! Drives every mapping entry through
//! `Pending -> Checked -> Loaded -> Verified` and records exactly one
//! [`LoadOutcome`] per entry, whichever stage fails. Entry failures never
//! stop the batch. Only [`FatalError`]s (missing source root, failed
//! preflight, no session) abort it, and they do so before any entry runs.
//!
//! With `jobs > 1` entries are grouped by target table and the groups are
//! dealt round-robin onto at most that many lanes, so every entry for a
//! table runs on one session in registry order. Each lane owns one session
//! and runs its entries in order; lanes are polled concurrently on the
//! current task. Outcomes are put back in registry order before the summary
//! is built.

use crate::availability;
use crate::config::LoaderConfig;
use crate::connection::{Connector, Session};
use crate::availability::require_dir;
use crate::error::{EntryError, FatalError};
use crate::loader::TableLoader;
use crate::outcome::{BatchSummary, LoadOutcome};
use crate::registry::MappingEntry;
use crate::report::BatchReporter;
use crate::verifier;
use chrono::Utc;
use futures::future::join_all;
use rawload_common::types::{format_bytes, TableName};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs one batch against an injected backend and reporter
pub struct BatchOrchestrator<C, R> {
    config: LoaderConfig,
    connector: C,
    reporter: R,
    loader: TableLoader,
}

impl<C: Connector, R: BatchReporter> BatchOrchestrator<C, R> {
    pub fn new(config: LoaderConfig, connector: C, reporter: R) -> Self {
        let loader = TableLoader::new(&config.copy);
        Self {
            config,
            connector,
            reporter,
            loader,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Load every registry entry and summarize.
    ///
    /// Returns `Err` only for fatal failures, in which case no entry was
    /// processed. Sessions that were opened are always closed.
    pub async fn run(&self) -> Result<BatchSummary, FatalError> {
        let started_at = Utc::now();

        require_dir(&self.config.source_root).await?;
        if self.config.preflight {
            self.preflight().await?;
        }

        let total = self.config.registry.len();
        let plan = plan_lanes(self.config.registry.entries(), self.config.jobs);
        let mut sessions = self.open_sessions(plan.len()).await?;

        self.reporter.batch_started(total);
        let outcomes = self.run_lanes(&plan, &mut sessions).await;
        self.close_sessions(sessions).await;

        let summary = BatchSummary::new(outcomes, started_at, Utc::now());
        self.reporter.batch_finished(&summary);
        Ok(summary)
    }

    async fn preflight(&self) -> Result<(), FatalError> {
        let mut missing = Vec::new();
        for entry in &self.config.registry {
            if let Err(reason) = availability::check(&self.config.source_path(entry)).await {
                warn!(source = entry.source_id(), %reason, "Preflight: source unavailable");
                missing.push(entry.source_id().to_string());
            }
        }

        if missing.is_empty() {
            debug!(entries = self.config.registry.len(), "Preflight passed");
            Ok(())
        } else {
            Err(FatalError::Preflight(missing))
        }
    }

    async fn open_sessions(&self, count: usize) -> Result<Vec<Box<dyn Session>>, FatalError> {
        info!(
            database = %self.connector.describe(),
            sessions = count,
            "Connecting to database"
        );

        let mut sessions = Vec::with_capacity(count);
        for _ in 0..count {
            match self.connector.open().await {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    self.close_sessions(sessions).await;
                    return Err(FatalError::Connection(e));
                },
            }
        }
        Ok(sessions)
    }

    async fn close_sessions(&self, sessions: Vec<Box<dyn Session>>) {
        for mut session in sessions {
            if let Err(e) = session.close().await {
                warn!(error = %e, "Failed to close database session");
            }
        }
    }

    async fn run_lanes(&self, plan: &[Vec<usize>], sessions: &mut [Box<dyn Session>]) -> Vec<LoadOutcome> {
        let lanes = plan
            .iter()
            .zip(sessions.iter_mut())
            .map(|(indices, session)| self.run_lane(indices, session.as_mut()));

        let mut indexed: Vec<(usize, LoadOutcome)> = join_all(lanes).await.into_iter().flatten().collect();
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn run_lane(&self, indices: &[usize], session: &mut dyn Session) -> Vec<(usize, LoadOutcome)> {
        let entries = self.config.registry.entries();
        let total = entries.len();

        let mut outcomes = Vec::with_capacity(indices.len());
        for &index in indices {
            let entry = &entries[index];
            self.reporter.entry_started(index + 1, total, entry);

            let started = Instant::now();
            let result = self.process_entry(session, entry).await;
            let outcome = LoadOutcome::from_result(entry, result, started.elapsed());

            self.reporter.entry_finished(&outcome);
            outcomes.push((index, outcome));
        }
        outcomes
    }

    async fn process_entry(&self, session: &mut dyn Session, entry: &MappingEntry) -> Result<u64, EntryError> {
        let table = entry.target_table();
        let path = self.config.source_path(entry);

        let size = availability::check(&path).await?;
        debug!(
            source = entry.source_id(),
            size = %format_bytes(size),
            "Source file available"
        );

        let source = self.loader.copy_source(entry.source_id(), &path);
        let copied = self.loader.load(session, &source, table).await?;

        let verification = verifier::verify(session, table).await;
        if !verification.is_populated() {
            return Err(EntryError::Empty {
                table: table.to_string(),
            });
        }
        if verification.row_count != copied {
            debug!(
                table = %table,
                copied,
                counted = verification.row_count,
                "Row count differs from rows reported by COPY"
            );
        }

        Ok(verification.row_count)
    }
}

/// Registry indices per lane.
///
/// Entries sharing a target table form one group and stay together so
/// their truncate and copy never interleave. Groups are dealt round-robin
/// onto `min(jobs, groups)` lanes; each lane is in registry order.
fn plan_lanes(entries: &[MappingEntry], jobs: usize) -> Vec<Vec<usize>> {
    let mut groups: Vec<(&TableName, Vec<usize>)> = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        match groups.iter_mut().find(|(table, _)| *table == entry.target_table()) {
            Some((_, indices)) => indices.push(index),
            None => groups.push((entry.target_table(), vec![index])),
        }
    }

    let lane_count = jobs.min(groups.len()).max(1);
    let mut lanes = vec![Vec::new(); lane_count];
    for (group, (_, indices)) in groups.into_iter().enumerate() {
        lanes[group % lane_count].extend(indices);
    }
    for lane in &mut lanes {
        lane.sort_unstable();
    }
    lanes
}
