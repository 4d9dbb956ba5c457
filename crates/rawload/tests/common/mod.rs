//! Common test utilities for rawload integration tests
//!
//! Provides an in-memory backend that behaves like PostgreSQL for the
//! statements a batch issues:
//!
//! - `TRUNCATE` empties a table, and fails if the table does not exist
//! - `COPY` parses tab separated text with a header line and `\N` nulls,
//!   and is atomic: a row with the wrong number of columns rejects the file
//! - every statement is recorded so tests can assert on what ran
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{FakeDatabase, staged_fixtures, imdb_config};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let db = FakeDatabase::imdb();
//!     let dir = staged_fixtures();
//!     let config = imdb_config(dir.path());
//!     // ...
//! }
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use rawload::connection::{Connector, CopySource, Session};
use rawload::error::BackendError;
use rawload::outcome::{BatchSummary, LoadOutcome};
use rawload::registry::{MappingEntry, MappingRegistry};
use rawload::report::BatchReporter;
use rawload::LoaderConfig;
use rawload_common::types::TableName;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Fixture files and the number of data rows each holds
pub const FIXTURE_ROWS: &[(&str, u64)] = &[
    ("title.basics.tsv", 4),
    ("title.ratings.tsv", 3),
    ("title.akas.tsv", 3),
    ("title.principals.tsv", 3),
    ("name.basics.tsv", 2),
];

/// Column counts of the IMDb staging tables
pub const IMDB_TABLES: &[(&str, usize)] = &[
    ("raw.title_basics", 9),
    ("raw.title_ratings", 3),
    ("raw.title_akas", 8),
    ("raw.title_principals", 6),
    ("raw.name_basics", 6),
];

// ============================================================================
// Fixtures
// ============================================================================

pub fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// Copy the fixture TSVs into a fresh temporary directory
pub fn staged_fixtures() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for (file, _) in FIXTURE_ROWS {
        std::fs::copy(fixture_dir().join(file), dir.path().join(file)).expect("Failed to copy fixture");
    }
    dir
}

/// Built-in registry rooted at `source_root`
pub fn imdb_config(source_root: &Path) -> LoaderConfig {
    LoaderConfig::new(source_root, MappingRegistry::imdb().expect("IMDb registry is valid"))
}

/// Outcomes without timing, for comparing runs
pub fn comparable(outcomes: &[LoadOutcome]) -> Vec<LoadOutcome> {
    outcomes
        .iter()
        .cloned()
        .map(|mut o| {
            o.elapsed_ms = 0;
            o
        })
        .collect()
}

// ============================================================================
// In-memory backend
// ============================================================================

/// A statement received by the fake backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Truncate(String),
    Copy(String),
    Count(String),
    Sample(String),
}

impl Statement {
    pub fn table(&self) -> &str {
        match self {
            Statement::Truncate(t) | Statement::Copy(t) | Statement::Count(t) | Statement::Sample(t) => t,
        }
    }
}

type Row = Vec<Option<String>>;

#[derive(Debug, Default)]
struct FakeTable {
    columns: usize,
    rows: Vec<Row>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, FakeTable>,
    statements: Vec<Statement>,
    opened: usize,
    closed: usize,
    refuse_connections: bool,
    yield_per_statement: bool,
    failing_verification: HashSet<String>,
}

/// Shared in-memory database; clones see the same state
#[derive(Debug, Clone, Default)]
pub struct FakeDatabase {
    state: Arc<Mutex<State>>,
}

impl FakeDatabase {
    /// Database holding the five empty IMDb staging tables
    pub fn imdb() -> Self {
        let db = Self::default();
        for (table, columns) in IMDB_TABLES {
            db.create_table(table, *columns);
        }
        db
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake database lock poisoned")
    }

    pub fn create_table(&self, table: &str, columns: usize) {
        self.state().tables.insert(
            table.to_string(),
            FakeTable {
                columns,
                rows: Vec::new(),
            },
        );
    }

    /// Insert `count` placeholder rows, as if left over from an earlier load
    pub fn seed(&self, table: &str, count: usize) {
        let mut state = self.state();
        let t = state.tables.get_mut(table).expect("seeded table exists");
        let row = vec![Some("stale".to_string()); t.columns];
        t.rows.extend(std::iter::repeat(row).take(count));
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.state().tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state().tables.get(table).map(|t| t.rows.clone()).unwrap_or_default()
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.state().statements.clone()
    }

    pub fn statements_for(&self, table: &str) -> Vec<Statement> {
        self.statements().into_iter().filter(|s| s.table() == table).collect()
    }

    pub fn refuse_connections(&self) {
        self.state().refuse_connections = true;
    }

    /// Yield to the scheduler before every statement, so concurrent
    /// sessions interleave the way separate connections would
    pub fn yield_per_statement(&self) {
        self.state().yield_per_statement = true;
    }

    /// Make verification queries against `table` fail
    pub fn fail_verification(&self, table: &str) {
        self.state().failing_verification.insert(table.to_string());
    }

    pub fn opened(&self) -> usize {
        self.state().opened
    }

    pub fn closed(&self) -> usize {
        self.state().closed
    }

    fn execute_copy(&self, table: &str, path: &Path) -> Result<u64, BackendError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BackendError::new(format!("could not open file \"{}\": {}", path.display(), e)))?;

        let mut state = self.state();
        state.statements.push(Statement::Copy(table.to_string()));
        let target = state
            .tables
            .get_mut(table)
            .ok_or_else(|| missing_relation(table))?;

        // Parse everything before inserting anything: COPY is all or nothing
        let mut parsed = Vec::new();
        for (number, line) in contents.lines().enumerate().skip(1) {
            if line.is_empty() {
                continue;
            }
            let fields: Row = line
                .split('\t')
                .map(|f| if f == "\\N" { None } else { Some(f.to_string()) })
                .collect();
            if fields.len() > target.columns {
                return Err(BackendError::new(format!(
                    "extra data after last expected column (COPY {}, line {})",
                    table,
                    number + 1
                )));
            }
            if fields.len() < target.columns {
                return Err(BackendError::new(format!(
                    "missing data for column (COPY {}, line {})",
                    table,
                    number + 1
                )));
            }
            parsed.push(fields);
        }

        let count = parsed.len() as u64;
        target.rows.extend(parsed);
        Ok(count)
    }
}

fn missing_relation(table: &str) -> BackendError {
    BackendError::new(format!("relation \"{}\" does not exist", table))
}

#[async_trait]
impl Connector for FakeDatabase {
    async fn open(&self) -> Result<Box<dyn Session>, BackendError> {
        let mut state = self.state();
        if state.refuse_connections {
            return Err(BackendError::new("connection refused"));
        }
        state.opened += 1;
        Ok(Box::new(FakeSession {
            db: self.clone(),
            open: true,
        }))
    }

    fn describe(&self) -> String {
        "fake://memory".to_string()
    }
}

/// Session handed out by [`FakeDatabase`]
pub struct FakeSession {
    db: FakeDatabase,
    open: bool,
}

impl FakeSession {
    async fn ensure_open(&self) -> Result<(), BackendError> {
        if !self.open {
            return Err(BackendError::new("session is closed"));
        }
        let pause = self.db.state().yield_per_statement;
        if pause {
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn truncate(&mut self, table: &TableName) -> Result<(), BackendError> {
        self.ensure_open().await?;
        let name = table.to_string();
        let mut state = self.db.state();
        state.statements.push(Statement::Truncate(name.clone()));
        let target = state.tables.get_mut(&name).ok_or_else(|| missing_relation(&name))?;
        target.rows.clear();
        Ok(())
    }

    async fn copy_in(&mut self, table: &TableName, source: &CopySource) -> Result<u64, BackendError> {
        self.ensure_open().await?;
        let path = match source {
            CopySource::Local(path) | CopySource::Server(path) => path,
        };
        self.db.execute_copy(&table.to_string(), path)
    }

    async fn count_rows(&mut self, table: &TableName) -> Result<i64, BackendError> {
        self.ensure_open().await?;
        let name = table.to_string();
        let mut state = self.db.state();
        state.statements.push(Statement::Count(name.clone()));
        if state.failing_verification.contains(&name) {
            return Err(BackendError::new("canceling statement due to statement timeout"));
        }
        let target = state.tables.get(&name).ok_or_else(|| missing_relation(&name))?;
        Ok(target.rows.len() as i64)
    }

    async fn has_rows(&mut self, table: &TableName) -> Result<bool, BackendError> {
        self.ensure_open().await?;
        let name = table.to_string();
        let mut state = self.db.state();
        state.statements.push(Statement::Sample(name.clone()));
        let target = state.tables.get(&name).ok_or_else(|| missing_relation(&name))?;
        Ok(!target.rows.is_empty())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        if self.open {
            self.open = false;
            self.db.state().closed += 1;
        }
        Ok(())
    }
}

// ============================================================================
// Reporter
// ============================================================================

/// Event captured by [`RecordingReporter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BatchStarted(usize),
    EntryStarted { position: usize, source: String },
    EntryFinished { source: String, succeeded: bool },
    BatchFinished { succeeded: usize, total: usize },
}

#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Event>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("reporter lock poisoned").clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().expect("reporter lock poisoned").push(event);
    }
}

impl BatchReporter for RecordingReporter {
    fn batch_started(&self, total: usize) {
        self.push(Event::BatchStarted(total));
    }

    fn entry_started(&self, position: usize, _total: usize, entry: &MappingEntry) {
        self.push(Event::EntryStarted {
            position,
            source: entry.source_id().to_string(),
        });
    }

    fn entry_finished(&self, outcome: &LoadOutcome) {
        self.push(Event::EntryFinished {
            source: outcome.source_id.clone(),
            succeeded: outcome.succeeded,
        });
    }

    fn batch_finished(&self, summary: &BatchSummary) {
        self.push(Event::BatchFinished {
            succeeded: summary.succeeded_count,
            total: summary.total,
        });
    }
}
