//! Table loading
//!
//! A load replaces the contents of a table: `TRUNCATE`, then `COPY`. The two
//! statements run in auto-commit mode on the same session, so a failed copy
//! leaves the table empty rather than restoring its previous rows.

use crate::config::{CopyConfig, CopyMode};
use crate::connection::{CopySource, Session};
use crate::error::LoadError;
use rawload_common::types::TableName;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Replaces table contents from source files
#[derive(Debug, Clone)]
pub struct TableLoader {
    mode: CopyMode,
    server_root: Option<PathBuf>,
}

impl TableLoader {
    pub fn new(config: &CopyConfig) -> Self {
        Self {
            mode: config.mode,
            server_root: config.server_root.clone(),
        }
    }

    /// Resolve what the backend reads for a source file.
    ///
    /// `relative` is the entry's source id; `local_path` is where this host
    /// sees the file. Server mode rebases the relative path onto the server
    /// root.
    pub fn copy_source(&self, relative: &str, local_path: &Path) -> CopySource {
        match (self.mode, &self.server_root) {
            (CopyMode::Server, Some(root)) => CopySource::Server(root.join(relative)),
            _ => CopySource::Local(local_path.to_path_buf()),
        }
    }

    /// Replace the contents of `table` with `source`.
    ///
    /// Returns the number of rows the copy reported.
    pub async fn load(
        &self,
        session: &mut dyn Session,
        source: &CopySource,
        table: &TableName,
    ) -> Result<u64, LoadError> {
        let started = Instant::now();

        session
            .truncate(table)
            .await
            .map_err(|source| LoadError::Clear {
                table: table.to_string(),
                source,
            })?;
        debug!(table = %table, "Table truncated");

        let rows = session
            .copy_in(table, source)
            .await
            .map_err(|source| LoadError::Copy {
                table: table.to_string(),
                source,
            })?;

        info!(
            table = %table,
            rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Copied rows"
        );
        Ok(rows)
    }
}
