//! Database sessions
//!
//! The orchestrator talks to storage through two traits: a [`Connector`]
//! opens [`Session`]s, and a session runs the handful of statements a load
//! needs. [`PgConnector`] is the PostgreSQL implementation; tests plug in
//! their own.
//!
//! Sessions run in auto-commit mode. No transaction is ever opened, so each
//! statement is durable as soon as it returns.

use crate::config::DatabaseConfig;
use crate::error::BackendError;
use crate::sql;
use async_trait::async_trait;
use rawload_common::types::TableName;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection, Executor};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Chunk size used when streaming a file over `COPY ... FROM STDIN`
pub const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Application name reported to the server
pub const APPLICATION_NAME: &str = "rawload";

/// Input of a bulk copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopySource {
    /// File on this host, streamed over the connection
    Local(PathBuf),
    /// File on the database server's filesystem
    Server(PathBuf),
}

/// One live database connection
#[async_trait]
pub trait Session: Send {
    /// Remove every row from `table`
    async fn truncate(&mut self, table: &TableName) -> Result<(), BackendError>;

    /// Bulk copy `source` into `table`, returning rows affected
    async fn copy_in(&mut self, table: &TableName, source: &CopySource) -> Result<u64, BackendError>;

    async fn count_rows(&mut self, table: &TableName) -> Result<i64, BackendError>;

    /// Whether at least one row can be read back from `table`
    async fn has_rows(&mut self, table: &TableName) -> Result<bool, BackendError>;

    /// Release the connection. Later calls on the session fail.
    async fn close(&mut self) -> Result<(), BackendError>;
}

/// Opens sessions against a backend
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Session>, BackendError>;

    /// Human-readable target for logs; never includes credentials
    fn describe(&self) -> String;
}

/// PostgreSQL connector built on `sqlx`
pub struct PgConnector {
    options: PgConnectOptions,
    connect_timeout: Duration,
    statement_timeout: Option<Duration>,
    target: String,
}

impl PgConnector {
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .application_name(APPLICATION_NAME);

        Self {
            options,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            statement_timeout: config.statement_timeout_secs.map(Duration::from_secs),
            target: format!(
                "postgres://{}@{}:{}/{}",
                config.user, config.host, config.port, config.database
            ),
        }
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn open(&self) -> Result<Box<dyn Session>, BackendError> {
        let mut conn = tokio::time::timeout(self.connect_timeout, self.options.connect())
            .await
            .map_err(|_| {
                BackendError::new(format!(
                    "timed out after {}s connecting to {}",
                    self.connect_timeout.as_secs(),
                    self.target
                ))
            })??;

        if let Some(timeout) = self.statement_timeout {
            let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            let stmt = sql::set_statement_timeout(millis);
            conn.execute(stmt.as_str()).await?;
            debug!(statement_timeout_ms = millis, "Statement timeout applied");
        }

        debug!(database = %self.target, "Database session opened");
        Ok(Box::new(PgSession { conn: Some(conn) }))
    }

    fn describe(&self) -> String {
        self.target.clone()
    }
}

/// Session over a single `PgConnection`
pub struct PgSession {
    conn: Option<PgConnection>,
}

impl PgSession {
    fn conn(&mut self) -> Result<&mut PgConnection, BackendError> {
        self.conn
            .as_mut()
            .ok_or_else(|| BackendError::new("session is closed"))
    }

    async fn copy_from_local(
        conn: &mut PgConnection,
        table: &TableName,
        path: &std::path::Path,
    ) -> Result<u64, BackendError> {
        let mut file = tokio::fs::File::open(path).await?;
        let stmt = sql::copy_from_stdin(table);
        let mut copy = conn.copy_in_raw(&stmt).await?;
        let mut buf = vec![0u8; COPY_CHUNK_SIZE];

        loop {
            let read = match file.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    let reason = format!("failed reading {}: {}", path.display(), e);
                    if let Err(abort_err) = copy.abort(reason.clone()).await {
                        warn!(error = %abort_err, "Failed to abort COPY");
                    }
                    return Err(BackendError::new(reason));
                },
            };
            copy.send(&buf[..read]).await?;
        }

        Ok(copy.finish().await?)
    }
}

#[async_trait]
impl Session for PgSession {
    async fn truncate(&mut self, table: &TableName) -> Result<(), BackendError> {
        let stmt = sql::truncate(table);
        self.conn()?.execute(stmt.as_str()).await?;
        Ok(())
    }

    async fn copy_in(&mut self, table: &TableName, source: &CopySource) -> Result<u64, BackendError> {
        let conn = self.conn()?;
        match source {
            CopySource::Local(path) => Self::copy_from_local(conn, table, path).await,
            CopySource::Server(path) => {
                let stmt = sql::copy_from_server_file(table, path);
                let result = conn.execute(stmt.as_str()).await?;
                Ok(result.rows_affected())
            },
        }
    }

    async fn count_rows(&mut self, table: &TableName) -> Result<i64, BackendError> {
        let stmt = sql::count_rows(table);
        let count = sqlx::query_scalar::<_, i64>(stmt.as_str())
            .fetch_one(self.conn()?)
            .await?;
        Ok(count)
    }

    async fn has_rows(&mut self, table: &TableName) -> Result<bool, BackendError> {
        let stmt = sql::sample_row(table);
        let row = sqlx::query(stmt.as_str())
            .fetch_optional(self.conn()?)
            .await?;
        Ok(row.is_some())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        Ok(())
    }
}
