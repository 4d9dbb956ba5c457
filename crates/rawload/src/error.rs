//! Error types for rawload
//!
//! Two classes of failure exist. [`FatalError`] aborts a batch before any
//! entry is processed and is the only error that reaches the process
//! boundary. Everything else ([`EntryError`] and the errors it wraps) is
//! caught at the entry boundary and folded into a
//! [`LoadOutcome`](crate::outcome::LoadOutcome).

use crate::availability::Unavailable;
use crate::outcome::EntryStage;
use rawload_common::RawloadError;
use sqlx::postgres::PgDatabaseError;
use std::path::PathBuf;
use thiserror::Error;

/// Message reported by the database backend, or by the I/O feeding it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // COPY failures carry the offending line in the WHERE field
            if let Some(pg) = db.try_downcast_ref::<PgDatabaseError>() {
                return match pg.r#where() {
                    Some(context) => Self::new(format!("{} ({})", pg.message(), context)),
                    None => Self::new(pg.message()),
                };
            }
            return Self::new(db.message());
        }
        Self::new(err.to_string())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Invalid or unreadable configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(transparent)]
    Identifier(#[from] RawloadError),

    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Failures that abort the whole batch
#[derive(Error, Debug)]
pub enum FatalError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source directory not found: {}", .0.display())]
    MissingSourceRoot(PathBuf),

    #[error("Missing source files: {}", .0.join(", "))]
    Preflight(Vec<String>),

    #[error("Failed to connect to database: {0}")]
    Connection(#[source] BackendError),

    #[error("Failed to write summary to '{}': {source}", path.display())]
    Summary {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Bulk load failure for a single table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("failed to clear {table}: {source}")]
    Clear { table: String, source: BackendError },

    #[error("failed to copy into {table}: {source}")]
    Copy { table: String, source: BackendError },
}

/// A post-load check that could not be executed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to verify {table}: {source}")]
pub struct VerificationError {
    pub table: String,
    pub source: BackendError,
}

/// Per-entry failure, recorded in the entry's outcome
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error(transparent)]
    MissingSource(#[from] Unavailable),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("no rows found in {table} after load")]
    Empty { table: String },
}

impl EntryError {
    /// Last state the entry reached before failing
    pub fn stage(&self) -> EntryStage {
        match self {
            EntryError::MissingSource(_) => EntryStage::Pending,
            EntryError::Load(_) => EntryStage::Checked,
            EntryError::Empty { .. } => EntryStage::Loaded,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_error_stages() {
        let missing = EntryError::from(Unavailable::NotFound {
            path: PathBuf::from("data/title.basics.tsv"),
        });
        assert_eq!(missing.stage(), EntryStage::Pending);
        assert_eq!(missing.to_string(), "file not found: data/title.basics.tsv");

        let load = EntryError::from(LoadError::Copy {
            table: "raw.title_basics".to_string(),
            source: BackendError::new("extra data after last expected column"),
        });
        assert_eq!(load.stage(), EntryStage::Checked);
        assert_eq!(
            load.to_string(),
            "failed to copy into raw.title_basics: extra data after last expected column"
        );

        let empty = EntryError::Empty {
            table: "raw.title_basics".to_string(),
        };
        assert_eq!(empty.stage(), EntryStage::Loaded);
    }

    #[test]
    fn test_preflight_lists_files() {
        let err = FatalError::Preflight(vec!["a.tsv".to_string(), "b.tsv".to_string()]);
        assert_eq!(err.to_string(), "Missing source files: a.tsv, b.tsv");
    }

    #[test]
    fn test_backend_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(BackendError::from(io).message(), "denied");
    }
}
