//! rawload library
//!
//! Truncate-and-reload bulk loader for delimited flat files.
//!
//! # Overview
//!
//! A batch walks an ordered registry of `source file -> table` mappings.
//! Each entry is checked for availability, its table is truncated and
//! refilled with PostgreSQL `COPY`, and the result is verified. Failures are
//! isolated per entry; the batch reports every entry and exits non-zero if
//! any of them failed.
//!
//! - **Registry**: [`registry::MappingRegistry`]
//! - **Configuration**: [`config::LoaderConfig`]
//! - **Backend**: [`connection::Connector`] / [`connection::Session`]
//! - **Pipeline**: [`availability`], [`loader`], [`verifier`]
//! - **Batch**: [`orchestrator::BatchOrchestrator`], [`outcome::BatchSummary`]

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod availability;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod loader;
pub mod orchestrator;
pub mod outcome;
pub mod registry;
pub mod report;
pub mod sql;
pub mod verifier;

// Re-export commonly used types
pub use config::{ConfigOverrides, CopyMode, LoaderConfig};
pub use error::{EntryError, FatalError};
pub use orchestrator::BatchOrchestrator;
pub use outcome::{BatchSummary, LoadOutcome};
pub use registry::{MappingEntry, MappingRegistry};

use clap::{Args, Parser, Subcommand};
use rawload_common::logging::LogFormat;
use std::path::PathBuf;

/// rawload - bulk load delimited files into PostgreSQL tables
#[derive(Parser, Debug)]
#[command(name = "rawload")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "RAWLOAD_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log line format (text or json)
    #[arg(long, global = true, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Truncate and reload every mapped table
    Load(LoadArgs),

    /// Check that every mapped source file is present, without touching the database
    Check(CheckArgs),

    /// Print the mapping registry
    Mappings(MappingsArgs),
}

/// Options for `rawload load`
#[derive(Args, Debug, Clone, Default)]
pub struct LoadArgs {
    /// Directory holding the source files
    #[arg(long, env = "RAWLOAD_SOURCE_ROOT", value_name = "DIR")]
    pub source_root: Option<PathBuf>,

    /// Only load these sources (repeatable or comma separated)
    #[arg(long, value_name = "SOURCE", value_delimiter = ',')]
    pub only: Vec<String>,

    /// Number of tables loaded concurrently, one session each
    #[arg(short, long, env = "RAWLOAD_JOBS")]
    pub jobs: Option<usize>,

    /// Where COPY reads the files from
    #[arg(long, value_enum, env = "RAWLOAD_COPY_MODE")]
    pub copy_mode: Option<CopyMode>,

    /// Directory where the database server sees the source files (server mode)
    #[arg(long, env = "RAWLOAD_SERVER_ROOT", value_name = "DIR")]
    pub server_root: Option<PathBuf>,

    /// Abort before connecting if any source file is missing
    #[arg(long)]
    pub preflight: bool,

    /// Server-side deadline for each statement, in seconds
    #[arg(long, value_name = "SECS")]
    pub statement_timeout_secs: Option<u64>,

    /// Write the batch summary as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub summary_json: Option<PathBuf>,

    #[command(flatten)]
    pub database: DatabaseArgs,
}

impl LoadArgs {
    /// Flag and environment values, to be layered over the config file
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            db_host: self.database.db_host.clone(),
            db_port: self.database.db_port,
            db_name: self.database.db_name.clone(),
            db_user: self.database.db_user.clone(),
            db_password: self.database.db_password.clone(),
            connect_timeout_secs: self.database.connect_timeout_secs,
            statement_timeout_secs: self.statement_timeout_secs,
            source_root: self.source_root.clone(),
            copy_mode: self.copy_mode,
            server_root: self.server_root.clone(),
            jobs: self.jobs,
            preflight: self.preflight,
            only: self.only.clone(),
        }
    }
}

/// Database connection flags
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// Database host
    #[arg(long, env = "RAWLOAD_DB_HOST")]
    pub db_host: Option<String>,

    /// Database port
    #[arg(long, env = "RAWLOAD_DB_PORT")]
    pub db_port: Option<u16>,

    /// Database name
    #[arg(long, env = "RAWLOAD_DB_NAME")]
    pub db_name: Option<String>,

    /// Database user
    #[arg(long, env = "RAWLOAD_DB_USER")]
    pub db_user: Option<String>,

    /// Database password
    #[arg(long, env = "RAWLOAD_DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Seconds to wait for a connection
    #[arg(long, value_name = "SECS")]
    pub connect_timeout_secs: Option<u64>,
}

/// Options for `rawload check`
#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Directory holding the source files
    #[arg(long, env = "RAWLOAD_SOURCE_ROOT", value_name = "DIR")]
    pub source_root: Option<PathBuf>,

    /// Only check these sources (repeatable or comma separated)
    #[arg(long, value_name = "SOURCE", value_delimiter = ',')]
    pub only: Vec<String>,
}

impl CheckArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            source_root: self.source_root.clone(),
            only: self.only.clone(),
            ..Default::default()
        }
    }
}

/// Options for `rawload mappings`
#[derive(Args, Debug, Clone, Default)]
pub struct MappingsArgs {
    /// Directory holding the source files
    #[arg(long, env = "RAWLOAD_SOURCE_ROOT", value_name = "DIR")]
    pub source_root: Option<PathBuf>,
}

impl MappingsArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            source_root: self.source_root.clone(),
            ..Default::default()
        }
    }
}
