//! Configuration management
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. Built-in defaults (local PostgreSQL, IMDb registry)
//! 2. An optional TOML file (`--config`)
//! 3. Environment variables and command-line flags, both surfaced through
//!    [`ConfigOverrides`] by the CLI
//!
//! The result is an immutable [`LoaderConfig`] handed to the orchestrator.
//!
//! ```toml
//! source_root = "data_lake/landing/archive"
//! jobs = 1
//!
//! [database]
//! host = "localhost"
//! port = 5432
//! name = "analytics"
//! user = "postgres"
//! password = "postgres"
//!
//! [copy]
//! mode = "server"
//! server_root = "/data/landing/archive"
//!
//! [[mappings]]
//! source = "title.basics.tsv"
//! table = "raw.title_basics"
//! ```

use crate::error::ConfigError;
use crate::registry::{MappingEntry, MappingRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default database host.
pub const DEFAULT_DB_HOST: &str = "localhost";

/// Default database port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default database name.
pub const DEFAULT_DB_NAME: &str = "analytics";

/// Default database user.
pub const DEFAULT_DB_USER: &str = "postgres";

/// Default database password for local development.
pub const DEFAULT_DB_PASSWORD: &str = "postgres";

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default directory holding the source files.
pub const DEFAULT_SOURCE_ROOT: &str = "data_lake/landing/archive";

/// Default number of concurrent load lanes.
pub const DEFAULT_JOBS: usize = 1;

/// Database connection settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub connect_timeout_secs: u64,
    /// Server-side deadline applied to every statement; `None` waits forever
    pub statement_timeout_secs: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            database: DEFAULT_DB_NAME.to_string(),
            user: DEFAULT_DB_USER.to_string(),
            password: DEFAULT_DB_PASSWORD.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            statement_timeout_secs: None,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("statement_timeout_secs", &self.statement_timeout_secs)
            .finish()
    }
}

/// Where the bytes of a `COPY` come from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    /// Stream the file from this host over the connection (`COPY ... FROM STDIN`)
    #[default]
    Client,
    /// Let the database server read the file from its own filesystem
    Server,
}

impl std::fmt::Display for CopyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CopyMode::Client => write!(f, "client"),
            CopyMode::Server => write!(f, "server"),
        }
    }
}

/// Bulk copy settings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CopyConfig {
    pub mode: CopyMode,
    /// Directory where the database server sees the source files (server mode)
    pub server_root: Option<PathBuf>,
}

/// Fully resolved settings for one batch run
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub database: DatabaseConfig,
    pub source_root: PathBuf,
    pub copy: CopyConfig,
    pub registry: MappingRegistry,
    /// Number of sessions loading in parallel; 1 is strictly sequential
    pub jobs: usize,
    /// Abort before connecting if any source file is unavailable
    pub preflight: bool,
}

impl LoaderConfig {
    /// Defaults for everything except the source root and registry
    pub fn new(source_root: impl Into<PathBuf>, registry: MappingRegistry) -> Self {
        Self {
            database: DatabaseConfig::default(),
            source_root: source_root.into(),
            copy: CopyConfig::default(),
            registry,
            jobs: DEFAULT_JOBS,
            preflight: false,
        }
    }

    /// Read the optional config file and apply `overrides` on top
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => ConfigFile::from_path(path)?,
            None => ConfigFile::default(),
        };
        Self::resolve(file, overrides)
    }

    /// Merge defaults, file values and overrides, then validate
    pub fn resolve(file: ConfigFile, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let defaults = DatabaseConfig::default();
        let db = file.database;

        let database = DatabaseConfig {
            host: overrides.db_host.or(db.host).unwrap_or(defaults.host),
            port: overrides.db_port.or(db.port).unwrap_or(defaults.port),
            database: overrides.db_name.or(db.name).unwrap_or(defaults.database),
            user: overrides.db_user.or(db.user).unwrap_or(defaults.user),
            password: overrides.db_password.or(db.password).unwrap_or(defaults.password),
            connect_timeout_secs: overrides
                .connect_timeout_secs
                .or(db.connect_timeout_secs)
                .unwrap_or(defaults.connect_timeout_secs),
            statement_timeout_secs: overrides
                .statement_timeout_secs
                .or(db.statement_timeout_secs),
        };

        let registry = if file.mappings.is_empty() {
            MappingRegistry::imdb()?
        } else {
            MappingRegistry::new(file.mappings)?
        };

        let config = LoaderConfig {
            database,
            source_root: overrides
                .source_root
                .or(file.source_root)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_ROOT)),
            copy: CopyConfig {
                mode: overrides.copy_mode.or(file.copy.mode).unwrap_or_default(),
                server_root: overrides.server_root.or(file.copy.server_root),
            },
            registry: registry.select(&overrides.only)?,
            jobs: overrides.jobs.or(file.jobs).unwrap_or(DEFAULT_JOBS),
            preflight: overrides.preflight || file.preflight.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.host.trim().is_empty() {
            return Err(ConfigError::invalid("database host cannot be empty"));
        }

        if self.database.port == 0 {
            return Err(ConfigError::invalid("database port must be greater than 0"));
        }

        if self.database.database.trim().is_empty() {
            return Err(ConfigError::invalid("database name cannot be empty"));
        }

        if self.database.user.trim().is_empty() {
            return Err(ConfigError::invalid("database user cannot be empty"));
        }

        if self.jobs == 0 {
            return Err(ConfigError::invalid("jobs must be at least 1"));
        }

        if self.registry.is_empty() {
            return Err(ConfigError::invalid("mapping registry is empty"));
        }

        if self.copy.mode == CopyMode::Server {
            match &self.copy.server_root {
                None => {
                    return Err(ConfigError::invalid(
                        "server copy mode requires a server root (--server-root)",
                    ))
                },
                Some(root) if !root.is_absolute() => {
                    return Err(ConfigError::invalid(format!(
                        "server root '{}' must be an absolute path",
                        root.display()
                    )))
                },
                Some(_) => {},
            }
        }

        Ok(())
    }

    /// Local path of an entry's source file
    pub fn source_path(&self, entry: &MappingEntry) -> PathBuf {
        self.source_root.join(entry.source_id())
    }
}

/// Values supplied by flags or environment variables
///
/// `None` means "not given" and falls through to the file or default.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub statement_timeout_secs: Option<u64>,
    pub source_root: Option<PathBuf>,
    pub copy_mode: Option<CopyMode>,
    pub server_root: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub preflight: bool,
    /// Restrict the run to these sources
    pub only: Vec<String>,
}

/// On-disk TOML configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub source_root: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub preflight: Option<bool>,
    pub database: DatabaseSection,
    pub copy: CopySection,
    /// Replaces the built-in registry when non-empty
    pub mappings: Vec<MappingEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    #[serde(alias = "database")]
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub statement_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CopySection {
    pub mode: Option<CopyMode>,
    pub server_root: Option<PathBuf>,
}

impl ConfigFile {
    /// Read and parse a TOML config file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Parse TOML text; `origin` is only used in error messages
    pub fn parse(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }
}
