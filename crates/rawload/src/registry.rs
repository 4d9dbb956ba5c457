//! File-to-table mapping registry
//!
//! The registry is the unit of work: an ordered list of source files and
//! the staging tables they replace. Order is load order.

use crate::error::ConfigError;
use rawload_common::types::TableName;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path};
use tracing::warn;

/// Default mappings for the IMDb non-commercial dataset dumps
pub const IMDB_MAPPINGS: &[(&str, &str)] = &[
    ("title.basics.tsv", "raw.title_basics"),
    ("title.ratings.tsv", "raw.title_ratings"),
    ("title.akas.tsv", "raw.title_akas"),
    ("title.principals.tsv", "raw.title_principals"),
    ("name.basics.tsv", "raw.name_basics"),
];

/// One source file and the table it is loaded into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    #[serde(rename = "source")]
    source_id: String,
    #[serde(rename = "table")]
    target_table: TableName,
}

impl MappingEntry {
    pub fn new(source_id: impl Into<String>, target_table: TableName) -> Self {
        Self {
            source_id: source_id.into(),
            target_table,
        }
    }

    /// Build an entry from raw strings, validating the table name
    pub fn parse(source_id: &str, target_table: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(source_id, target_table.parse::<TableName>()?))
    }

    /// Source file name, relative to the source root
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn target_table(&self) -> &TableName {
        &self.target_table
    }
}

fn validate_source_id(source_id: &str) -> Result<(), ConfigError> {
    if source_id.trim().is_empty() {
        return Err(ConfigError::invalid("mapping source must not be empty"));
    }

    let path = Path::new(source_id);
    let escapes_root = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes_root {
        return Err(ConfigError::invalid(format!(
            "mapping source '{}' must be a path relative to the source root",
            source_id
        )));
    }

    Ok(())
}

/// Ordered, validated list of mapping entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingRegistry {
    entries: Vec<MappingEntry>,
}

impl MappingRegistry {
    /// Validate and wrap `entries`, keeping their order.
    ///
    /// Source ids must be unique. Target tables may repeat, in which case
    /// the later entry replaces what the earlier one loaded.
    pub fn new(entries: Vec<MappingEntry>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::invalid("mapping registry is empty"));
        }

        let mut sources = HashSet::new();
        let mut tables = HashSet::new();
        for entry in &entries {
            validate_source_id(entry.source_id())?;

            if !sources.insert(entry.source_id()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate mapping source '{}'",
                    entry.source_id()
                )));
            }

            if !tables.insert(entry.target_table()) {
                warn!(
                    table = %entry.target_table(),
                    source = entry.source_id(),
                    "Table is mapped from more than one source; later entries replace earlier loads"
                );
            }
        }

        Ok(Self { entries })
    }

    /// The built-in IMDb registry
    pub fn imdb() -> Result<Self, ConfigError> {
        let entries = IMDB_MAPPINGS
            .iter()
            .map(|(source, table)| MappingEntry::parse(source, table))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(entries)
    }

    /// Restrict the registry to the named sources, keeping registry order.
    ///
    /// An empty selection keeps every entry.
    pub fn select(&self, sources: &[String]) -> Result<Self, ConfigError> {
        if sources.is_empty() {
            return Ok(self.clone());
        }

        let unknown: Vec<&str> = sources
            .iter()
            .map(String::as_str)
            .filter(|s| !self.entries.iter().any(|e| e.source_id() == *s))
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigError::invalid(format!(
                "unknown mapping source(s): {}",
                unknown.join(", ")
            )));
        }

        let entries = self
            .entries
            .iter()
            .filter(|e| sources.iter().any(|s| s == e.source_id()))
            .cloned()
            .collect();
        Self::new(entries)
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MappingEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a MappingRegistry {
    type Item = &'a MappingEntry;
    type IntoIter = std::slice::Iter<'a, MappingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
