//! Common types used across rawload

use crate::error::{RawloadError, Result};
use byte_unit::{Byte, UnitType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// PostgreSQL truncates identifiers longer than `NAMEDATALEN - 1` bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

#[allow(clippy::expect_used)]
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("identifier pattern is valid")
});

/// Validate a single unquoted SQL identifier.
fn validate_identifier(part: &str, full: &str) -> Result<()> {
    if part.is_empty() {
        return Err(RawloadError::invalid_identifier(full, "empty name part"));
    }
    if part.len() > MAX_IDENTIFIER_LEN {
        return Err(RawloadError::invalid_identifier(
            full,
            format!("'{}' exceeds {} bytes", part, MAX_IDENTIFIER_LEN),
        ));
    }
    if !IDENTIFIER.is_match(part) {
        return Err(RawloadError::invalid_identifier(
            full,
            format!("'{}' must start with a letter or underscore and contain only letters, digits, '_' or '$'", part),
        ));
    }
    Ok(())
}

/// A validated, optionally schema-qualified table name.
///
/// Only plain identifiers are accepted, so the rendered form can be
/// interpolated into statements that do not support bind parameters
/// (`TRUNCATE`, `COPY`). Names are rendered unquoted and therefore follow
/// PostgreSQL's case folding.
///
/// # Examples
///
/// ```
/// use rawload_common::types::TableName;
///
/// let table: TableName = "raw.title_ratings".parse().unwrap();
/// assert_eq!(table.schema(), Some("raw"));
/// assert_eq!(table.name(), "title_ratings");
/// assert_eq!(table.to_string(), "raw.title_ratings");
///
/// assert!("raw.title;drop".parse::<TableName>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName {
    schema: Option<String>,
    name: String,
}

impl TableName {
    /// Build a table name from a schema and a bare name
    pub fn qualified(schema: &str, name: &str) -> Result<Self> {
        let full = format!("{}.{}", schema, name);
        validate_identifier(schema, &full)?;
        validate_identifier(name, &full)?;
        Ok(Self {
            schema: Some(schema.to_string()),
            name: name.to_string(),
        })
    }

    /// Schema part, if the name is qualified
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Unqualified table name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::str::FromStr for TableName {
    type Err = RawloadError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let mut parts = trimmed.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, None) => {
                validate_identifier(name, trimmed)?;
                Ok(Self {
                    schema: None,
                    name: name.to_string(),
                })
            },
            (Some(schema), Some(name), None) => Self::qualified(schema, name),
            _ => Err(RawloadError::invalid_identifier(
                trimmed,
                "expected 'table' or 'schema.table'",
            )),
        }
    }
}

impl TryFrom<String> for TableName {
    type Error = RawloadError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TableName> for String {
    fn from(table: TableName) -> Self {
        table.to_string()
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Format a byte count using binary units, e.g. `1.5 MiB`
pub fn format_bytes(bytes: u64) -> String {
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{:.1}", adjusted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_qualified() {
        let table: TableName = "raw.name_basics".parse().unwrap();
        assert_eq!(table.schema(), Some("raw"));
        assert_eq!(table.name(), "name_basics");
    }

    #[test]
    fn test_parse_unqualified() {
        let table: TableName = "title_akas".parse().unwrap();
        assert_eq!(table.schema(), None);
        assert_eq!(table.to_string(), "title_akas");
    }

    #[test]
    fn test_rejects_injection_and_malformed_names() {
        for bad in [
            "",
            "raw.",
            ".title",
            "a.b.c",
            "raw.title basics",
            "raw.title;DROP TABLE x",
            "1table",
            "raw.\"quoted\"",
        ] {
            assert!(bad.parse::<TableName>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_rejects_overlong_identifier() {
        let long = "t".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(long.parse::<TableName>().is_err());
        let exact = "t".repeat(MAX_IDENTIFIER_LEN);
        assert!(exact.parse::<TableName>().is_ok());
    }

    #[test]
    fn test_serde_uses_string_form() {
        use serde::de::value::{Error as ValueError, StrDeserializer};
        use serde::de::IntoDeserializer;

        let de: StrDeserializer<'_, ValueError> = "raw.title_basics".into_deserializer();
        let table = TableName::deserialize(de).unwrap();
        assert_eq!(table.to_string(), "raw.title_basics");

        let de: StrDeserializer<'_, ValueError> = "raw.title-basics".into_deserializer();
        assert!(TableName::deserialize(de).is_err());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    proptest! {
        #[test]
        fn prop_valid_names_round_trip(
            schema in "[a-z_][a-z0-9_]{0,20}",
            name in "[a-z_][a-z0-9_$]{0,40}",
        ) {
            let table = TableName::qualified(&schema, &name).unwrap();
            let reparsed: TableName = table.to_string().parse().unwrap();
            prop_assert_eq!(reparsed, table);
        }
    }
}
