//! Statement rendering
//!
//! `TRUNCATE` and `COPY` take no bind parameters, so table names are
//! interpolated. [`TableName`] only admits plain identifiers, and server-side
//! paths are emitted as escaped string literals.

use rawload_common::types::TableName;
use std::path::Path;

/// Options shared by every `COPY`: tab separated, `\N` for NULL, header skipped
pub const COPY_OPTIONS: &str = r"(FORMAT text, DELIMITER E'\t', NULL '\N', HEADER true)";

pub fn truncate(table: &TableName) -> String {
    format!("TRUNCATE TABLE {}", table)
}

/// `COPY` fed by the client over the connection
pub fn copy_from_stdin(table: &TableName) -> String {
    format!("COPY {} FROM STDIN WITH {}", table, COPY_OPTIONS)
}

/// `COPY` reading a file on the database server
pub fn copy_from_server_file(table: &TableName, server_path: &Path) -> String {
    format!(
        "COPY {} FROM {} WITH {}",
        table,
        string_literal(&server_path.to_string_lossy()),
        COPY_OPTIONS
    )
}

pub fn count_rows(table: &TableName) -> String {
    format!("SELECT COUNT(*) FROM {}", table)
}

pub fn sample_row(table: &TableName) -> String {
    format!("SELECT * FROM {} LIMIT 1", table)
}

pub fn set_statement_timeout(millis: u64) -> String {
    format!("SET statement_timeout = {}", millis)
}

/// Standard-conforming SQL string literal
fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
