//! rawload Common Library
//!
//! Shared types, logging setup, and error handling for the rawload workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`RawloadError`] and the crate [`Result`] alias
//! - **Logging**: `tracing` subscriber configuration used by every binary
//! - **Types**: validated SQL identifiers ([`types::TableName`]) and size formatting
//!
//! # Example
//!
//! ```no_run
//! use rawload_common::types::TableName;
//!
//! fn target() -> rawload_common::Result<TableName> {
//!     let table: TableName = "raw.title_basics".parse()?;
//!     assert_eq!(table.schema(), Some("raw"));
//!     Ok(table)
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{RawloadError, Result};
