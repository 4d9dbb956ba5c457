//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function returning the
//! process exit code. Errors returned from `run` are fatal.

pub mod check;
pub mod load;
pub mod mappings;
