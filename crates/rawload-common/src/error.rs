//! Error types shared across the rawload workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, RawloadError>;

/// Errors raised by the shared building blocks
#[derive(Error, Debug)]
pub enum RawloadError {
    #[error("Invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },
}

impl RawloadError {
    /// Create an invalid identifier error
    pub fn invalid_identifier(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }
}
