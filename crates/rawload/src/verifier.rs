//! Post-load verification

use crate::connection::Session;
use crate::error::VerificationError;
use rawload_common::types::TableName;
use tracing::{debug, warn};

/// What a loaded table looks like from the database side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verification {
    pub row_count: u64,
    pub has_sample_row: bool,
}

impl Verification {
    /// A load counts only when rows are actually there
    pub fn is_populated(&self) -> bool {
        self.row_count > 0
    }
}

/// Count rows and fetch one sample row from `table`.
///
/// Query failures are logged and reported as an empty table, so a broken
/// check fails the entry instead of the batch.
pub async fn verify(session: &mut dyn Session, table: &TableName) -> Verification {
    match try_verify(session, table).await {
        Ok(verification) => verification,
        Err(e) => {
            warn!(table = %table, error = %e, "Verification failed; treating table as empty");
            Verification::default()
        },
    }
}

/// Like [`verify`] but surfaces query failures
pub async fn try_verify(
    session: &mut dyn Session,
    table: &TableName,
) -> Result<Verification, VerificationError> {
    let wrap = |source| VerificationError {
        table: table.to_string(),
        source,
    };

    let count = session.count_rows(table).await.map_err(wrap)?;
    let has_sample_row = session.has_rows(table).await.map_err(wrap)?;

    let verification = Verification {
        row_count: u64::try_from(count).unwrap_or(0),
        has_sample_row,
    };
    debug!(
        table = %table,
        row_count = verification.row_count,
        has_sample_row,
        "Verified table"
    );
    Ok(verification)
}
