//! Source file availability checks
//!
//! Runs before anything touches the target table, so a missing file never
//! causes a truncate.

use crate::error::FatalError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a source file cannot be loaded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("not a regular file: {}", path.display())]
    NotAFile { path: PathBuf },

    #[error("file not readable: {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
}

/// Check that `path` is an existing, regular, readable file.
///
/// Returns the file size in bytes on success.
pub async fn check(path: &Path) -> Result<u64, Unavailable> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Unavailable::NotFound {
                path: path.to_path_buf(),
            })
        },
        Err(e) => {
            return Err(Unavailable::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        },
    };

    if !metadata.is_file() {
        return Err(Unavailable::NotAFile {
            path: path.to_path_buf(),
        });
    }

    tokio::fs::File::open(path)
        .await
        .map_err(|e| Unavailable::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(metadata.len())
}

/// `true` if `path` can be loaded. Never errors.
pub async fn exists_and_readable(path: &Path) -> bool {
    check(path).await.is_ok()
}

/// Require the source root to be an existing directory
pub async fn require_dir(root: &Path) -> Result<(), FatalError> {
    match tokio::fs::metadata(root).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        _ => Err(FatalError::MissingSourceRoot(root.to_path_buf())),
    }
}
