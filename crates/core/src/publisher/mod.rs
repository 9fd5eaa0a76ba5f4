//! Moves finished output out of the workspace into the output directory.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Used when a title sanitizes to nothing.
const FALLBACK_STEM: &str = "untitled";

/// Errors that can occur while publishing a file.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Source file not found.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Failed to create destination directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to move the file.
    #[error("Failed to move file from {from} to {destination}")]
    MoveFailed {
        from: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The destination is missing after the move.
    #[error("Output not found after publishing: {path}")]
    NotConfirmed { path: PathBuf },
}

impl PublishError {
    /// Creates a move failed error.
    pub fn move_failed(from: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::MoveFailed {
            from,
            destination,
            error,
        }
    }
}

/// A file that reached its final location.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Replaces every character outside `[A-Za-z0-9 _.-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `<dir>/<sanitized title>.<ext>`.
pub fn output_path(dir: &Path, title: &str, extension: &str) -> PathBuf {
    let mut stem = sanitize_filename(title.trim());
    if stem.is_empty() {
        stem = FALLBACK_STEM.to_string();
    }
    dir.join(format!("{}.{}", stem, extension))
}

/// Attempts to move a file atomically (rename).
async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(true),
        Err(e) => {
            // Cross-filesystem moves fail with EXDEV (18 on Linux)
            if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                Ok(false)
            } else {
                Err(e)
            }
        }
    }
}

/// Moves `source` to `destination`, overwriting, and confirms the result.
pub async fn publish(source: &Path, destination: &Path) -> Result<PublishedFile, PublishError> {
    if !source.exists() {
        return Err(PublishError::SourceNotFound {
            path: source.to_path_buf(),
        });
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| PublishError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }

    let moved = try_atomic_move(source, destination).await.map_err(|e| {
        PublishError::move_failed(source.to_path_buf(), destination.to_path_buf(), e)
    })?;

    if !moved {
        debug!("Rename crossed filesystems, copying {:?}", source);
        fs::copy(source, destination).await.map_err(|e| {
            PublishError::move_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;
        // The workspace is removed afterwards anyway
        let _ = fs::remove_file(source).await;
    }

    let meta = fs::metadata(destination)
        .await
        .map_err(|_| PublishError::NotConfirmed {
            path: destination.to_path_buf(),
        })?;

    Ok(PublishedFile {
        path: destination.to_path_buf(),
        size_bytes: meta.len(),
    })
}
