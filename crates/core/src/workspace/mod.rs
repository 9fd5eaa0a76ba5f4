//! Per-job scratch directories.
//!
//! A [`Workspace`] owns a uniquely named directory under the temp root. It is
//! removed by [`Workspace::release`] on the normal path and by `Drop` when the
//! owning job unwinds before reaching it.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Errors that can occur while managing a workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The scratch directory could not be created.
    #[error("failed to create workspace {path}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scratch directory could not be removed. Only ever logged.
    #[error("failed to remove workspace {path}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An isolated scratch directory owned by a single job.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    /// Creates `<root>/<prefix><uuid>`.
    pub async fn acquire(root: &Path, prefix: &str) -> Result<Self, WorkspaceError> {
        let path = root.join(format!("{}{}", prefix, Uuid::new_v4()));
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|source| WorkspaceError::CreateFailed {
                path: path.clone(),
                source,
            })?;
        debug!("Acquired workspace {:?}", path);
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh, uniquely named file path inside the workspace.
    pub fn scratch_file(&self, extension: &str) -> PathBuf {
        self.path.join(format!("{}.{}", Uuid::new_v4(), extension))
    }

    /// Recursively removes the directory. Failures are logged, not returned.
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!("Released workspace {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                let err = WorkspaceError::CleanupFailed {
                    path: self.path.clone(),
                    source,
                };
                warn!("{}: {}", err, error_source(&err));
            }
        }
    }
}

fn error_source(err: &WorkspaceError) -> String {
    std::error::Error::source(err)
        .map(|s| s.to_string())
        .unwrap_or_default()
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove workspace {:?} on drop: {}", self.path, e);
            }
        }
    }
}
