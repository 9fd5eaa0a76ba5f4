//! Error types for the catalog module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while querying or filtering the format catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog tool could not be found.
    #[error("catalog tool not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// The catalog query itself failed.
    #[error("catalog query failed: {reason}")]
    QueryFailed { reason: String },

    /// The catalog answered with something we could not parse.
    #[error("failed to parse catalog response: {reason}")]
    ParseError { reason: String },

    /// No allow-listed format of the given kind is available.
    #[error("no compatible {kind} formats found")]
    NoCompatibleFormat { kind: String },

    /// I/O error while running the query.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Creates a new query failed error.
    pub fn query_failed(reason: impl Into<String>) -> Self {
        Self::QueryFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new parse error.
    pub fn parse_error(reason: impl Into<String>) -> Self {
        Self::ParseError {
            reason: reason.into(),
        }
    }
}
