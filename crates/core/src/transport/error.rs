//! Error types for the transport module.

use thiserror::Error;

/// Errors that can end a transfer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The catalog did not resolve a direct location for this stream.
    #[error("no direct URL for stream {id}")]
    MissingUrl { id: u32 },

    /// The remote answered with a non-success status.
    #[error("remote returned HTTP {status}")]
    Status { status: u16 },

    /// HTTP client error.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The consumer stopped listening before the transfer ended.
    #[error("event receiver closed")]
    ChannelClosed,

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}
