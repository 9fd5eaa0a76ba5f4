//! Trait definitions for the transport module.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::TransportError;
use super::types::{StreamRequest, TransportEvent};

/// Pulls one remote stream.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Returns the name of this transport implementation.
    fn name(&self) -> &str;

    /// Transfers the stream, sending chunks and progress into `events`.
    ///
    /// Returns once the remote stream ended or failed. The sender is dropped
    /// on return, which closes the channel for the consumer.
    async fn transfer(
        &self,
        request: StreamRequest,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), TransportError>;
}
