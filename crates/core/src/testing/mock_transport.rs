//! Mock stream transport for testing.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::transport::{StreamRequest, StreamTransport, TransportError, TransportEvent};

const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Mock implementation of the StreamTransport trait.
///
/// Serves configured payloads in fixed-size chunks, each followed by a
/// progress event. A stream marked failing sends half its payload, then
/// errors.
#[derive(Debug, Clone)]
pub struct MockTransport {
    /// Payload per stream id.
    payloads: Arc<RwLock<HashMap<u32, Vec<u8>>>>,
    /// Failure message per stream id.
    failures: Arc<RwLock<HashMap<u32, String>>>,
    /// Requests received, in order.
    requests: Arc<RwLock<Vec<StreamRequest>>>,
    chunk_size: usize,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            payloads: Arc::new(RwLock::new(HashMap::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub async fn set_payload(&self, stream_id: u32, payload: Vec<u8>) {
        self.payloads.write().await.insert(stream_id, payload);
    }

    /// Makes the stream fail midway with `message`.
    pub async fn fail_stream(&self, stream_id: u32, message: impl Into<String>) {
        self.failures
            .write()
            .await
            .insert(stream_id, message.into());
    }

    pub async fn recorded_requests(&self) -> Vec<StreamRequest> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl StreamTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transfer(
        &self,
        request: StreamRequest,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), TransportError> {
        self.requests.write().await.push(request.clone());

        let payload = self
            .payloads
            .read()
            .await
            .get(&request.stream_id)
            .cloned()
            .ok_or_else(|| {
                TransportError::Other(format!("no payload for stream {}", request.stream_id))
            })?;
        let failure = self.failures.read().await.get(&request.stream_id).cloned();

        let total = request.expected_bytes.unwrap_or(payload.len() as u64);
        let served = match failure {
            Some(_) => &payload[..payload.len() / 2],
            None => &payload[..],
        };

        let mut downloaded = 0u64;
        for chunk in served.chunks(self.chunk_size) {
            downloaded += chunk.len() as u64;
            events
                .send(TransportEvent::Chunk(Bytes::copy_from_slice(chunk)))
                .await
                .map_err(|_| TransportError::ChannelClosed)?;
            events
                .send(TransportEvent::Progress { downloaded, total })
                .await
                .map_err(|_| TransportError::ChannelClosed)?;
        }

        match failure {
            Some(message) => Err(TransportError::Other(message)),
            None => Ok(()),
        }
    }
}
