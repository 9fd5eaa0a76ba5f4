//! HTTP transport built on reqwest's streaming body.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::debug;

use super::config::TransportConfig;
use super::error::TransportError;
use super::traits::StreamTransport;
use super::types::{StreamRequest, TransportEvent};

/// Streams a resolved media URL over HTTP.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StreamTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn transfer(
        &self,
        request: StreamRequest,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), TransportError> {
        let url = request.url.as_deref().ok_or(TransportError::MissingUrl {
            id: request.stream_id,
        })?;

        debug!("GET stream {} from {}", request.stream_id, request.source);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let total = response
            .content_length()
            .or(request.expected_bytes)
            .unwrap_or(0);
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            downloaded += chunk.len() as u64;
            events
                .send(TransportEvent::Chunk(chunk))
                .await
                .map_err(|_| TransportError::ChannelClosed)?;
            events
                .send(TransportEvent::Progress { downloaded, total })
                .await
                .map_err(|_| TransportError::ChannelClosed)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_url_fails_before_request() {
        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let request = StreamRequest {
            source: "https://example.com/watch?v=abc".to_string(),
            stream_id: 140,
            url: None,
            expected_bytes: Some(10),
        };

        let err = transport.transfer(request, tx).await.unwrap_err();
        assert!(matches!(err, TransportError::MissingUrl { id: 140 }));
        assert!(rx.recv().await.is_none());
    }
}
