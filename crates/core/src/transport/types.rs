//! Types for the transport module.

use bytes::Bytes;

use crate::catalog::StreamDescriptor;

/// What to pull.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub source: String,
    pub stream_id: u32,
    pub url: Option<String>,
    /// Byte total announced by the catalog.
    pub expected_bytes: Option<u64>,
}

impl StreamRequest {
    pub fn for_descriptor(source: &str, descriptor: &StreamDescriptor) -> Self {
        Self {
            source: source.to_string(),
            stream_id: descriptor.id,
            url: descriptor.url.clone(),
            expected_bytes: descriptor.byte_length,
        }
    }
}

/// One event of a running transfer.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Chunk(Bytes),
    Progress { downloaded: u64, total: u64 },
}
