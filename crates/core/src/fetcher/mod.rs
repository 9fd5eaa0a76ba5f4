//! Stream fetcher: one remote stream to one local file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::catalog::MediaKind;
use crate::progress::{ProgressRenderer, ProgressTracker};
use crate::transport::{StreamRequest, StreamTransport, TransportEvent};

/// Errors that can occur while fetching a stream.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The catalog did not announce a byte length, so the fetch cannot start.
    #[error("could not determine {kind} size")]
    UnknownSize { kind: MediaKind },

    /// Transport or write failure.
    #[error("{kind} download failed: {message}")]
    Failed { kind: MediaKind, message: String },
}

impl FetchError {
    pub fn failed(kind: MediaKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    /// Which stream the failure belongs to.
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::UnknownSize { kind } | Self::Failed { kind, .. } => *kind,
        }
    }
}

/// Tuning for a single fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub throttle: Duration,
    pub channel_capacity: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            throttle: Duration::from_millis(500),
            channel_capacity: 64,
        }
    }
}

/// A completed fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Pulls one stream to `destination`, reporting progress through `renderer`.
///
/// Resolves only after the file has been flushed and synced. The tracker is
/// finished on every path, including failures.
pub async fn fetch_stream<T>(
    transport: &T,
    request: StreamRequest,
    kind: MediaKind,
    destination: &Path,
    renderer: Box<dyn ProgressRenderer>,
    options: &FetchOptions,
) -> Result<FetchResult, FetchError>
where
    T: StreamTransport + ?Sized,
{
    let total = request
        .expected_bytes
        .filter(|b| *b > 0)
        .ok_or(FetchError::UnknownSize { kind })?;
    let mut tracker = ProgressTracker::with_throttle(total, options.throttle, renderer)
        .map_err(|_| FetchError::UnknownSize { kind })?;

    let file = match File::create(destination).await {
        Ok(file) => file,
        Err(e) => {
            tracker.finish();
            return Err(FetchError::failed(
                kind,
                format!("cannot create {}: {}", destination.display(), e),
            ));
        }
    };

    debug!(
        "Fetching {} stream {} ({} bytes) to {:?}",
        kind, request.stream_id, total, destination
    );

    let (tx, mut rx) = mpsc::channel(options.channel_capacity.max(1));
    let producer = transport.transfer(request, tx);
    let consumer = async move {
        let result = write_events(&mut rx, file, &mut tracker).await;
        (tracker, result)
    };

    let (transfer_result, (mut tracker, write_result)) = tokio::join!(producer, consumer);
    tracker.finish();

    let bytes_written = match (transfer_result, write_result) {
        (_, Err(e)) => {
            return Err(FetchError::failed(
                kind,
                format!("write to {} failed: {}", destination.display(), e),
            ))
        }
        (Err(e), Ok(_)) => return Err(FetchError::failed(kind, e.to_string())),
        (Ok(()), Ok(written)) => written,
    };

    if bytes_written != total {
        warn!(
            "{} stream wrote {} bytes, catalog announced {}",
            kind, bytes_written, total
        );
    }

    Ok(FetchResult {
        path: destination.to_path_buf(),
        bytes_written,
    })
}

async fn write_events(
    rx: &mut mpsc::Receiver<TransportEvent>,
    file: File,
    tracker: &mut ProgressTracker,
) -> std::io::Result<u64> {
    let mut writer = BufWriter::new(file);
    let mut written = 0u64;

    while let Some(event) = rx.recv().await {
        match event {
            TransportEvent::Chunk(bytes) => {
                writer.write_all(&bytes).await?;
                written += bytes.len() as u64;
            }
            TransportEvent::Progress { downloaded, .. } => {
                tracker.update(downloaded);
            }
        }
    }

    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    Ok(written)
}
