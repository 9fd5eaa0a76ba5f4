//! Testing utilities and mock implementations.
//!
//! Mocks for every collaborator the pipeline talks to, so that whole jobs
//! can run without network access or an ffmpeg binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use tubemux_core::testing::{fixtures, MockCatalog, MockConverter, MockTransport};
//!
//! let catalog = MockCatalog::new();
//! catalog.set_info(fixtures::media_info("Title", fixtures::standard_formats())).await;
//!
//! let transport = MockTransport::new();
//! transport.set_payload(137, vec![0u8; 4000]).await;
//! ```

mod mock_catalog;
mod mock_converter;
mod mock_transport;
mod recording_renderer;

pub use mock_catalog::MockCatalog;
pub use mock_converter::MockConverter;
pub use mock_transport::MockTransport;
pub use recording_renderer::RecordingRenderer;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::{RawFormat, RawMediaInfo};

    /// A video-only format with a known byte length.
    pub fn video_format(id: u32, content_length: u64) -> RawFormat {
        RawFormat {
            id,
            has_video: true,
            has_audio: false,
            container: "mp4".to_string(),
            content_length: Some(content_length),
            audio_bitrate: None,
            url: Some(format!("https://media.example.com/{}", id)),
        }
    }

    /// An audio-only format with a known byte length.
    pub fn audio_format(id: u32, container: &str, bitrate_kbps: u32, content_length: u64) -> RawFormat {
        RawFormat {
            id,
            has_video: false,
            has_audio: true,
            container: container.to_string(),
            content_length: Some(content_length),
            audio_bitrate: Some(bitrate_kbps),
            url: Some(format!("https://media.example.com/{}", id)),
        }
    }

    /// A muxed format; never retained by the filter.
    pub fn muxed_format(id: u32) -> RawFormat {
        RawFormat {
            id,
            has_video: true,
            has_audio: true,
            container: "mp4".to_string(),
            content_length: Some(1000),
            audio_bitrate: Some(96),
            url: None,
        }
    }

    /// 1080p and 720p video, 128k audio, plus a muxed entry.
    ///
    /// Byte lengths: 137 = 400, 136 = 300, 140 = 100.
    pub fn standard_formats() -> Vec<RawFormat> {
        vec![
            muxed_format(18),
            video_format(136, 300),
            video_format(137, 400),
            audio_format(140, "m4a", 128, 100),
        ]
    }

    pub fn media_info(title: &str, formats: Vec<RawFormat>) -> RawMediaInfo {
        RawMediaInfo {
            title: title.to_string(),
            formats,
        }
    }
}
