//! Mux/transcode engine.
//!
//! This module provides the `Converter` trait and an FFmpeg implementation
//! covering the two shapes the pipeline needs:
//!
//! - **Merge**: a video-only and an audio-only file into one container. Video
//!   is always stream-copied; audio is copied, or re-encoded at 48 kHz when a
//!   higher bitrate was requested.
//! - **Extract audio**: one audio file to a compressed format chosen by the
//!   output extension.
//!
//! # Example
//!
//! ```ignore
//! use tubemux_core::converter::{Converter, FfmpegConverter, ConversionJob, ConversionKind};
//!
//! let converter = FfmpegConverter::with_defaults();
//! converter.validate().await?;
//!
//! let job = ConversionJob {
//!     job_id: "job-1".to_string(),
//!     kind: ConversionKind::ExtractAudio {
//!         input_path: PathBuf::from("/tmp/ws/audio.webm"),
//!         bitrate_kbps: 320,
//!     },
//!     output_path: PathBuf::from("/tmp/ws/out.mp3"),
//! };
//! let result = converter.convert(job).await?;
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use traits::Converter;
pub use types::{
    mp3_bitrate_choices, AudioFormat, AudioHandling, BitrateChoice, ConversionEvent,
    ConversionJob, ConversionKind, ConversionProgress, ConversionResult, TranscodeDecision,
    MP3_BITRATES_KBPS, STANDARD_SAMPLE_RATE_HZ,
};
