//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sample rate used whenever audio is re-encoded during a merge.
pub const STANDARD_SAMPLE_RATE_HZ: u32 = 48_000;

/// MP3 output bitrates offered for audio-only jobs, highest first.
pub const MP3_BITRATES_KBPS: [u32; 5] = [320, 256, 192, 160, 128];

/// Lossy audio output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    /// MPEG Audio Layer III
    Mp3,
    /// Advanced Audio Coding
    Aac,
    /// Ogg Vorbis
    OggVorbis,
    /// Opus
    Opus,
}

impl AudioFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Aac => "m4a",
            Self::OggVorbis => "ogg",
            Self::Opus => "opus",
        }
    }

    /// Returns the ffmpeg codec name for this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
            Self::Aac => "aac",
            Self::OggVorbis => "libvorbis",
            Self::Opus => "libopus",
        }
    }

    /// Picks the format from an output path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp3" => Some(Self::Mp3),
            "m4a" | "aac" => Some(Self::Aac),
            "ogg" => Some(Self::OggVorbis),
            "opus" => Some(Self::Opus),
            _ => None,
        }
    }
}

/// What happens to the audio stream during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum AudioHandling {
    /// Stream copy, untouched.
    Copy,
    /// Re-encode to the given bitrate and sample rate.
    Reencode {
        bitrate_kbps: u32,
        sample_rate_hz: u32,
    },
}

/// Whether the requested audio bitrate forces a re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeDecision {
    pub source_kbps: u32,
    pub requested_kbps: u32,
}

impl TranscodeDecision {
    /// A missing request keeps the source bitrate.
    pub fn new(source_kbps: u32, requested_kbps: Option<u32>) -> Self {
        Self {
            source_kbps,
            requested_kbps: requested_kbps.unwrap_or(source_kbps),
        }
    }

    pub fn needs_upscaling(&self) -> bool {
        self.requested_kbps > self.source_kbps
    }

    pub fn audio_handling(&self) -> AudioHandling {
        if self.needs_upscaling() {
            AudioHandling::Reencode {
                bitrate_kbps: self.requested_kbps,
                sample_rate_hz: STANDARD_SAMPLE_RATE_HZ,
            }
        } else {
            AudioHandling::Copy
        }
    }
}

/// One selectable MP3 bitrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BitrateChoice {
    pub kbps: u32,
    /// Higher than the source stream's bitrate.
    pub upscales: bool,
}

impl BitrateChoice {
    pub fn label(&self) -> String {
        if self.upscales {
            format!("{} kbps (will upscale)", self.kbps)
        } else {
            format!("{} kbps", self.kbps)
        }
    }
}

/// Lists the MP3 bitrates, flagging those above `source_kbps`.
pub fn mp3_bitrate_choices(source_kbps: u32) -> Vec<BitrateChoice> {
    MP3_BITRATES_KBPS
        .iter()
        .map(|&kbps| BitrateChoice {
            kbps,
            upscales: kbps > source_kbps,
        })
        .collect()
}

/// The two invocation shapes of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ConversionKind {
    /// Video stream copied, audio copied or re-encoded.
    Merge {
        video_path: PathBuf,
        audio_path: PathBuf,
        audio: AudioHandling,
    },
    /// Single audio input to a compressed file; format follows the output extension.
    ExtractAudio { input_path: PathBuf, bitrate_kbps: u32 },
}

/// A conversion job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Unique job identifier.
    pub job_id: String,
    pub kind: ConversionKind,
    pub output_path: PathBuf,
}

impl ConversionJob {
    /// Input files, in ffmpeg input order.
    pub fn inputs(&self) -> Vec<&Path> {
        match &self.kind {
            ConversionKind::Merge {
                video_path,
                audio_path,
                ..
            } => vec![video_path.as_path(), audio_path.as_path()],
            ConversionKind::ExtractAudio { input_path, .. } => vec![input_path.as_path()],
        }
    }

    /// Whether any audio is re-encoded by this job.
    pub fn reencodes_audio(&self) -> bool {
        match &self.kind {
            ConversionKind::Merge { audio, .. } => matches!(audio, AudioHandling::Reencode { .. }),
            ConversionKind::ExtractAudio { .. } => true,
        }
    }
}

/// Progress of a running conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionProgress {
    pub job_id: String,
    /// Completion in percent, when the tool's output allows computing it.
    pub percent: Option<f32>,
    /// Processed media time in seconds.
    pub time_secs: f64,
}

/// Events emitted while a conversion runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionEvent {
    /// The tool was spawned with this command line.
    Started { command: String },
    Progress(ConversionProgress),
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub job_id: String,
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    pub audio_reencoded: bool,
}
