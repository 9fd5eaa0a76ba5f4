//! Types for the catalog module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which elementary stream a descriptor carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    VideoOnly,
    AudioOnly,
}

impl MediaKind {
    /// Short label used in logs and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::VideoOnly => "video",
            Self::AudioOnly => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A format entry exactly as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFormat {
    /// Opaque stream identifier (itag).
    pub id: u32,
    pub has_video: bool,
    pub has_audio: bool,
    /// Container extension, e.g. "mp4", "webm", "m4a".
    pub container: String,
    /// Content length in bytes, when the catalog knows it.
    pub content_length: Option<u64>,
    /// Audio bitrate in kbps.
    pub audio_bitrate: Option<u32>,
    /// Direct media location, when the catalog resolved one.
    pub url: Option<String>,
}

/// Answer of a single catalog query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMediaInfo {
    pub title: String,
    pub formats: Vec<RawFormat>,
}

/// A compatible stream retained by the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub id: u32,
    pub kind: MediaKind,
    pub container: String,
    /// Label from the allow-list, e.g. "1080p60 (mp4/avc1)".
    pub quality_label: String,
    /// Resolution for video, kbps for audio. Higher is better.
    pub rank: u32,
    pub byte_length: Option<u64>,
    /// Measured average audio bitrate in kbps (audio descriptors only).
    /// Informational; below the nominal value for most streams.
    pub bitrate: Option<u32>,
    pub url: Option<String>,
}

impl StreamDescriptor {
    /// Nominal bitrate from the allow-list label ("160kbps" -> 160).
    pub fn source_bitrate_kbps(&self) -> u32 {
        self.rank
    }
}

/// Resolved media information for one job.
///
/// Both ranked lists are non-empty and sorted by rank, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub title: String,
    pub formats: Vec<RawFormat>,
    pub video: Vec<StreamDescriptor>,
    pub audio: Vec<StreamDescriptor>,
}

impl MediaInfo {
    /// Best-ranked video-only descriptor.
    pub fn best_video(&self) -> Option<&StreamDescriptor> {
        self.video.first()
    }

    /// Best-ranked audio-only descriptor.
    pub fn best_audio(&self) -> Option<&StreamDescriptor> {
        self.audio.first()
    }

    /// Looks up a ranked descriptor of the given kind by id.
    pub fn find(&self, kind: MediaKind, id: u32) -> Option<&StreamDescriptor> {
        let list = match kind {
            MediaKind::VideoOnly => &self.video,
            MediaKind::AudioOnly => &self.audio,
        };
        list.iter().find(|d| d.id == id)
    }
}
