//! Types for the download pipeline.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::{CatalogError, MediaKind};
use crate::converter::{AudioFormat, ConverterError};
use crate::fetcher::FetchError;
use crate::publisher::PublishError;
use crate::workspace::WorkspaceError;

/// A video + audio job.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoJobRequest {
    pub source: String,
    /// Best ranked video when unset.
    pub video_id: Option<u32>,
    /// Best ranked audio when unset.
    pub audio_id: Option<u32>,
    /// Source bitrate is kept when unset.
    pub target_bitrate_kbps: Option<u32>,
    pub output_dir: Option<PathBuf>,
}

impl VideoJobRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            video_id: None,
            audio_id: None,
            target_bitrate_kbps: None,
            output_dir: None,
        }
    }
}

/// An audio-only job. The best ranked audio stream is always used.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioJobRequest {
    pub source: String,
    pub target_bitrate_kbps: u32,
    pub format: AudioFormat,
    pub output_dir: Option<PathBuf>,
}

impl AudioJobRequest {
    /// MP3 at the given bitrate.
    pub fn new(source: impl Into<String>, target_bitrate_kbps: u32) -> Self {
        Self {
            source: source.into(),
            target_bitrate_kbps,
            format: AudioFormat::Mp3,
            output_dir: None,
        }
    }
}

/// Result of a successful job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub title: String,
    pub output_path: PathBuf,
    pub size_bytes: u64,
    pub video_id: Option<u32>,
    pub audio_id: u32,
    pub audio_reencoded: bool,
}

/// Pipeline stage, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Workspace,
    Catalog,
    Selection,
    VideoFetch,
    AudioFetch,
    Transcode,
    Publish,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Workspace => "workspace",
            Self::Catalog => "catalog",
            Self::Selection => "selection",
            Self::VideoFetch => "video fetch",
            Self::AudioFetch => "audio fetch",
            Self::Transcode => "transcode",
            Self::Publish => "publish",
        })
    }
}

/// Errors that end a job. None of them is retried.
#[derive(Debug, Error)]
pub enum JobError {
    /// The catalog query failed.
    #[error("catalog lookup failed: {0}")]
    Catalog(CatalogError),

    /// No allow-listed stream of a required kind.
    #[error("catalog lookup failed: no compatible {kind} formats found")]
    NoCompatibleFormat { kind: String },

    /// The caller selected an id that is not among the ranked formats.
    #[error("format selection failed: {kind} format {id} is not available")]
    UnknownFormat { kind: MediaKind, id: u32 },

    /// The selected stream has no announced byte length.
    #[error("{} fetch failed: could not determine {kind} size", kind)]
    UnknownSize { kind: MediaKind },

    #[error("video fetch failed: {0}")]
    VideoFetchFailed(String),

    #[error("audio fetch failed: {0}")]
    AudioFetchFailed(String),

    /// The media tool failed; carries its diagnostic output.
    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("workspace setup failed: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("publishing output failed: {0}")]
    Publish(#[from] PublishError),
}

impl JobError {
    /// The stage the job failed in.
    pub fn stage(&self) -> JobStage {
        match self {
            Self::Catalog(_) | Self::NoCompatibleFormat { .. } => JobStage::Catalog,
            Self::UnknownFormat { .. } => JobStage::Selection,
            Self::UnknownSize {
                kind: MediaKind::VideoOnly,
            }
            | Self::VideoFetchFailed(_) => JobStage::VideoFetch,
            Self::UnknownSize {
                kind: MediaKind::AudioOnly,
            }
            | Self::AudioFetchFailed(_) => JobStage::AudioFetch,
            Self::TranscodeFailed(_) => JobStage::Transcode,
            Self::Workspace(_) => JobStage::Workspace,
            Self::Publish(_) => JobStage::Publish,
        }
    }
}

impl From<CatalogError> for JobError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NoCompatibleFormat { kind } => Self::NoCompatibleFormat { kind },
            other => Self::Catalog(other),
        }
    }
}

impl From<FetchError> for JobError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::UnknownSize { kind } => Self::UnknownSize { kind },
            FetchError::Failed {
                kind: MediaKind::VideoOnly,
                message,
            } => Self::VideoFetchFailed(message),
            FetchError::Failed {
                kind: MediaKind::AudioOnly,
                message,
            } => Self::AudioFetchFailed(message),
        }
    }
}

impl From<ConverterError> for JobError {
    fn from(err: ConverterError) -> Self {
        Self::TranscodeFailed(err.diagnostic())
    }
}

/// Events a running job reports.
#[derive(Debug, Clone, PartialEq)]
pub enum JobProgress {
    ResolvingInfo {
        job_id: String,
        source: String,
    },
    Resolved {
        job_id: String,
        title: String,
        video_formats: usize,
        audio_formats: usize,
    },
    /// The requested bitrate is above the source's; audio will be re-encoded.
    AudioUpscale {
        job_id: String,
        from_kbps: u32,
        to_kbps: u32,
    },
    Fetching {
        job_id: String,
        kind: MediaKind,
        stream_id: u32,
        total_bytes: Option<u64>,
    },
    Converting {
        job_id: String,
        percent: Option<f32>,
    },
    Publishing {
        job_id: String,
        destination: PathBuf,
    },
    Completed {
        job_id: String,
        output_path: PathBuf,
        size_bytes: u64,
    },
    Failed {
        job_id: String,
        stage: JobStage,
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names_stage_and_cause() {
        let err = JobError::from(FetchError::failed(MediaKind::AudioOnly, "reset by peer"));
        assert_eq!(err.stage(), JobStage::AudioFetch);
        assert_eq!(err.to_string(), "audio fetch failed: reset by peer");

        let err = JobError::from(FetchError::UnknownSize {
            kind: MediaKind::VideoOnly,
        });
        assert_eq!(err.stage(), JobStage::VideoFetch);
        assert_eq!(
            err.to_string(),
            "video fetch failed: could not determine video size"
        );
    }

    #[test]
    fn test_catalog_error_mapping() {
        let err = JobError::from(CatalogError::NoCompatibleFormat {
            kind: "audio".to_string(),
        });
        assert!(matches!(err, JobError::NoCompatibleFormat { .. }));
        assert_eq!(err.stage(), JobStage::Catalog);

        let err = JobError::from(CatalogError::query_failed("HTTP 429"));
        assert!(matches!(err, JobError::Catalog(_)));
    }

    #[test]
    fn test_converter_error_keeps_diagnostic() {
        let err = JobError::from(ConverterError::conversion_failed(
            "FFmpeg exited with code: Some(1)",
            Some("Invalid data found when processing input".to_string()),
        ));
        assert_eq!(err.stage(), JobStage::Transcode);
        assert!(err
            .to_string()
            .contains("Invalid data found when processing input"));
    }
}
