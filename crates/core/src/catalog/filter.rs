//! Allow-list filtering and ranking of catalog formats.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::{HashMap, HashSet};

use super::error::CatalogError;
use super::types::{MediaInfo, MediaKind, RawFormat, RawMediaInfo, StreamDescriptor};

static VIDEO_ALLOW_LIST: Lazy<HashMap<u32, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (299, "1080p60 (mp4/avc1)"),
        (298, "720p60 (mp4/avc1)"),
        (137, "1080p (mp4/avc1)"),
        (136, "720p (mp4/avc1)"),
        (135, "480p (mp4/avc1)"),
        (134, "360p (mp4/avc1)"),
        (133, "240p (mp4/avc1)"),
        (160, "144p (mp4/avc1)"),
        (303, "1080p60 (webm/vp9)"),
        (302, "720p60 (webm/vp9)"),
        (271, "1440p (webm/vp9)"),
        (313, "2160p (webm/vp9)"),
        (248, "1080p (webm/vp9)"),
        (247, "720p (webm/vp9)"),
        (244, "480p (webm/vp9)"),
        (243, "360p (webm/vp9)"),
        (242, "240p (webm/vp9)"),
        (278, "144p (webm/vp9)"),
    ])
});

static AUDIO_ALLOW_LIST: Lazy<HashMap<u32, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (141, "256kbps (m4a/mp4a)"),
        (251, "160kbps (webm/opus)"),
        (140, "128kbps (m4a/mp4a)"),
        (250, "70kbps (webm/opus)"),
    ])
});

static LEADING_NUMBER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\d+").ok());

/// Known-good video-only formats, id to quality label.
pub fn video_allow_list() -> &'static HashMap<u32, &'static str> {
    &VIDEO_ALLOW_LIST
}

/// Known-good audio-only formats, id to quality label.
pub fn audio_allow_list() -> &'static HashMap<u32, &'static str> {
    &AUDIO_ALLOW_LIST
}

/// Extracts the first integer of a quality label ("1080p60" -> 1080).
pub fn parse_rank(label: &str) -> Option<u32> {
    LEADING_NUMBER
        .as_ref()?
        .find(label)
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

fn classify(format: &RawFormat) -> Option<(MediaKind, &'static str)> {
    match (format.has_video, format.has_audio) {
        (true, false) => VIDEO_ALLOW_LIST
            .get(&format.id)
            .map(|label| (MediaKind::VideoOnly, *label)),
        (false, true) => AUDIO_ALLOW_LIST
            .get(&format.id)
            .map(|label| (MediaKind::AudioOnly, *label)),
        _ => None,
    }
}

fn describe(format: &RawFormat, kind: MediaKind, label: &str) -> Option<StreamDescriptor> {
    let rank = parse_rank(label)?;
    Some(StreamDescriptor {
        id: format.id,
        kind,
        container: format.container.clone(),
        quality_label: label.to_string(),
        rank,
        byte_length: format.content_length,
        bitrate: match kind {
            MediaKind::AudioOnly => format.audio_bitrate,
            MediaKind::VideoOnly => None,
        },
        url: format.url.clone(),
    })
}

/// Partitions raw formats into ranked video-only and audio-only lists.
///
/// Formats outside the allow-lists are dropped. Each list is sorted by rank,
/// best first; equal ranks keep catalog order. Fails when either list ends
/// up empty.
pub fn filter_formats(raw: RawMediaInfo) -> Result<MediaInfo, CatalogError> {
    let mut seen = HashSet::new();
    let mut video = Vec::new();
    let mut audio = Vec::new();

    for format in &raw.formats {
        let Some((kind, label)) = classify(format) else {
            continue;
        };
        if !seen.insert(format.id) {
            continue;
        }
        if let Some(descriptor) = describe(format, kind, label) {
            match kind {
                MediaKind::VideoOnly => video.push(descriptor),
                MediaKind::AudioOnly => audio.push(descriptor),
            }
        }
    }

    // sort_by is stable, so ties stay in catalog order
    video.sort_by(|a, b| b.rank.cmp(&a.rank));
    audio.sort_by(|a, b| b.rank.cmp(&a.rank));

    if video.is_empty() {
        return Err(CatalogError::NoCompatibleFormat {
            kind: MediaKind::VideoOnly.label().to_string(),
        });
    }
    if audio.is_empty() {
        return Err(CatalogError::NoCompatibleFormat {
            kind: MediaKind::AudioOnly.label().to_string(),
        });
    }

    Ok(MediaInfo {
        title: raw.title,
        formats: raw.formats,
        video,
        audio,
    })
}
