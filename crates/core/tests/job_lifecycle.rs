//! Job lifecycle integration tests.
//!
//! These tests run whole jobs through the download pipeline with mock
//! catalog, transport and converter:
//! - Copy merge when the requested bitrate matches the source
//! - Audio-only extraction with an upscaled bitrate
//! - Catalog answers without a compatible stream
//! - Workspace removal after fetch and transcode failures

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use tubemux_core::{
    catalog::{MediaKind, RawMediaInfo},
    config::WorkspaceConfig,
    converter::{AudioHandling, ConversionKind, ConverterError},
    fetcher::FetchOptions,
    progress::{HiddenRenderer, ProgressRenderer},
    testing::{fixtures, MockCatalog, MockConverter, MockTransport},
    AudioJobRequest, DownloadPipeline, JobError, JobProgress, JobStage, PipelineConfig,
    VideoJobRequest,
};

const SOURCE: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Test helper wiring a pipeline to mocks and temp directories.
struct TestHarness {
    _temp_dir: TempDir,
    scratch_root: PathBuf,
    output_dir: PathBuf,
    catalog: MockCatalog,
    transport: MockTransport,
    converter: MockConverter,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let scratch_root = temp_dir.path().join("scratch");
        let output_dir = temp_dir.path().join("YouTube");
        std::fs::create_dir_all(&scratch_root).expect("Failed to create scratch root");

        Self {
            _temp_dir: temp_dir,
            scratch_root,
            output_dir,
            catalog: MockCatalog::new(),
            transport: MockTransport::new().with_chunk_size(64),
            converter: MockConverter::new(),
        }
    }

    fn pipeline(&self) -> DownloadPipeline<MockCatalog, MockTransport, MockConverter> {
        let config = PipelineConfig {
            output_dir: self.output_dir.clone(),
            workspace: WorkspaceConfig {
                temp_root: self.scratch_root.clone(),
                prefix: "tubemux_".to_string(),
            },
            fetch: FetchOptions {
                throttle: Duration::ZERO,
                channel_capacity: 2,
            },
        };

        DownloadPipeline::new(
            config,
            self.catalog.clone(),
            self.transport.clone(),
            self.converter.clone(),
        )
        .with_renderer_factory(Arc::new(|_: MediaKind| -> Box<dyn ProgressRenderer> {
            Box::new(HiddenRenderer)
        }))
    }

    async fn serve(&self, info: RawMediaInfo) {
        for format in &info.formats {
            if let Some(len) = format.content_length {
                self.transport
                    .set_payload(format.id, vec![format.id as u8; len as usize])
                    .await;
            }
        }
        self.catalog.set_info(info).await;
    }

    fn workspaces_left(&self) -> usize {
        std::fs::read_dir(&self.scratch_root)
            .expect("scratch root exists")
            .count()
    }

    fn outputs(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.output_dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn drain(rx: &mut mpsc::Receiver<JobProgress>) -> Vec<JobProgress> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_video_job_copy_merge() {
    let harness = TestHarness::new();
    harness
        .serve(fixtures::media_info(
            "Never Gonna Give You Up",
            vec![
                fixtures::video_format(137, 4000),
                fixtures::video_format(136, 2500),
                fixtures::audio_format(140, "m4a", 128, 900),
            ],
        ))
        .await;

    let mut request = VideoJobRequest::new(SOURCE);
    request.video_id = Some(136);
    request.audio_id = Some(140);
    request.target_bitrate_kbps = Some(128);

    let (tx, mut rx) = mpsc::channel(256);
    let outcome = harness
        .pipeline()
        .with_progress(tx)
        .run_video_job(request)
        .await
        .expect("job should succeed");

    let expected = harness.output_dir.join("Never Gonna Give You Up.mp4");
    assert_eq!(outcome.output_path, expected);
    assert!(expected.exists());
    assert_eq!(outcome.title, "Never Gonna Give You Up");
    assert!(!outcome.audio_reencoded);

    // Video first, then audio
    let requests = harness.transport.recorded_requests().await;
    let ids: Vec<u32> = requests.iter().map(|r| r.stream_id).collect();
    assert_eq!(ids, vec![136, 140]);

    let jobs = harness.converter.recorded_jobs().await;
    assert_eq!(jobs.len(), 1);
    match &jobs[0].kind {
        ConversionKind::Merge {
            video_path,
            audio_path,
            audio,
        } => {
            assert_eq!(*audio, AudioHandling::Copy);
            assert!(video_path.starts_with(&harness.scratch_root));
            assert!(audio_path.starts_with(&harness.scratch_root));
            assert_eq!(audio_path.extension().unwrap(), "m4a");
        }
        other => panic!("expected merge, got {:?}", other),
    }

    assert_eq!(harness.workspaces_left(), 0);
    assert_eq!(harness.catalog.query_count().await, 1);

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(JobProgress::ResolvingInfo { .. })));
    assert!(matches!(events.last(), Some(JobProgress::Completed { .. })));
    assert!(!events
        .iter()
        .any(|e| matches!(e, JobProgress::AudioUpscale { .. })));
}

#[tokio::test]
async fn test_audio_only_job_upscales() {
    let harness = TestHarness::new();
    harness
        .serve(fixtures::media_info(
            "Live Session",
            vec![
                fixtures::video_format(248, 3000),
                fixtures::audio_format(140, "m4a", 128, 700),
                fixtures::audio_format(251, "webm", 160, 800),
            ],
        ))
        .await;

    let outcome = harness
        .pipeline()
        .run_audio_only_job(AudioJobRequest::new(SOURCE, 320))
        .await
        .expect("job should succeed");

    assert_eq!(
        outcome.output_path,
        harness.output_dir.join("Live Session.mp3")
    );
    assert_eq!(outcome.audio_id, 251);
    assert!(outcome.audio_reencoded);

    let requests = harness.transport.recorded_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].stream_id, 251);

    let jobs = harness.converter.recorded_jobs().await;
    match &jobs[0].kind {
        ConversionKind::ExtractAudio {
            input_path,
            bitrate_kbps,
        } => {
            assert_eq!(*bitrate_kbps, 320);
            assert_eq!(input_path.extension().unwrap(), "webm");
        }
        other => panic!("expected extraction, got {:?}", other),
    }
    assert_eq!(harness.workspaces_left(), 0);
}

#[tokio::test]
async fn test_no_compatible_audio() {
    let harness = TestHarness::new();
    harness
        .serve(fixtures::media_info(
            "Muted",
            vec![fixtures::video_format(137, 4000), fixtures::muxed_format(18)],
        ))
        .await;

    let (tx, mut rx) = mpsc::channel(64);
    let err = harness
        .pipeline()
        .with_progress(tx)
        .run_video_job(VideoJobRequest::new(SOURCE))
        .await
        .unwrap_err();

    match &err {
        JobError::NoCompatibleFormat { kind } => assert_eq!(kind, "audio"),
        other => panic!("unexpected error: {}", other),
    }
    assert!(harness.transport.recorded_requests().await.is_empty());
    assert!(harness.converter.recorded_jobs().await.is_empty());
    assert_eq!(harness.workspaces_left(), 0);

    let events = drain(&mut rx);
    match events.last() {
        Some(JobProgress::Failed { stage, .. }) => assert_eq!(*stage, JobStage::Catalog),
        other => panic!("unexpected last event: {:?}", other),
    }
}

#[tokio::test]
async fn test_audio_fetch_failure_removes_workspace() {
    let harness = TestHarness::new();
    harness
        .serve(fixtures::media_info("Broken", fixtures::standard_formats()))
        .await;
    harness
        .transport
        .fail_stream(140, "connection reset by peer")
        .await;

    let err = harness
        .pipeline()
        .run_video_job(VideoJobRequest::new(SOURCE))
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::AudioFetchFailed(_)));
    assert_eq!(err.stage(), JobStage::AudioFetch);
    assert!(err.to_string().contains("connection reset by peer"));
    assert_eq!(harness.workspaces_left(), 0);
    assert!(harness.converter.recorded_jobs().await.is_empty());
    assert!(harness.outputs().is_empty());
}

#[tokio::test]
async fn test_transcode_failure_removes_workspace() {
    let harness = TestHarness::new();
    harness
        .serve(fixtures::media_info("Corrupt", fixtures::standard_formats()))
        .await;
    harness
        .converter
        .set_next_error(ConverterError::conversion_failed(
            "FFmpeg exited with code: Some(1)",
            Some("moov atom not found".to_string()),
        ))
        .await;

    let err = harness
        .pipeline()
        .run_video_job(VideoJobRequest::new(SOURCE))
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::TranscodeFailed(_)));
    assert!(err.to_string().contains("moov atom not found"));
    assert_eq!(harness.workspaces_left(), 0);
    assert!(harness.outputs().is_empty());
}

#[tokio::test]
async fn test_existing_output_is_replaced() {
    let harness = TestHarness::new();
    harness
        .serve(fixtures::media_info("Again", fixtures::standard_formats()))
        .await;
    std::fs::create_dir_all(&harness.output_dir).unwrap();
    std::fs::write(harness.output_dir.join("Again.mp4"), b"old").unwrap();

    let outcome = harness
        .pipeline()
        .run_video_job(VideoJobRequest::new(SOURCE))
        .await
        .expect("job should succeed");

    assert_ne!(std::fs::read(&outcome.output_path).unwrap(), b"old");
    assert_eq!(harness.outputs().len(), 1);
}

#[tokio::test]
async fn test_measured_bitrate_below_label_copies_audio() {
    let harness = TestHarness::new();
    harness
        .serve(fixtures::media_info(
            "AC/DC: Live @ Donington?",
            vec![
                fixtures::video_format(137, 4000),
                // labelled 160kbps, measured average lower
                fixtures::audio_format(251, "webm", 138, 800),
            ],
        ))
        .await;

    let mut request = VideoJobRequest::new(SOURCE);
    request.target_bitrate_kbps = Some(160);

    let (tx, mut rx) = mpsc::channel(256);
    let outcome = harness
        .pipeline()
        .with_progress(tx)
        .run_video_job(request)
        .await
        .expect("job should succeed");

    assert!(!outcome.audio_reencoded);
    assert_eq!(
        outcome.output_path,
        harness.output_dir.join("AC_DC_ Live _ Donington_.mp4")
    );
    assert_eq!(harness.outputs(), vec![outcome.output_path.clone()]);

    let jobs = harness.converter.recorded_jobs().await;
    match &jobs[0].kind {
        ConversionKind::Merge { audio, .. } => assert_eq!(*audio, AudioHandling::Copy),
        other => panic!("expected merge, got {:?}", other),
    }
    assert!(!drain(&mut rx)
        .iter()
        .any(|e| matches!(e, JobProgress::AudioUpscale { .. })));
}
