//! Download pipeline implementation.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::catalog::{filter_formats, CatalogClient, MediaInfo, MediaKind, StreamDescriptor};
use crate::converter::{
    ConversionEvent, ConversionJob, ConversionKind, ConversionResult, Converter,
    TranscodeDecision,
};
use crate::fetcher::{fetch_stream, FetchResult};
use crate::publisher::{output_path, publish, PublishError};
use crate::transport::{StreamRequest, StreamTransport};
use crate::workspace::Workspace;

use super::config::{renderer_factory, PipelineConfig, RendererFactory};
use super::types::{AudioJobRequest, JobError, JobOutcome, JobProgress, VideoJobRequest};

/// Container of the merged output.
const MERGED_EXTENSION: &str = "mp4";

/// Runs download jobs against a catalog, a transport and a converter.
pub struct DownloadPipeline<Cat, T, C>
where
    Cat: CatalogClient,
    T: StreamTransport,
    C: Converter,
{
    config: PipelineConfig,
    catalog: Cat,
    transport: T,
    converter: C,
    renderers: RendererFactory,
    progress_tx: Option<mpsc::Sender<JobProgress>>,
}

impl<Cat, T, C> DownloadPipeline<Cat, T, C>
where
    Cat: CatalogClient,
    T: StreamTransport,
    C: Converter,
{
    /// Creates a pipeline rendering fetch progress as terminal bars.
    pub fn new(config: PipelineConfig, catalog: Cat, transport: T, converter: C) -> Self {
        Self {
            config,
            catalog,
            transport,
            converter,
            renderers: renderer_factory(Default::default()),
            progress_tx: None,
        }
    }

    pub fn with_renderer_factory(mut self, renderers: RendererFactory) -> Self {
        self.renderers = renderers;
        self
    }

    /// Reports job events on `tx`.
    pub fn with_progress(mut self, tx: mpsc::Sender<JobProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Queries the catalog once and filters the answer.
    pub async fn resolve_media_info(&self, source: &str) -> Result<MediaInfo, JobError> {
        debug!("Querying {} for {}", self.catalog.name(), source);
        let raw = self.catalog.get_info(source).await?;
        let info = filter_formats(raw)?;
        debug!(
            "Resolved '{}': {} video, {} audio formats",
            info.title,
            info.video.len(),
            info.audio.len()
        );
        Ok(info)
    }

    /// Downloads video and audio and merges them into `<title>.mp4`.
    pub async fn run_video_job(&self, request: VideoJobRequest) -> Result<JobOutcome, JobError> {
        let job_id = Uuid::new_v4().to_string();
        info!("Starting video job {} for {}", job_id, request.source);

        let result = match self.acquire_workspace().await {
            Ok(workspace) => {
                let result = self.video_job(&job_id, &request, &workspace).await;
                workspace.release().await;
                result
            }
            Err(e) => Err(e),
        };

        self.report_outcome(&job_id, &result).await;
        result
    }

    /// Downloads the best audio stream and compresses it to the requested format.
    pub async fn run_audio_only_job(
        &self,
        request: AudioJobRequest,
    ) -> Result<JobOutcome, JobError> {
        let job_id = Uuid::new_v4().to_string();
        info!("Starting audio job {} for {}", job_id, request.source);

        let result = match self.acquire_workspace().await {
            Ok(workspace) => {
                let result = self.audio_job(&job_id, &request, &workspace).await;
                workspace.release().await;
                result
            }
            Err(e) => Err(e),
        };

        self.report_outcome(&job_id, &result).await;
        result
    }

    async fn video_job(
        &self,
        job_id: &str,
        request: &VideoJobRequest,
        workspace: &Workspace,
    ) -> Result<JobOutcome, JobError> {
        let info = self.resolve(job_id, &request.source).await?;

        let video = select(&info, MediaKind::VideoOnly, request.video_id)?;
        let audio = select(&info, MediaKind::AudioOnly, request.audio_id)?;
        info!(
            "Selected video {} [{}] and audio {} [{}]",
            video.id, video.quality_label, audio.id, audio.quality_label
        );

        let decision =
            TranscodeDecision::new(audio.source_bitrate_kbps(), request.target_bitrate_kbps);
        self.note_upscale(job_id, &decision).await;

        let destination_dir = self.prepare_output_dir(request.output_dir.as_deref()).await?;

        let video_file = self
            .fetch(job_id, &request.source, video, workspace.scratch_file(MERGED_EXTENSION))
            .await?;
        let audio_file = self
            .fetch(job_id, &request.source, audio, workspace.scratch_file(&audio.container))
            .await?;

        let job = ConversionJob {
            job_id: job_id.to_string(),
            kind: ConversionKind::Merge {
                video_path: video_file.path,
                audio_path: audio_file.path,
                audio: decision.audio_handling(),
            },
            output_path: workspace.scratch_file(MERGED_EXTENSION),
        };
        let converted = self.convert(job_id, job).await?;

        let destination = output_path(&destination_dir, &info.title, MERGED_EXTENSION);
        self.finish(job_id, &info.title, converted, destination, Some(video.id), audio.id)
            .await
    }

    async fn audio_job(
        &self,
        job_id: &str,
        request: &AudioJobRequest,
        workspace: &Workspace,
    ) -> Result<JobOutcome, JobError> {
        let info = self.resolve(job_id, &request.source).await?;

        let audio = select(&info, MediaKind::AudioOnly, None)?;
        info!("Selected audio {} [{}]", audio.id, audio.quality_label);

        let decision = TranscodeDecision::new(
            audio.source_bitrate_kbps(),
            Some(request.target_bitrate_kbps),
        );
        self.note_upscale(job_id, &decision).await;

        let destination_dir = self.prepare_output_dir(request.output_dir.as_deref()).await?;

        let audio_file = self
            .fetch(job_id, &request.source, audio, workspace.scratch_file(&audio.container))
            .await?;

        let extension = request.format.extension();
        let job = ConversionJob {
            job_id: job_id.to_string(),
            kind: ConversionKind::ExtractAudio {
                input_path: audio_file.path,
                bitrate_kbps: request.target_bitrate_kbps,
            },
            output_path: workspace.scratch_file(extension),
        };
        let converted = self.convert(job_id, job).await?;

        let destination = output_path(&destination_dir, &info.title, extension);
        self.finish(job_id, &info.title, converted, destination, None, audio.id)
            .await
    }

    async fn acquire_workspace(&self) -> Result<Workspace, JobError> {
        let workspace = &self.config.workspace;
        Ok(Workspace::acquire(&workspace.temp_root, &workspace.prefix).await?)
    }

    async fn resolve(&self, job_id: &str, source: &str) -> Result<MediaInfo, JobError> {
        self.emit(JobProgress::ResolvingInfo {
            job_id: job_id.to_string(),
            source: source.to_string(),
        })
        .await;

        let info = self.resolve_media_info(source).await?;

        self.emit(JobProgress::Resolved {
            job_id: job_id.to_string(),
            title: info.title.clone(),
            video_formats: info.video.len(),
            audio_formats: info.audio.len(),
        })
        .await;
        Ok(info)
    }

    async fn note_upscale(&self, job_id: &str, decision: &TranscodeDecision) {
        if !decision.needs_upscaling() {
            return;
        }
        info!(
            "Audio will be upscaled from {} kbps to {} kbps",
            decision.source_kbps, decision.requested_kbps
        );
        self.emit(JobProgress::AudioUpscale {
            job_id: job_id.to_string(),
            from_kbps: decision.source_kbps,
            to_kbps: decision.requested_kbps,
        })
        .await;
    }

    async fn prepare_output_dir(&self, requested: Option<&Path>) -> Result<PathBuf, JobError> {
        let dir = requested
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.output_dir.clone());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PublishError::DirectoryCreationFailed {
                path: dir.clone(),
                source: e,
            })?;
        Ok(dir)
    }

    async fn fetch(
        &self,
        job_id: &str,
        source: &str,
        descriptor: &StreamDescriptor,
        destination: PathBuf,
    ) -> Result<FetchResult, JobError> {
        self.emit(JobProgress::Fetching {
            job_id: job_id.to_string(),
            kind: descriptor.kind,
            stream_id: descriptor.id,
            total_bytes: descriptor.byte_length,
        })
        .await;

        let request = StreamRequest::for_descriptor(source, descriptor);
        let renderer = (self.renderers)(descriptor.kind);
        let fetched = fetch_stream(
            &self.transport,
            request,
            descriptor.kind,
            &destination,
            renderer,
            &self.config.fetch,
        )
        .await?;

        info!(
            "Fetched {} stream {} ({} bytes)",
            descriptor.kind, descriptor.id, fetched.bytes_written
        );
        Ok(fetched)
    }

    async fn convert(&self, job_id: &str, job: ConversionJob) -> Result<ConversionResult, JobError> {
        self.emit(JobProgress::Converting {
            job_id: job_id.to_string(),
            percent: None,
        })
        .await;

        let Some(progress_tx) = &self.progress_tx else {
            return Ok(self.converter.convert(job).await?);
        };

        let (tx, mut rx) = mpsc::channel(32);
        let forward = async {
            while let Some(event) = rx.recv().await {
                match event {
                    ConversionEvent::Started { command } => {
                        debug!("Converter started: {}", command);
                    }
                    ConversionEvent::Progress(p) => {
                        let _ = progress_tx.try_send(JobProgress::Converting {
                            job_id: job_id.to_string(),
                            percent: p.percent,
                        });
                    }
                }
            }
        };

        let (result, ()) = tokio::join!(self.converter.convert_with_progress(job, tx), forward);
        Ok(result?)
    }

    async fn finish(
        &self,
        job_id: &str,
        title: &str,
        converted: ConversionResult,
        destination: PathBuf,
        video_id: Option<u32>,
        audio_id: u32,
    ) -> Result<JobOutcome, JobError> {
        self.emit(JobProgress::Publishing {
            job_id: job_id.to_string(),
            destination: destination.clone(),
        })
        .await;

        let published = publish(&converted.output_path, &destination).await?;

        Ok(JobOutcome {
            job_id: job_id.to_string(),
            title: title.to_string(),
            output_path: published.path,
            size_bytes: published.size_bytes,
            video_id,
            audio_id,
            audio_reencoded: converted.audio_reencoded,
        })
    }

    async fn report_outcome(&self, job_id: &str, result: &Result<JobOutcome, JobError>) {
        match result {
            Ok(outcome) => {
                info!(
                    "Job {} completed: {}",
                    job_id,
                    outcome.output_path.display()
                );
                self.emit(JobProgress::Completed {
                    job_id: job_id.to_string(),
                    output_path: outcome.output_path.clone(),
                    size_bytes: outcome.size_bytes,
                })
                .await;
            }
            Err(e) => {
                error!("Job {} failed: {}", job_id, e);
                self.emit(JobProgress::Failed {
                    job_id: job_id.to_string(),
                    stage: e.stage(),
                    error: e.to_string(),
                })
                .await;
            }
        }
    }

    async fn emit(&self, event: JobProgress) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(event).await;
        }
    }
}

/// Picks the descriptor with `id`, or the best ranked one.
fn select(
    info: &MediaInfo,
    kind: MediaKind,
    id: Option<u32>,
) -> Result<&StreamDescriptor, JobError> {
    let selected = match id {
        Some(id) => info.find(kind, id),
        None => match kind {
            MediaKind::VideoOnly => info.best_video(),
            MediaKind::AudioOnly => info.best_audio(),
        },
    };
    selected.ok_or(JobError::UnknownFormat {
        kind,
        id: id.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RawFormat, RawMediaInfo};
    use crate::config::WorkspaceConfig;
    use crate::converter::AudioHandling;
    use crate::fetcher::FetchOptions;
    use crate::orchestrator::JobStage;
    use crate::progress::{HiddenRenderer, ProgressRenderer};
    use crate::testing::{fixtures, MockCatalog, MockConverter, MockTransport};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        _temp: TempDir,
        scratch_root: PathBuf,
        output_dir: PathBuf,
        catalog: MockCatalog,
        transport: MockTransport,
        converter: MockConverter,
    }

    impl Harness {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let scratch_root = temp.path().join("scratch");
            let output_dir = temp.path().join("out");
            std::fs::create_dir_all(&scratch_root).unwrap();
            Self {
                _temp: temp,
                scratch_root,
                output_dir,
                catalog: MockCatalog::new(),
                transport: MockTransport::new(),
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
                    channel_capacity: 4,
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

        fn scratch_entries(&self) -> usize {
            std::fs::read_dir(&self.scratch_root).unwrap().count()
        }
    }

    #[tokio::test]
    async fn test_video_job_copies_audio_when_bitrate_matches() {
        let h = Harness::new();
        h.catalog
            .set_info(fixtures::media_info("Test Video", fixtures::standard_formats()))
            .await;
        h.transport.set_payload(136, vec![1u8; 300]).await;
        h.transport.set_payload(140, vec![2u8; 100]).await;

        let mut request = VideoJobRequest::new("https://example.com/watch?v=abc");
        request.video_id = Some(136);
        request.audio_id = Some(140);
        request.target_bitrate_kbps = Some(128);

        let outcome = h.pipeline().run_video_job(request).await.unwrap();

        assert_eq!(outcome.output_path, h.output_dir.join("Test Video.mp4"));
        assert!(outcome.output_path.exists());
        assert!(!outcome.audio_reencoded);

        let jobs = h.converter.recorded_jobs().await;
        assert_eq!(jobs.len(), 1);
        match &jobs[0].kind {
            ConversionKind::Merge { audio, .. } => assert_eq!(*audio, AudioHandling::Copy),
            other => panic!("unexpected conversion: {:?}", other),
        }
        assert_eq!(h.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_video_job_reencodes_on_upscale() {
        let h = Harness::new();
        h.catalog
            .set_info(fixtures::media_info("Upscaled", fixtures::standard_formats()))
            .await;
        h.transport.set_payload(137, vec![1u8; 400]).await;
        h.transport.set_payload(140, vec![2u8; 100]).await;

        let mut request = VideoJobRequest::new("src");
        request.audio_id = Some(140);
        request.target_bitrate_kbps = Some(320);

        let (tx, mut rx) = mpsc::channel(64);
        let outcome = h
            .pipeline()
            .with_progress(tx)
            .run_video_job(request)
            .await
            .unwrap();

        assert_eq!(outcome.video_id, Some(137));
        assert!(outcome.audio_reencoded);

        let mut saw_upscale = false;
        while let Ok(event) = rx.try_recv() {
            if let JobProgress::AudioUpscale {
                from_kbps, to_kbps, ..
            } = event
            {
                assert_eq!((from_kbps, to_kbps), (128, 320));
                saw_upscale = true;
            }
        }
        assert!(saw_upscale);
    }

    #[tokio::test]
    async fn test_unknown_format_id() {
        let h = Harness::new();
        h.catalog
            .set_info(fixtures::media_info("Video", fixtures::standard_formats()))
            .await;

        let mut request = VideoJobRequest::new("src");
        request.video_id = Some(22);

        let err = h.pipeline().run_video_job(request).await.unwrap_err();
        assert!(matches!(
            err,
            JobError::UnknownFormat {
                kind: MediaKind::VideoOnly,
                id: 22
            }
        ));
        assert_eq!(err.stage(), JobStage::Selection);
        assert!(h.transport.recorded_requests().await.is_empty());
        assert_eq!(h.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_catalog_failure_releases_workspace() {
        let h = Harness::new();
        h.catalog
            .set_next_error(crate::catalog::CatalogError::query_failed("unavailable"))
            .await;

        let err = h
            .pipeline()
            .run_video_job(VideoJobRequest::new("src"))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), JobStage::Catalog);
        assert_eq!(h.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_missing_size_fails_fetch() {
        let h = Harness::new();
        let mut formats = fixtures::standard_formats();
        for f in formats.iter_mut().filter(|f| f.id == 137) {
            f.content_length = None;
        }
        h.catalog
            .set_info(RawMediaInfo {
                title: "No Size".to_string(),
                formats,
            })
            .await;

        let err = h
            .pipeline()
            .run_video_job(VideoJobRequest::new("src"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            JobError::UnknownSize {
                kind: MediaKind::VideoOnly
            }
        ));
        assert_eq!(h.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_audio_job_extracts_mp3() {
        let h = Harness::new();
        h.catalog
            .set_info(fixtures::media_info(
                "Song: Live?",
                vec![
                    fixtures::video_format(136, 300),
                    fixtures::audio_format(251, "webm", 160, 120),
                    fixtures::audio_format(140, "m4a", 128, 100),
                ],
            ))
            .await;
        h.transport.set_payload(251, vec![3u8; 120]).await;

        let outcome = h
            .pipeline()
            .run_audio_only_job(AudioJobRequest::new("src", 192))
            .await
            .unwrap();

        assert_eq!(outcome.output_path, h.output_dir.join("Song_ Live_.mp3"));
        assert_eq!(outcome.audio_id, 251);
        assert_eq!(outcome.video_id, None);

        let jobs = h.converter.recorded_jobs().await;
        assert!(matches!(
            jobs[0].kind,
            ConversionKind::ExtractAudio {
                bitrate_kbps: 192,
                ..
            }
        ));
        assert!(jobs[0].output_path.to_string_lossy().ends_with(".mp3"));
        let requests = h.transport.recorded_requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].stream_id, 251);
    }

    #[test]
    fn test_select_defaults_to_best() {
        let info = filter_formats(RawMediaInfo {
            title: "t".to_string(),
            formats: vec![
                RawFormat {
                    id: 135,
                    has_video: true,
                    has_audio: false,
                    container: "mp4".to_string(),
                    content_length: Some(1),
                    audio_bitrate: None,
                    url: None,
                },
                fixtures::video_format(137, 10),
                fixtures::audio_format(140, "m4a", 128, 5),
            ],
        })
        .unwrap();

        assert_eq!(select(&info, MediaKind::VideoOnly, None).unwrap().id, 137);
        assert_eq!(select(&info, MediaKind::VideoOnly, Some(135)).unwrap().id, 135);
        assert!(select(&info, MediaKind::AudioOnly, Some(141)).is_err());
    }
}
