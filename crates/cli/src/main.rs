use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubemux_core::catalog::StreamDescriptor;
use tubemux_core::converter::mp3_bitrate_choices;
use tubemux_core::orchestrator::renderer_factory;
use tubemux_core::progress::format_size;
use tubemux_core::{
    load_config, load_default_config, validate_config, AudioJobRequest, Config, Converter,
    DownloadPipeline, FfmpegConverter, HttpTransport, JobOutcome, JobProgress, PipelineConfig,
    VideoJobRequest, YtDlpCatalog,
};

/// Buffer size for the job progress channel
const PROGRESS_BUFFER_SIZE: usize = 64;

#[derive(Debug, Parser)]
#[command(name = "tubemux", version, about = "Download and mux video streams")]
struct Cli {
    /// Output directory (overrides the configuration)
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download video and audio and merge them into an MP4
    Video {
        url: String,
        /// Video format id (best available when omitted)
        #[arg(long)]
        video_format: Option<u32>,
        /// Audio format id (best available when omitted)
        #[arg(long)]
        audio_format: Option<u32>,
        /// Target audio bitrate in kbps (source bitrate when omitted)
        #[arg(long)]
        bitrate: Option<u32>,
    },
    /// Download the best audio stream and convert it to MP3
    Audio {
        url: String,
        /// MP3 bitrate in kbps
        #[arg(long, default_value_t = 320)]
        bitrate: u32,
    },
    /// List the compatible formats of a video
    Formats { url: String },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_default_config().context("Failed to load default configuration")?,
    };
    if let Some(output) = cli.output {
        config.output.directory = Some(output);
    }
    validate_config(&config).context("Configuration validation failed")?;

    let pipeline = build_pipeline(&config)?;

    match cli.command {
        Command::Formats { url } => list_formats(&pipeline, &url).await,
        Command::Video {
            url,
            video_format,
            audio_format,
            bitrate,
        } => {
            ensure_converter(&pipeline_converter(&config)).await?;
            let mut request = VideoJobRequest::new(url);
            request.video_id = video_format;
            request.audio_id = audio_format;
            request.target_bitrate_kbps = bitrate;

            let (pipeline, reporter) = attach_reporter(pipeline);
            let outcome = pipeline.run_video_job(request).await;
            drop(pipeline);
            let _ = reporter.await;
            print_outcome(&outcome?);
            Ok(())
        }
        Command::Audio { url, bitrate } => {
            ensure_converter(&pipeline_converter(&config)).await?;
            let request = AudioJobRequest::new(url, bitrate);

            let (pipeline, reporter) = attach_reporter(pipeline);
            let outcome = pipeline.run_audio_only_job(request).await;
            drop(pipeline);
            let _ = reporter.await;
            print_outcome(&outcome?);
            Ok(())
        }
    }
}

type Pipeline = DownloadPipeline<YtDlpCatalog, HttpTransport, FfmpegConverter>;

fn pipeline_converter(config: &Config) -> FfmpegConverter {
    FfmpegConverter::new(config.converter.clone())
}

fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let catalog = YtDlpCatalog::new(config.catalog.clone());
    let transport =
        HttpTransport::new(&config.transport).context("Failed to create HTTP transport")?;
    let pipeline = DownloadPipeline::new(
        PipelineConfig::from_config(config),
        catalog,
        transport,
        pipeline_converter(config),
    )
    .with_renderer_factory(renderer_factory(config.progress.style));

    info!(
        "Output directory: {}",
        pipeline.config().output_dir.display()
    );
    Ok(pipeline)
}

async fn ensure_converter(converter: &FfmpegConverter) -> Result<()> {
    converter
        .validate()
        .await
        .context("ffmpeg is not available; install it or set converter.ffmpeg_path")?;
    info!("Using converter: {}", converter.name());
    Ok(())
}

/// Wires a progress channel into the pipeline and spawns its printer.
fn attach_reporter(pipeline: Pipeline) -> (Pipeline, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(PROGRESS_BUFFER_SIZE);
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            report(&event);
        }
    });
    (pipeline.with_progress(tx), handle)
}

fn report(event: &JobProgress) {
    match event {
        JobProgress::ResolvingInfo { source, .. } => info!("Fetching video information for {}", source),
        JobProgress::Resolved {
            title,
            video_formats,
            audio_formats,
            ..
        } => info!(
            "Title: {} ({} video, {} audio formats)",
            title, video_formats, audio_formats
        ),
        JobProgress::AudioUpscale {
            from_kbps, to_kbps, ..
        } => info!(
            "Audio will be re-encoded from {} kbps to {} kbps",
            from_kbps, to_kbps
        ),
        JobProgress::Fetching {
            kind, stream_id, ..
        } => info!("Downloading {} stream {}", kind, stream_id),
        JobProgress::Converting {
            percent: Some(p), ..
        } => info!("Processing: {:.1}%", p),
        JobProgress::Converting { percent: None, .. } => info!("Processing media"),
        JobProgress::Publishing { destination, .. } => {
            info!("Saving to {}", destination.display())
        }
        JobProgress::Completed { .. } | JobProgress::Failed { .. } => {}
    }
}

fn print_outcome(outcome: &JobOutcome) {
    println!(
        "Saved {} ({})",
        outcome.output_path.display(),
        format_size(outcome.size_bytes as f64)
    );
}

async fn list_formats(pipeline: &Pipeline, url: &str) -> Result<()> {
    let info = pipeline
        .resolve_media_info(url)
        .await
        .context("Failed to fetch video information")?;

    println!("{}", info.title);
    println!();
    println!("Video formats:");
    for descriptor in &info.video {
        println!("  {}", describe(descriptor));
    }
    println!("Audio formats:");
    for descriptor in &info.audio {
        println!("  {}", describe(descriptor));
    }

    if let Some(best) = info.best_audio() {
        println!();
        println!("MP3 bitrates (source {} kbps):", best.source_bitrate_kbps());
        for choice in mp3_bitrate_choices(best.source_bitrate_kbps()) {
            println!("  {}", choice.label());
        }
    }
    Ok(())
}

fn describe(descriptor: &StreamDescriptor) -> String {
    let size = descriptor
        .byte_length
        .map(|b| format_size(b as f64))
        .unwrap_or_else(|| "unknown size".to_string());
    format!("{:>4}  {:<22} {}", descriptor.id, descriptor.quality_label, size)
}
