//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;
use super::types::{
    AudioFormat, AudioHandling, ConversionEvent, ConversionJob, ConversionKind,
    ConversionProgress, ConversionResult,
};

/// Number of diagnostic stderr lines kept for error reports.
const DIAGNOSTIC_TAIL: usize = 20;

static DURATION_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"Duration: (\d+):(\d{2}):(\d{2}(?:\.\d+)?)").ok());
static OUT_TIME_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^out_time_(?:us|ms)=(\d+)$").ok());
static PROGRESS_KEY_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-z_0-9]+=\S*$").ok());

/// FFmpeg-based converter implementation.
pub struct FfmpegConverter {
    config: ConverterConfig,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Builds ffmpeg arguments for a video + audio merge.
    fn build_merge_args(
        &self,
        video_path: &Path,
        audio_path: &Path,
        audio: &AudioHandling,
        output_path: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-nostdin".to_string(),
            "-i".to_string(),
            video_path.to_string_lossy().to_string(),
            "-i".to_string(),
            audio_path.to_string_lossy().to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
        ];

        match audio {
            AudioHandling::Copy => {
                args.extend(["-c:a".to_string(), "copy".to_string()]);
            }
            AudioHandling::Reencode {
                bitrate_kbps,
                sample_rate_hz,
            } => {
                args.extend([
                    "-c:a".to_string(),
                    AudioFormat::Aac.ffmpeg_codec().to_string(),
                    "-b:a".to_string(),
                    format!("{}k", bitrate_kbps),
                    "-ar".to_string(),
                    sample_rate_hz.to_string(),
                ]);
            }
        }

        self.push_common_args(&mut args, output_path);
        args
    }

    /// Builds ffmpeg arguments for an audio-only conversion.
    fn build_extract_args(
        &self,
        input_path: &Path,
        format: AudioFormat,
        bitrate_kbps: u32,
        output_path: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-vn".to_string(),
            "-c:a".to_string(),
            format.ffmpeg_codec().to_string(),
            "-b:a".to_string(),
            format!("{}k", bitrate_kbps),
        ];

        self.push_common_args(&mut args, output_path);
        args
    }

    fn push_common_args(&self, args: &mut Vec<String>, output_path: &Path) {
        // Log level and progress
        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-nostats".to_string(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        // Extra args
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        // Output
        args.push(output_path.to_string_lossy().to_string());
    }

    fn build_args(&self, job: &ConversionJob) -> Result<Vec<String>, ConverterError> {
        match &job.kind {
            ConversionKind::Merge {
                video_path,
                audio_path,
                audio,
            } => Ok(self.build_merge_args(video_path, audio_path, audio, &job.output_path)),
            ConversionKind::ExtractAudio {
                input_path,
                bitrate_kbps,
            } => {
                let format = AudioFormat::from_path(&job.output_path).ok_or_else(|| {
                    ConverterError::invalid_job(format!(
                        "no audio format for output {}",
                        job.output_path.display()
                    ))
                })?;
                Ok(self.build_extract_args(input_path, format, *bitrate_kbps, &job.output_path))
            }
        }
    }

    /// Parses the `Duration: HH:MM:SS.xx` banner into seconds.
    fn parse_duration(line: &str) -> Option<f64> {
        let caps = DURATION_RE.as_ref()?.captures(line)?;
        let hours = caps.get(1)?.as_str().parse::<f64>().ok()?;
        let minutes = caps.get(2)?.as_str().parse::<f64>().ok()?;
        let seconds = caps.get(3)?.as_str().parse::<f64>().ok()?;
        Some(hours * 3600.0 + minutes * 60.0 + seconds)
    }

    /// Parses `out_time_us=` / `out_time_ms=` (both microseconds) into seconds.
    fn parse_out_time(line: &str) -> Option<f64> {
        let caps = OUT_TIME_RE.as_ref()?.captures(line)?;
        let micros = caps.get(1)?.as_str().parse::<f64>().ok()?;
        Some(micros / 1_000_000.0)
    }

    fn is_progress_line(line: &str) -> bool {
        PROGRESS_KEY_RE
            .as_ref()
            .is_some_and(|re| re.is_match(line))
    }

    fn percent(time_secs: f64, duration_secs: Option<f64>) -> Option<f32> {
        match duration_secs {
            Some(dur) if dur > 0.0 => Some((time_secs / dur * 100.0).clamp(0.0, 100.0) as f32),
            _ => None,
        }
    }

    fn command_line(&self, args: &[String]) -> String {
        let mut parts = vec![self.config.ffmpeg_path.to_string_lossy().to_string()];
        parts.extend(args.iter().cloned());
        parts.join(" ")
    }

    /// Runs the conversion with optional event reporting.
    async fn run_conversion(
        &self,
        job: &ConversionJob,
        events: Option<mpsc::Sender<ConversionEvent>>,
    ) -> Result<ConversionResult, ConverterError> {
        let start = Instant::now();

        for input in job.inputs() {
            if !input.exists() {
                return Err(ConverterError::InputNotFound {
                    path: input.to_path_buf(),
                });
            }
        }

        // Ensure output directory exists
        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|_| {
                ConverterError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                }
            })?;
        }

        let args = self.build_args(job)?;
        let command = self.command_line(&args);

        // Run ffmpeg
        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        info!("FFmpeg command: {}", command);
        if let Some(ref tx) = events {
            let _ = tx.try_send(ConversionEvent::Started { command });
        }

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConverterError::conversion_failed("stderr was not captured", None))?;
        let mut reader = BufReader::new(stderr);

        // Track progress
        let mut duration_secs: Option<f64> = None;
        let mut current_time = 0.0;
        let mut last_progress_send: Option<Instant> = None;
        let progress_interval = Duration::from_millis(self.config.progress_interval_ms);
        let mut diagnostic: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_TAIL);
        let mut buf = Vec::new();
        let mut read_error = None;

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    read_error = Some(e);
                    break;
                }
            }
            // Metadata echoed by ffmpeg is not necessarily UTF-8
            let decoded = String::from_utf8_lossy(&buf);
            let line = decoded.trim_end_matches(['\r', '\n']);

            if Self::is_progress_line(line) {
                if let Some(t) = Self::parse_out_time(line) {
                    current_time = t;
                }
            } else {
                // The first banner belongs to the first input
                if duration_secs.is_none() {
                    duration_secs = Self::parse_duration(line);
                }
                if diagnostic.len() == DIAGNOSTIC_TAIL {
                    diagnostic.pop_front();
                }
                diagnostic.push_back(line.to_string());
                continue;
            }

            // Send progress update
            if let Some(ref tx) = events {
                let due = last_progress_send.is_none_or(|at| at.elapsed() >= progress_interval);
                if due {
                    let progress = ConversionProgress {
                        job_id: job.job_id.clone(),
                        percent: Self::percent(current_time, duration_secs),
                        time_secs: current_time,
                    };

                    // Non-blocking send
                    let _ = tx.try_send(ConversionEvent::Progress(progress));
                    last_progress_send = Some(Instant::now());
                }
            }
        }
        // Dropping the pipe lets ffmpeg finish even if reading stopped early
        drop(reader);

        // Wait for process to complete
        let status = child.wait().await?;
        if let Some(e) = read_error {
            warn!("Stopped reading ffmpeg output for {}: {}", job.job_id, e);
        }
        if !status.success() {
            let tail: Vec<String> = diagnostic.into_iter().collect();
            return Err(ConverterError::conversion_failed(
                format!("FFmpeg exited with code: {:?}", status.code()),
                if tail.is_empty() {
                    None
                } else {
                    Some(tail.join("\n"))
                },
            ));
        }

        // Verify output exists and get size
        let output_meta = tokio::fs::metadata(&job.output_path)
            .await
            .map_err(|_| ConverterError::conversion_failed("Output file not created", None))?;

        debug!(
            "Conversion {} finished in {} ms",
            job.job_id,
            start.elapsed().as_millis()
        );

        Ok(ConversionResult {
            job_id: job.job_id.clone(),
            output_path: job.output_path.clone(),
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            audio_reencoded: job.reencodes_audio(),
        })
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        self.run_conversion(&job, None).await
    }

    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        events: mpsc::Sender<ConversionEvent>,
    ) -> Result<ConversionResult, ConverterError> {
        self.run_conversion(&job, Some(events)).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        let result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(ConverterError::conversion_failed(
                "ffmpeg -version failed",
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ConverterError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                })
            }
            Err(e) => Err(ConverterError::Io(e)),
        }
    }
}
