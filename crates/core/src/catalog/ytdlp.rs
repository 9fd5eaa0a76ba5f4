//! Catalog backed by the `yt-dlp` metadata dump.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::config::CatalogConfig;
use super::error::CatalogError;
use super::traits::CatalogClient;
use super::types::{RawFormat, RawMediaInfo};

/// Catalog client that shells out to `yt-dlp --dump-json`.
pub struct YtDlpCatalog {
    config: CatalogConfig,
}

impl YtDlpCatalog {
    /// Creates a new catalog with the given configuration.
    pub fn new(config: CatalogConfig) -> Self {
        Self { config }
    }

    /// Creates a catalog with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CatalogConfig::default())
    }

    fn build_args(&self, source: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-progress".to_string(),
            "--no-playlist".to_string(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args.push(source.to_string());
        args
    }

    /// Parses the JSON document printed by yt-dlp.
    fn parse_dump(output: &str) -> Result<RawMediaInfo, CatalogError> {
        #[derive(Deserialize)]
        struct Dump {
            title: String,
            #[serde(default)]
            formats: Vec<DumpFormat>,
        }

        #[derive(Deserialize)]
        struct DumpFormat {
            format_id: String,
            ext: Option<String>,
            vcodec: Option<String>,
            acodec: Option<String>,
            filesize: Option<u64>,
            filesize_approx: Option<u64>,
            abr: Option<f64>,
            url: Option<String>,
        }

        fn has_codec(codec: &Option<String>) -> bool {
            codec.as_deref().is_some_and(|c| c != "none")
        }

        let dump: Dump = serde_json::from_str(output)
            .map_err(|e| CatalogError::parse_error(format!("invalid yt-dlp output: {}", e)))?;

        let formats = dump
            .formats
            .into_iter()
            .filter_map(|f| {
                // Non-numeric ids (storyboards, HLS variants) cannot be allow-listed
                let id = f.format_id.parse::<u32>().ok()?;
                Some(RawFormat {
                    id,
                    has_video: has_codec(&f.vcodec),
                    has_audio: has_codec(&f.acodec),
                    container: f.ext.unwrap_or_else(|| "bin".to_string()),
                    content_length: f.filesize.or(f.filesize_approx),
                    audio_bitrate: f.abr.filter(|b| *b > 0.0).map(|b| b.round() as u32),
                    url: f.url,
                })
            })
            .collect();

        Ok(RawMediaInfo {
            title: dump.title,
            formats,
        })
    }
}

#[async_trait]
impl CatalogClient for YtDlpCatalog {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn get_info(&self, source: &str) -> Result<RawMediaInfo, CatalogError> {
        debug!("Querying yt-dlp catalog for {}", source);

        let output = Command::new(&self.config.ytdlp_path)
            .args(self.build_args(source))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CatalogError::ToolNotFound {
                        path: self.config.ytdlp_path.clone(),
                    }
                } else {
                    CatalogError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(CatalogError::query_failed(format!(
                "yt-dlp exited with code {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let info = Self::parse_dump(&stdout)?;
        debug!("Catalog returned {} formats for {}", info.formats.len(), info.title);
        Ok(info)
    }
}
