//! Configuration for the catalog module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the yt-dlp backed catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the yt-dlp binary.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// Additional arguments passed before the source reference.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            extra_args: Vec::new(),
        }
    }
}
