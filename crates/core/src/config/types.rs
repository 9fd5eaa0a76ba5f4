use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::CatalogConfig;
use crate::converter::ConverterConfig;
use crate::transport::TransportConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

/// Where finished files land
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Overrides `<home>/Downloads/YouTube` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl OutputConfig {
    /// Configured directory, or the platform default.
    pub fn resolve_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(default_output_dir)
    }
}

/// Default output directory: `<home>/Downloads/YouTube`.
pub fn default_output_dir() -> PathBuf {
    let home = directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    home.join("Downloads").join("YouTube")
}

/// Scratch directory configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_temp_root")]
    pub temp_root: PathBuf,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            temp_root: default_temp_root(),
            prefix: default_prefix(),
        }
    }
}

fn default_temp_root() -> PathBuf {
    std::env::temp_dir()
}

fn default_prefix() -> String {
    "tubemux_".to_string()
}

/// How download progress is drawn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererStyle {
    #[default]
    Bar,
    Log,
    Hidden,
}

/// Progress tracker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProgressConfig {
    /// Minimum interval between two renders, in milliseconds.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    #[serde(default)]
    pub style: RendererStyle,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            style: RendererStyle::default(),
        }
    }
}

fn default_throttle_ms() -> u64 {
    500
}
