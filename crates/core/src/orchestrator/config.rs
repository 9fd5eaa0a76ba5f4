//! Configuration for the download pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::MediaKind;
use crate::config::{Config, RendererStyle, WorkspaceConfig};
use crate::fetcher::FetchOptions;
use crate::progress::{BarRenderer, HiddenRenderer, LogRenderer, ProgressRenderer};

/// Builds the renderer for each stream fetch.
pub type RendererFactory = Arc<dyn Fn(MediaKind) -> Box<dyn ProgressRenderer> + Send + Sync>;

/// Returns a factory producing renderers of the given style.
pub fn renderer_factory(style: RendererStyle) -> RendererFactory {
    Arc::new(move |kind: MediaKind| -> Box<dyn ProgressRenderer> {
        let label = format!("Downloading {}", kind);
        match style {
            RendererStyle::Bar => Box::new(BarRenderer::new(label)),
            RendererStyle::Log => Box::new(LogRenderer::new(label)),
            RendererStyle::Hidden => Box::new(HiddenRenderer),
        }
    })
}

/// Everything the pipeline needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Used when a request does not name an output directory.
    pub output_dir: PathBuf,
    pub workspace: WorkspaceConfig,
    pub fetch: FetchOptions,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.output.resolve_directory(),
            workspace: config.workspace.clone(),
            fetch: FetchOptions {
                throttle: Duration::from_millis(config.progress.throttle_ms),
                channel_capacity: config.transport.channel_capacity,
            },
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.output.directory = Some(PathBuf::from("/media/out"));
        config.progress.throttle_ms = 250;
        config.transport.channel_capacity = 8;

        let pipeline = PipelineConfig::from_config(&config);
        assert_eq!(pipeline.output_dir, PathBuf::from("/media/out"));
        assert_eq!(pipeline.fetch.throttle, Duration::from_millis(250));
        assert_eq!(pipeline.fetch.channel_capacity, 8);
        assert_eq!(pipeline.workspace.prefix, "tubemux_");
    }
}
