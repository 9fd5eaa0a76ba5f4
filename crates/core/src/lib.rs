pub mod catalog;
pub mod config;
pub mod converter;
pub mod fetcher;
pub mod orchestrator;
pub mod progress;
pub mod publisher;
pub mod testing;
pub mod transport;
pub mod workspace;

pub use catalog::{
    filter_formats, CatalogClient, CatalogError, MediaInfo, MediaKind, StreamDescriptor,
    YtDlpCatalog,
};
pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
};
pub use converter::{AudioFormat, Converter, ConverterError, FfmpegConverter, TranscodeDecision};
pub use fetcher::{fetch_stream, FetchError, FetchOptions};
pub use orchestrator::{
    AudioJobRequest, DownloadPipeline, JobError, JobOutcome, JobProgress, JobStage,
    PipelineConfig, VideoJobRequest,
};
pub use progress::{ProgressRenderer, ProgressTracker};
pub use publisher::{publish, sanitize_filename, PublishError};
pub use transport::{HttpTransport, StreamTransport, TransportError};
pub use workspace::{Workspace, WorkspaceError};
