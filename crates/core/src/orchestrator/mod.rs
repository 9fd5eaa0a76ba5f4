//! Download pipeline orchestrator.
//!
//! Drives one job through its stages, in order:
//! - **Workspace**: a fresh scratch directory per job
//! - **Catalog**: a single format query, filtered and ranked
//! - **Fetch**: video then audio, sequentially, each to a workspace file
//! - **Transcode**: merge (copy or re-encode audio) or audio extraction
//! - **Publish**: move the result to `<output dir>/<sanitized title>.<ext>`
//!
//! The workspace is released whatever the outcome.

mod config;
mod runner;
mod types;

pub use config::{renderer_factory, PipelineConfig, RendererFactory};
pub use runner::DownloadPipeline;
pub use types::{AudioJobRequest, JobError, JobOutcome, JobProgress, JobStage, VideoJobRequest};
