//! Trait definitions for the converter module.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::ConverterError;
use super::types::{ConversionEvent, ConversionJob, ConversionResult};

/// A converter that can merge and transcode media files.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Runs a conversion job.
    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError>;

    /// Runs a conversion job with event reporting.
    ///
    /// Events are sent without waiting; if the receiver lags or is dropped,
    /// conversion continues and the event is lost.
    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        events: mpsc::Sender<ConversionEvent>,
    ) -> Result<ConversionResult, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;
}
