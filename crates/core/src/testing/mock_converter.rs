//! Mock converter for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::converter::{
    ConversionEvent, ConversionJob, ConversionProgress, ConversionResult, Converter,
    ConverterError,
};

/// Bytes written to every output file.
const OUTPUT_PAYLOAD: &[u8] = b"mock converter output";

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track conversion jobs for assertions
/// - Simulate failure
/// - Write a small output file where a real run would
#[derive(Debug, Clone, Default)]
pub struct MockConverter {
    /// Jobs received, including failed ones.
    jobs: Arc<RwLock<Vec<ConversionJob>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
}

impl MockConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded_jobs(&self) -> Vec<ConversionJob> {
        self.jobs.read().await.clone()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        self.jobs.write().await.push(job.clone());

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        for input in job.inputs() {
            if !input.exists() {
                return Err(ConverterError::InputNotFound {
                    path: input.to_path_buf(),
                });
            }
        }

        tokio::fs::write(&job.output_path, OUTPUT_PAYLOAD).await?;

        Ok(ConversionResult {
            audio_reencoded: job.reencodes_audio(),
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes: OUTPUT_PAYLOAD.len() as u64,
            duration_ms: 0,
        })
    }

    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        events: mpsc::Sender<ConversionEvent>,
    ) -> Result<ConversionResult, ConverterError> {
        let _ = events.try_send(ConversionEvent::Started {
            command: format!("mock {}", job.output_path.display()),
        });
        for percent in [50.0, 100.0] {
            let _ = events.try_send(ConversionEvent::Progress(ConversionProgress {
                job_id: job.job_id.clone(),
                percent: Some(percent),
                time_secs: 0.0,
            }));
        }
        self.convert(job).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(())
    }
}
