//! Retrying wrapper around an [`Extractor`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::info;

use super::config::ExtractionConfig;
use super::error::ExtractionError;
use super::script::render_output_filename;
use super::traits::Extractor;
use super::types::{ExtractionOutcome, ExtractionRequest};
use crate::date_range::DateRange;
use crate::metrics::EXTRACTION_ATTEMPTS;
use crate::retry::{retry_with_backoff, RetryConfig, RetryOutcome};

/// Probes and runs the extraction, retrying with exponential backoff.
pub struct ExtractionDriver {
    extractor: Arc<dyn Extractor>,
    retry: RetryConfig,
    download_dir: PathBuf,
    output_filename: String,
    max_wait: Duration,
}

impl ExtractionDriver {
    pub fn new(extractor: Arc<dyn Extractor>, config: &ExtractionConfig, download_dir: PathBuf) -> Self {
        Self {
            extractor,
            retry: config.retry.clone(),
            download_dir,
            output_filename: config.output_filename.clone(),
            max_wait: Duration::from_secs(config.max_wait_secs),
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn extractor_name(&self) -> &str {
        self.extractor.name()
    }

    fn build_request(&self, range: DateRange, attempt: u32) -> ExtractionRequest {
        let now = Local::now();
        ExtractionRequest {
            range,
            download_dir: self.download_dir.clone(),
            output_filename: render_output_filename(&self.output_filename, now.date_naive()),
            max_wait: self.max_wait,
            attempt,
            generated_at: now,
        }
    }

    /// Runs probe + extraction for `range`. Every attempt gets a newly
    /// built request; nothing from a failed attempt is reused.
    pub async fn extract(&self, range: DateRange) -> RetryOutcome<ExtractionOutcome, ExtractionError> {
        info!(
            "Starting extraction for {} using {} extractor",
            range,
            self.extractor.name()
        );

        let outcome = retry_with_backoff(&self.retry, "extraction", |attempt| {
            let extractor = Arc::clone(&self.extractor);
            let request = self.build_request(range, attempt);
            async move {
                let result = async {
                    extractor.probe().await?;
                    extractor.run(&request).await
                }
                .await;
                let label = if result.is_ok() { "success" } else { "failure" };
                EXTRACTION_ATTEMPTS.with_label_values(&[label]).inc();
                result
            }
        })
        .await;

        if outcome.result.is_ok() {
            info!(
                "Extraction completed after {} attempt(s)",
                outcome.state.attempts
            );
        }
        outcome
    }

    /// Runs only the availability probe.
    pub async fn test_connection(&self) -> Result<(), ExtractionError> {
        self.extractor.probe().await
    }
}
