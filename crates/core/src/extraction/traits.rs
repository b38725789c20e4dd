//! Trait definitions for the extraction module.

use async_trait::async_trait;

use super::error::ExtractionError;
use super::types::{ExtractionOutcome, ExtractionRequest};

/// One attempt at the external extraction.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Returns the name of this extractor implementation.
    fn name(&self) -> &str;

    /// Short availability check. Failure means the extraction surface is
    /// not reachable and `run` should not be attempted.
    async fn probe(&self) -> Result<(), ExtractionError>;

    /// Runs the extraction once with a hard timeout.
    async fn run(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome, ExtractionError>;
}
