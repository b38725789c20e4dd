//! Trait definitions for the transform module.

use async_trait::async_trait;
use std::path::Path;

use super::error::TransformError;
use super::types::TransformOutput;

/// Turns the located artifact into the artifact that gets uploaded.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Returns the name of this transformer implementation.
    fn name(&self) -> &str;

    async fn transform(&self, input: &Path) -> Result<TransformOutput, TransformError>;
}
