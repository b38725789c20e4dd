//! Trait definitions for the upload module.

use async_trait::async_trait;
use std::path::Path;

use super::error::UploadError;
use super::types::UploadReceipt;

/// One complete upload attempt against a remote store.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Returns the name of this uploader implementation.
    fn name(&self) -> &str;

    /// Uploads `path` into the configured folder, replacing any existing item.
    async fn upload(&self, path: &Path) -> Result<UploadReceipt, UploadError>;

    /// Checks credentials and that the target site resolves.
    async fn test_connection(&self) -> Result<(), UploadError>;
}
