//! Retrying wrapper around an [`Uploader`].

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::error::UploadError;
use super::traits::Uploader;
use super::types::UploadReceipt;
use crate::metrics::{UPLOADS, UPLOAD_BYTES};
use crate::retry::{retry_with_backoff, RetryConfig, RetryOutcome};

/// Uploads with bounded retry. Each attempt is a full restart: token check,
/// site lookup and, for large files, a brand-new session.
pub struct UploadClient {
    uploader: Arc<dyn Uploader>,
    retry: RetryConfig,
}

impl UploadClient {
    pub fn new(uploader: Arc<dyn Uploader>, retry: RetryConfig) -> Self {
        Self { uploader, retry }
    }

    pub fn uploader_name(&self) -> &str {
        self.uploader.name()
    }

    pub async fn upload(&self, path: &Path) -> RetryOutcome<UploadReceipt, UploadError> {
        info!(
            "Uploading {} via {} uploader",
            path.display(),
            self.uploader.name()
        );

        let outcome = retry_with_backoff(&self.retry, "upload", |_attempt| {
            let uploader = Arc::clone(&self.uploader);
            let path = path.to_path_buf();
            async move { uploader.upload(&path).await }
        })
        .await;

        match &outcome.result {
            Ok(receipt) => {
                UPLOADS
                    .with_label_values(&[receipt.mode.as_str(), "success"])
                    .inc();
                UPLOAD_BYTES.inc_by(receipt.size);
            }
            Err(_) => {
                UPLOADS.with_label_values(&["any", "failure"]).inc();
            }
        }
        outcome
    }

    pub async fn test_connection(&self) -> Result<(), UploadError> {
        self.uploader.test_connection().await
    }
}
