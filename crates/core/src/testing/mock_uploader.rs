//! Mock uploader for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::upload::{UploadError, UploadMode, UploadReceipt, Uploader};

/// Mock implementation of the Uploader trait.
///
/// Fails with a retryable network error while failures are pending and
/// records successfully uploaded paths.
#[derive(Debug)]
pub struct MockUploader {
    failures_remaining: AtomicU32,
    attempts: AtomicU32,
    connection_ok: AtomicBool,
    uploaded: Mutex<Vec<PathBuf>>,
}

impl Default for MockUploader {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUploader {
    pub fn new() -> Self {
        Self {
            failures_remaining: AtomicU32::new(0),
            attempts: AtomicU32::new(0),
            connection_ok: AtomicBool::new(true),
            uploaded: Mutex::new(Vec::new()),
        }
    }

    /// The next `n` upload attempts fail.
    pub fn fail_next_uploads(&self, n: u32) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    pub fn set_connection_ok(&self, ok: bool) {
        self.connection_ok.store(ok, Ordering::SeqCst);
    }

    /// Upload attempts, failed ones included.
    pub fn attempt_count(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn uploaded(&self) -> Vec<PathBuf> {
        self.uploaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl Uploader for MockUploader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(&self, path: &Path) -> Result<UploadReceipt, UploadError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(UploadError::Network("mock connection reset".to_string()));
        }

        let size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.uploaded.lock().unwrap().push(path.to_path_buf());

        Ok(UploadReceipt {
            remote_path: format!("mock/{}", file_name),
            file_name,
            size,
            mode: UploadMode::Simple,
            chunks: 1,
            item_id: None,
            web_url: None,
            duration_ms: 0,
        })
    }

    async fn test_connection(&self) -> Result<(), UploadError> {
        if self.connection_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(UploadError::Authentication {
                reason: "mock credentials rejected".to_string(),
            })
        }
    }
}
