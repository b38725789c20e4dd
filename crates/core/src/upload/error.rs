//! Error types for the upload module.

use std::path::PathBuf;
use thiserror::Error;

use crate::retry::Retryable;

/// Errors that can occur during an upload attempt.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload target is not configured")]
    NotConfigured,

    #[error("Invalid site URL: {url}")]
    InvalidSiteUrl { url: String },

    #[error("File to upload not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Both the primary and the fallback token flow failed.
    #[error("Authentication failed: {reason}")]
    Authentication { reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// Unexpected HTTP status from the API.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A chunk got a status other than 200/201/202; the session is abandoned.
    #[error("Chunk {range} rejected with status {status}")]
    ChunkRejected { status: u16, range: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Creates an API error, truncating long bodies.
    pub fn api(status: u16, body: &str) -> Self {
        let mut message: String = body.trim().chars().take(500).collect();
        if message.is_empty() {
            message = "empty response body".to_string();
        }
        Self::Api { status, message }
    }

    /// Configuration problems are permanent; everything else may clear up.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::NotConfigured | Self::InvalidSiteUrl { .. } | Self::FileNotFound { .. }
        )
    }
}

impl Retryable for UploadError {
    fn is_retryable(&self) -> bool {
        UploadError::is_retryable(self)
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UploadError::Timeout
        } else if e.is_decode() {
            UploadError::InvalidResponse(e.to_string())
        } else {
            UploadError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_truncates() {
        let err = UploadError::api(500, &"x".repeat(2000));
        match err {
            UploadError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message.len(), 500);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(UploadError::api(404, "").to_string().contains("empty response body"));
    }

    #[test]
    fn test_retryable() {
        assert!(!UploadError::NotConfigured.is_retryable());
        assert!(!UploadError::FileNotFound {
            path: PathBuf::from("/x")
        }
        .is_retryable());
        assert!(UploadError::Timeout.is_retryable());
        assert!(UploadError::ChunkRejected {
            status: 500,
            range: "bytes 0-9/10".to_string()
        }
        .is_retryable());
    }
}
