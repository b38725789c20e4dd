//! Error types for the transform module.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Transform input not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Transform command not found: {command}")]
    CommandNotFound { command: String },

    #[error("Transform command failed with exit code {}: {stderr}", .code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    Failed { code: Option<i32>, stderr: String },

    #[error("Transform timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Transform produced no usable output at {path}")]
    MissingOutput { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    /// Creates a command failure error.
    pub fn failed(code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::Failed {
            code,
            stderr: stderr.into(),
        }
    }
}
