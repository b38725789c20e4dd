//! Error types for the extraction module.

use thiserror::Error;

use crate::retry::Retryable;

/// Errors that can occur while driving the external extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The probe failed; the script was not launched.
    #[error("Extraction surface unavailable: {reason}")]
    Unavailable { reason: String },

    /// The script ran but exited unsuccessfully.
    #[error("Extraction script failed with exit code {}: {stderr}", .code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    ScriptFailed { code: Option<i32>, stderr: String },

    /// The script exceeded its hard timeout and was killed.
    #[error("Extraction script timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The script template could not be rendered.
    #[error("Script template error: {0}")]
    Template(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// Creates an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a script failure, trimming long diagnostics.
    pub fn script_failed(code: Option<i32>, stderr: &str) -> Self {
        Self::ScriptFailed {
            code,
            stderr: tail(stderr.trim(), 2000),
        }
    }

    /// Creates a template error.
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template(message.into())
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Template(_))
    }
}

impl Retryable for ExtractionError {
    fn is_retryable(&self) -> bool {
        ExtractionError::is_retryable(self)
    }
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}
