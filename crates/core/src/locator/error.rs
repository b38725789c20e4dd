//! Error types for the locator module.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while locating an artifact.
#[derive(Debug, Error)]
pub enum LocatorError {
    /// The wait budget elapsed without a usable candidate.
    #[error("No artifact found after {waited:?} ({polls} polls over {} directories)", .directories.len())]
    NotFound {
        waited: Duration,
        polls: u32,
        directories: Vec<PathBuf>,
    },

    /// The file could not be inspected.
    #[error("Cannot inspect {path}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LocatorError {
    /// Polling already is the retry loop; nothing here is retried again.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
