//! Types for the extraction module.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::date_range::DateRange;

/// Everything one attempt needs. Built fresh for every attempt.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub range: DateRange,
    pub download_dir: PathBuf,
    pub output_filename: String,
    /// Wait budget passed through to the script.
    pub max_wait: Duration,
    /// 1-based attempt number.
    pub attempt: u32,
    pub generated_at: DateTime<Local>,
}

impl ExtractionRequest {
    /// Full path the script is asked to write.
    pub fn target_file(&self) -> PathBuf {
        self.download_dir.join(&self.output_filename)
    }
}

/// Result of a successful script run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    pub script_path: PathBuf,
    pub expected_output: PathBuf,
    pub duration_ms: u64,
    /// Last lines of the script's stdout, kept for diagnostics.
    pub stdout_tail: String,
}
