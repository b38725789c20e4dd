//! Types for the workflow orchestrator.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backup::BackupRecord;
use crate::date_range::DateRange;
use crate::locator::LocatedArtifact;
use crate::transform::TransformOutput;
use crate::upload::UploadReceipt;

/// Number of numbered steps reported through progress callbacks.
pub const TOTAL_STEPS: u8 = 7;

/// Workflow steps, in execution order. Used as the tag on failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Validation,
    Extraction,
    Settle,
    FileDetection,
    DataProcessing,
    Upload,
    Backup,
    /// The exclusive-run guard rejected the run before any step started.
    AlreadyRunning,
}

impl WorkflowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Extraction => "extraction",
            Self::Settle => "settle",
            Self::FileDetection => "file_detection",
            Self::DataProcessing => "data_processing",
            Self::Upload => "upload",
            Self::Backup => "backup",
            Self::AlreadyRunning => "already_running",
        }
    }

    /// 1-based position in the run, 0 for the rejection tag.
    pub fn number(&self) -> u8 {
        match self {
            Self::Validation => 1,
            Self::Extraction => 2,
            Self::Settle => 3,
            Self::FileDetection => 4,
            Self::DataProcessing => 5,
            Self::Upload => 6,
            Self::Backup => 7,
            Self::AlreadyRunning => 0,
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step failure. Terminates the run.
#[derive(Debug, Clone, Error)]
#[error("{step} failed: {message}")]
pub struct WorkflowError {
    pub step: WorkflowStep,
    pub message: String,
}

impl WorkflowError {
    pub fn new(step: WorkflowStep, message: impl fmt::Display) -> Self {
        Self {
            step,
            message: message.to_string(),
        }
    }

    pub fn already_running() -> Self {
        Self::new(
            WorkflowStep::AlreadyRunning,
            "another workflow run is in progress",
        )
    }
}

/// Progress notification for a step transition.
#[derive(Debug, Clone, Serialize)]
pub struct RunProgress {
    pub run_id: String,
    pub step: WorkflowStep,
    pub step_number: u8,
    pub total_steps: u8,
    pub message: String,
}

/// Observer for step transitions. Invoked from whatever task executes the
/// run; the host decides where to forward it.
pub type ProgressCallback = Arc<dyn Fn(&RunProgress) + Send + Sync>;

/// Receives the report of a run started with `spawn_run`.
pub type CompletionCallback = Box<dyn FnOnce(&RunReport) + Send>;

/// Outcome of the upload step.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadStatus {
    NotConfigured,
    Uploaded { receipt: UploadReceipt, attempts: u32 },
    /// Best-effort step: this does not fail the run.
    Failed { error: String, attempts: u32 },
}

/// One pipeline execution, filled in step by step.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub run_id: String,
    pub started_at: DateTime<Local>,
    pub step: Option<WorkflowStep>,
    pub range: Option<DateRange>,
    pub extraction_attempts: u32,
    pub artifact: Option<LocatedArtifact>,
    pub transformed: Option<TransformOutput>,
    pub upload: Option<UploadStatus>,
    pub backups: Vec<BackupRecord>,
    pub warnings: Vec<String>,
}

impl WorkflowRun {
    pub fn new(run_id: String, started_at: DateTime<Local>) -> Self {
        Self {
            run_id,
            started_at,
            step: None,
            range: None,
            extraction_attempts: 0,
            artifact: None,
            transformed: None,
            upload: None,
            backups: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Run id derived from the start time, `YYYYMMDD_HHMMSS`.
    pub fn id_for(started_at: DateTime<Local>) -> String {
        started_at.format("%Y%m%d_%H%M%S").to_string()
    }

    pub fn into_report(self, result: Result<(), WorkflowError>) -> RunReport {
        let (success, failed_step, error) = match result {
            Ok(()) => (true, None, None),
            Err(e) => (false, Some(e.step), Some(e.message)),
        };
        RunReport {
            run_id: self.run_id,
            range: self.range,
            success,
            failed_step,
            error,
            artifact: self.artifact,
            transformed: self.transformed,
            upload: self.upload,
            backups: self.backups,
            extraction_attempts: self.extraction_attempts,
            warnings: self.warnings,
            started_at: self.started_at,
            finished_at: Local::now(),
        }
    }
}

/// Final result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub range: Option<DateRange>,
    pub success: bool,
    pub failed_step: Option<WorkflowStep>,
    pub error: Option<String>,
    pub artifact: Option<LocatedArtifact>,
    pub transformed: Option<TransformOutput>,
    pub upload: Option<UploadStatus>,
    pub backups: Vec<BackupRecord>,
    pub extraction_attempts: u32,
    /// Non-fatal problems (upload, backup, stability).
    pub warnings: Vec<String>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl RunReport {
    /// Extraction attempts beyond the first.
    pub fn extraction_retries(&self) -> u32 {
        self.extraction_attempts.saturating_sub(1)
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

/// What survives of a run once it finished.
#[derive(Debug, Clone, Serialize)]
pub struct LastRun {
    pub run_id: String,
    pub finished_at: DateTime<Local>,
    pub success: bool,
    pub failed_step: Option<WorkflowStep>,
    pub error: Option<String>,
}

impl From<&RunReport> for LastRun {
    fn from(report: &RunReport) -> Self {
        Self {
            run_id: report.run_id.clone(),
            finished_at: report.finished_at,
            success: report.success,
            failed_step: report.failed_step,
            error: report.error.clone(),
        }
    }
}

/// Aggregated status for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub running: bool,
    pub scheduler_active: bool,
    pub config_valid: bool,
    pub upload_configured: bool,
    pub run_time: String,
    pub last_run: Option<LastRun>,
    pub next_run: Option<NaiveDateTime>,
    pub last_success: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_tags() {
        assert_eq!(WorkflowStep::FileDetection.as_str(), "file_detection");
        assert_eq!(WorkflowStep::DataProcessing.to_string(), "data_processing");
        assert_eq!(
            serde_json::to_string(&WorkflowStep::AlreadyRunning).unwrap(),
            "\"already_running\""
        );
        assert_eq!(WorkflowStep::Backup.number(), TOTAL_STEPS);
    }

    #[test]
    fn test_error_display() {
        let err = WorkflowError::new(WorkflowStep::Extraction, "script exited with code 1");
        assert_eq!(err.to_string(), "extraction failed: script exited with code 1");
    }

    #[test]
    fn test_report_from_failed_run() {
        let started = Local::now();
        let mut run = WorkflowRun::new(WorkflowRun::id_for(started), started);
        run.extraction_attempts = 3;

        let report = run.into_report(Err(WorkflowError::new(
            WorkflowStep::FileDetection,
            "no artifact",
        )));

        assert!(!report.success);
        assert_eq!(report.failed_step, Some(WorkflowStep::FileDetection));
        assert_eq!(report.error.as_deref(), Some("no artifact"));
        assert_eq!(report.extraction_retries(), 2);
        assert_eq!(report.run_id.len(), "20250803_080000".len());

        let last = LastRun::from(&report);
        assert!(!last.success);
        assert_eq!(last.failed_step, Some(WorkflowStep::FileDetection));
    }

    #[test]
    fn test_upload_status_serialization() {
        let json = serde_json::to_value(UploadStatus::Failed {
            error: "timeout".to_string(),
            attempts: 3,
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["attempts"], 3);
    }
}
