//! Workflow orchestrator implementation.
//!
//! Sequences one run: validate, extract, settle, locate, transform, upload
//! (best effort), back up. A failing step aborts the run with a step-tagged
//! error; later steps never execute.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Local;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::backup::{cleanup_older_than, BackupError, BackupStore};
use crate::config::{validate_config, Config};
use crate::date_range::DateRange;
use crate::extraction::{ExtractionDriver, ExtractionError, Extractor, ScriptedExtractor};
use crate::locator::{ArtifactLocator, FsArtifactLocator, LocatedArtifact, LocatorError};
use crate::metrics::{RUNS, RUN_DURATION, STEP_FAILURES};
use crate::scheduler::{ScheduledWorkflow, SharedScheduleState};
use crate::transform::{CommandTransformer, Transformer};
use crate::upload::{GraphUploader, UploadClient, UploadError, Uploader};

use super::guard::{RunGuard, RunToken};
use super::types::{
    CompletionCallback, LastRun, ProgressCallback, RunProgress, RunReport, SystemStatus,
    UploadStatus, WorkflowError, WorkflowRun, WorkflowStep, TOTAL_STEPS,
};

/// Drives the extract-transform-load pipeline.
pub struct Orchestrator {
    config: Arc<Config>,
    extraction: ExtractionDriver,
    locator: Arc<dyn ArtifactLocator>,
    transformer: Arc<dyn Transformer>,
    upload: Option<UploadClient>,
    backups: BackupStore,
    guard: RunGuard,
    last_run: RwLock<Option<LastRun>>,
    schedule: SharedScheduleState,
    progress: Option<ProgressCallback>,
}

impl Orchestrator {
    /// Create an orchestrator from explicit collaborators.
    ///
    /// `uploader` is `None` when the upload target is not configured; the
    /// upload step is then skipped.
    pub fn new(
        config: Config,
        extractor: Arc<dyn Extractor>,
        locator: Arc<dyn ArtifactLocator>,
        transformer: Arc<dyn Transformer>,
        uploader: Option<Arc<dyn Uploader>>,
    ) -> Self {
        let extraction = ExtractionDriver::new(
            extractor,
            &config.extraction,
            config.paths.download_dir.clone(),
        );
        let upload = uploader.map(|u| UploadClient::new(u, config.upload.retry.clone()));
        let backups = BackupStore::new(config.backup.clone(), config.paths.backup_dir.clone());

        Self {
            config: Arc::new(config),
            extraction,
            locator,
            transformer,
            upload,
            backups,
            guard: RunGuard::new(),
            last_run: RwLock::new(None),
            schedule: SharedScheduleState::default(),
            progress: None,
        }
    }

    /// Create an orchestrator with the production implementations.
    pub fn from_config(config: Config) -> Result<Self, UploadError> {
        let extractor: Arc<dyn Extractor> =
            Arc::new(ScriptedExtractor::new(config.extraction.clone()));
        let locator: Arc<dyn ArtifactLocator> = Arc::new(FsArtifactLocator::new(
            config.locator.clone(),
            config.paths.download_dir.clone(),
            config.paths.fallback_dirs.clone(),
        ));
        let transformer: Arc<dyn Transformer> = Arc::new(CommandTransformer::new(
            config.transform.clone(),
            config.paths.processed_dir.clone(),
        ));
        let uploader: Option<Arc<dyn Uploader>> = if config.upload.is_configured() {
            Some(Arc::new(GraphUploader::new(config.upload.clone())?))
        } else {
            info!("Upload target not configured; uploads will be skipped");
            None
        };

        Ok(Self::new(config, extractor, locator, transformer, uploader))
    }

    /// Set the observer for step transitions.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// State published by the scheduler, read by [`Self::status`].
    pub fn schedule_state(&self) -> SharedScheduleState {
        self.schedule.clone()
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    pub fn upload_configured(&self) -> bool {
        self.upload.is_some()
    }

    /// Execute one full run. Rejected with `already_running` when another
    /// run holds the guard.
    pub async fn run(&self, range: Option<DateRange>) -> RunReport {
        match self.guard.try_acquire() {
            Some(token) => self.run_with_token(token, range).await,
            None => self.rejected(range),
        }
    }

    /// Fire-and-forget manual trigger. The guard is claimed before the task
    /// is spawned, so a rejection is reported to the caller directly.
    pub fn spawn_run(
        self: &Arc<Self>,
        range: Option<DateRange>,
        on_done: Option<CompletionCallback>,
    ) -> Result<JoinHandle<RunReport>, WorkflowError> {
        let token = self.guard.try_acquire().ok_or_else(|| {
            RUNS.with_label_values(&["already_running"]).inc();
            WorkflowError::already_running()
        })?;

        let this = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let report = this.run_with_token(token, range).await;
            if let Some(callback) = on_done {
                callback(&report);
            }
            report
        }))
    }

    fn rejected(&self, range: Option<DateRange>) -> RunReport {
        let started = Local::now();
        let mut run = WorkflowRun::new(WorkflowRun::id_for(started), started);
        run.range = range;
        warn!(
            "Workflow run {} rejected: another run is in progress",
            run.run_id
        );
        RUNS.with_label_values(&["already_running"]).inc();
        run.into_report(Err(WorkflowError::already_running()))
    }

    async fn run_with_token(&self, _token: RunToken, range: Option<DateRange>) -> RunReport {
        let started = Local::now();
        let mut run = WorkflowRun::new(WorkflowRun::id_for(started), started);
        info!("Starting workflow run {}", run.run_id);

        let result = self.execute(&mut run, range).await;
        let report = run.into_report(result);
        self.finish(&report).await;
        report
    }

    async fn execute(
        &self,
        run: &mut WorkflowRun,
        range: Option<DateRange>,
    ) -> Result<(), WorkflowError> {
        // 1. Validation
        self.enter(run, WorkflowStep::Validation, "Validating configuration");
        validate_config(&self.config).map_err(|e| WorkflowError::new(WorkflowStep::Validation, e))?;
        let range = match range {
            Some(range) => range,
            None => self
                .config
                .date_range
                .resolve(Local::now().date_naive())
                .map_err(|e| WorkflowError::new(WorkflowStep::Validation, e))?,
        };
        run.range = Some(range);

        // 2. Extraction
        self.enter(
            run,
            WorkflowStep::Extraction,
            &format!("Extracting data for {}", range),
        );
        let outcome = self.extraction.extract(range).await;
        let attempts = outcome.state.attempts;
        run.extraction_attempts = attempts;
        let extracted = outcome.result.map_err(|e| {
            WorkflowError::new(
                WorkflowStep::Extraction,
                format!("{} (after {} attempt(s))", e, attempts),
            )
        })?;
        info!(
            "Extraction finished in {}ms, expecting {}",
            extracted.duration_ms,
            extracted.expected_output.display()
        );

        // 3. Settle
        let settle = self.config.workflow.settle_delay();
        self.enter(
            run,
            WorkflowStep::Settle,
            &format!("Waiting {}s for the extraction to finish writing", settle.as_secs()),
        );
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        // 4. File detection
        self.enter(run, WorkflowStep::FileDetection, "Looking for the extracted file");
        let artifact = self
            .locator
            .locate(
                self.config.workflow.artifact_wait(),
                self.config.workflow.artifact_pattern.as_deref(),
            )
            .await
            .map_err(|e| WorkflowError::new(WorkflowStep::FileDetection, e))?;
        info!(
            "Found {} ({} bytes, {:?} directory)",
            artifact.path.display(),
            artifact.size,
            artifact.source
        );
        if self.config.workflow.require_stable_artifact {
            let stable = self
                .locator
                .wait_for_stability(&artifact.path, self.config.locator.stability_max_wait())
                .await;
            if !stable {
                let message = format!("{} may still be changing", artifact.path.display());
                warn!("{}", message);
                run.warnings.push(message);
            }
        }
        let artifact_path = artifact.path.clone();
        run.artifact = Some(artifact);

        // 5-7
        self.deliver(run, &artifact_path).await
    }

    /// Transform, upload and back up an artifact.
    async fn deliver(&self, run: &mut WorkflowRun, artifact: &Path) -> Result<(), WorkflowError> {
        // 5. Data processing
        self.enter(run, WorkflowStep::DataProcessing, "Processing data");
        let transformed = self
            .transformer
            .transform(artifact)
            .await
            .map_err(|e| WorkflowError::new(WorkflowStep::DataProcessing, e))?;
        info!(
            "Transformed {} into {}",
            artifact.display(),
            transformed.path.display()
        );
        let transformed_path = transformed.path.clone();
        run.transformed = Some(transformed);

        // 6. Upload (best effort)
        self.enter(run, WorkflowStep::Upload, "Uploading processed file");
        run.upload = Some(match &self.upload {
            None => {
                info!("Upload not configured, skipping");
                UploadStatus::NotConfigured
            }
            Some(client) => {
                let outcome = client.upload(&transformed_path).await;
                let attempts = outcome.state.attempts;
                match outcome.result {
                    Ok(receipt) => {
                        info!("Uploaded to {}", receipt.remote_path);
                        UploadStatus::Uploaded { receipt, attempts }
                    }
                    Err(e) => {
                        let message = format!("Upload failed after {} attempt(s): {}", attempts, e);
                        warn!("{}; continuing without upload", message);
                        run.warnings.push(message);
                        UploadStatus::Failed {
                            error: e.to_string(),
                            attempts,
                        }
                    }
                }
            }
        });

        // 7. Backup (logged only)
        self.enter(run, WorkflowStep::Backup, "Backing up files");
        if self.backups.is_enabled() {
            for (path, kind) in [(artifact, "original"), (transformed_path.as_path(), "processed")] {
                match self.backups.backup(path, kind).await {
                    Ok(record) => run.backups.push(record),
                    Err(e) => {
                        let message = format!("Backup of {} failed: {}", path.display(), e);
                        warn!("{}", message);
                        run.warnings.push(message);
                    }
                }
            }
            if self.config.backup.cleanup_after_run {
                if let Err(e) = self.backups.cleanup().await {
                    warn!("Backup cleanup failed: {}", e);
                }
            }
        } else {
            info!("Backups disabled, skipping");
        }

        Ok(())
    }

    fn enter(&self, run: &mut WorkflowRun, step: WorkflowStep, message: &str) {
        run.step = Some(step);
        info!("[{}/{}] {}", step.number(), TOTAL_STEPS, message);
        if let Some(callback) = &self.progress {
            callback(&RunProgress {
                run_id: run.run_id.clone(),
                step,
                step_number: step.number(),
                total_steps: TOTAL_STEPS,
                message: message.to_string(),
            });
        }
    }

    async fn finish(&self, report: &RunReport) {
        let result = if report.success { "success" } else { "failure" };
        RUNS.with_label_values(&[result]).inc();
        RUN_DURATION
            .with_label_values(&[result])
            .observe(report.duration_ms() as f64 / 1000.0);

        match (&report.failed_step, &report.error) {
            (Some(step), error) => {
                STEP_FAILURES.with_label_values(&[step.as_str()]).inc();
                error!(
                    "Workflow run {} failed at {}: {}",
                    report.run_id,
                    step,
                    error.as_deref().unwrap_or("unknown error")
                );
            }
            (None, _) if report.warnings.is_empty() => {
                info!(
                    "Workflow run {} completed in {}ms",
                    report.run_id,
                    report.duration_ms()
                );
            }
            (None, _) => {
                info!(
                    "Workflow run {} completed in {}ms with {} warning(s)",
                    report.run_id,
                    report.duration_ms(),
                    report.warnings.len()
                );
            }
        }

        *self.last_run.write().await = Some(LastRun::from(report));
    }

    /// Transform, upload and back up an existing file, skipping extraction
    /// and detection.
    pub async fn process_file_only(&self, path: &Path) -> RunReport {
        let Some(_token) = self.guard.try_acquire() else {
            return self.rejected(None);
        };

        let started = Local::now();
        let mut run = WorkflowRun::new(WorkflowRun::id_for(started), started);
        info!("Processing existing file {}", path.display());

        let result = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => self.deliver(&mut run, path).await,
            _ => Err(WorkflowError::new(
                WorkflowStep::FileDetection,
                format!("file not found: {}", path.display()),
            )),
        };
        let report = run.into_report(result);
        self.finish(&report).await;
        report
    }

    /// Locate the artifact with the detection self-test budget.
    pub async fn test_file_detection(&self) -> Result<LocatedArtifact, LocatorError> {
        let wait = self.config.workflow.test_detection_wait();
        info!("Testing file detection ({}s budget)", wait.as_secs());
        self.locator
            .locate(wait, self.config.workflow.artifact_pattern.as_deref())
            .await
    }

    pub async fn test_upload_connection(&self) -> Result<(), UploadError> {
        match &self.upload {
            Some(client) => client.test_connection().await,
            None => Err(UploadError::NotConfigured),
        }
    }

    pub async fn test_extraction_connection(&self) -> Result<(), ExtractionError> {
        self.extraction.test_connection().await
    }

    /// Delete backups older than `days`.
    pub async fn cleanup_old_files(&self, days: u32) -> Result<usize, BackupError> {
        let started = Instant::now();
        let removed = cleanup_older_than(self.backups.dir(), days).await?;
        info!(
            "Removed {} backup(s) older than {} days in {:?}",
            removed,
            days,
            started.elapsed()
        );
        Ok(removed)
    }

    pub async fn last_run(&self) -> Option<LastRun> {
        self.last_run.read().await.clone()
    }

    /// Aggregated status: run guard, scheduler, config and last run.
    pub async fn status(&self) -> SystemStatus {
        let schedule = self.schedule.snapshot();
        let last_run = self.last_run().await;
        SystemStatus {
            running: self.guard.is_running(),
            scheduler_active: schedule.active,
            config_valid: validate_config(&self.config).is_ok(),
            upload_configured: self.upload.is_some(),
            run_time: schedule.run_time,
            last_success: last_run.as_ref().map(|r| r.success),
            last_run,
            next_run: schedule.next_run,
        }
    }
}

#[async_trait]
impl ScheduledWorkflow for Orchestrator {
    async fn run_workflow(&self) -> bool {
        self.run(None).await.success
    }
}
