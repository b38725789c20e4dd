//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Workflow runs (results, durations, failing steps)
//! - Extraction, artifact detection and upload
//! - Scheduler firings

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Workflow Metrics
// =============================================================================

/// Workflow runs by result.
pub static RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reportrelay_runs_total", "Total workflow runs"),
        &["result"], // "success", "failure", "already_running"
    )
    .unwrap()
});

/// Workflow run duration in seconds.
pub static RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "reportrelay_run_duration_seconds",
            "Duration of complete workflow runs",
        )
        .buckets(vec![5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0]),
        &["result"],
    )
    .unwrap()
});

/// Failed runs by the step that failed.
pub static STEP_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reportrelay_step_failures_total", "Workflow failures by step"),
        &["step"],
    )
    .unwrap()
});

/// 1 while a workflow run is in progress.
pub static RUN_IN_PROGRESS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "reportrelay_run_in_progress",
        "Whether a workflow run is currently executing",
    )
    .unwrap()
});

// =============================================================================
// Component Metrics
// =============================================================================

/// Extraction attempts by result.
pub static EXTRACTION_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reportrelay_extraction_attempts_total",
            "Total extraction script attempts",
        ),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

/// Directory scans performed by the artifact locator.
pub static LOCATOR_POLLS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reportrelay_locator_polls_total",
        "Total artifact directory scans",
    )
    .unwrap()
});

/// Artifact searches by result.
pub static LOCATOR_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reportrelay_locator_results_total",
            "Artifact searches by result",
        ),
        &["result"], // "found", "not_found"
    )
    .unwrap()
});

/// Uploads by mode and result.
pub static UPLOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reportrelay_uploads_total", "Total upload operations"),
        &["mode", "result"],
    )
    .unwrap()
});

/// Bytes uploaded successfully.
pub static UPLOAD_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("reportrelay_upload_bytes_total", "Total bytes uploaded").unwrap()
});

// =============================================================================
// Scheduler Metrics
// =============================================================================

/// Scheduler firings by result.
pub static SCHEDULER_FIRINGS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reportrelay_scheduler_firings_total",
            "Scheduled workflow executions",
        ),
        &["result"], // "success", "failure", "retry_success", "retry_failure"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Workflow
        Box::new(RUNS.clone()),
        Box::new(RUN_DURATION.clone()),
        Box::new(STEP_FAILURES.clone()),
        Box::new(RUN_IN_PROGRESS.clone()),
        // Components
        Box::new(EXTRACTION_ATTEMPTS.clone()),
        Box::new(LOCATOR_POLLS.clone()),
        Box::new(LOCATOR_RESULTS.clone()),
        Box::new(UPLOADS.clone()),
        Box::new(UPLOAD_BYTES.clone()),
        // Scheduler
        Box::new(SCHEDULER_FIRINGS.clone()),
    ]
}
