//! Prometheus metrics for the control API.
//!
//! HTTP request metrics are recorded by the middleware; scheduler gauges are
//! refreshed from the application state right before each scrape. The core
//! workflow metrics are registered into the same registry.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;
use tracing::warn;

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "reportrelay_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reportrelay_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "reportrelay_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Scheduler Metrics (collected dynamically)
// =============================================================================

/// Scheduler state (1 = active, 0 = stopped).
pub static SCHEDULER_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "reportrelay_scheduler_active",
        "Whether the daily scheduler is active (1) or stopped (0)",
    )
    .unwrap()
});

/// Seconds until the next scheduled run, -1 when nothing is scheduled.
pub static SECONDS_UNTIL_NEXT_RUN: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "reportrelay_seconds_until_next_run",
        "Seconds until the next scheduled run (-1 when none)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Scheduler
    registry
        .register(Box::new(SCHEDULER_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(SECONDS_UNTIL_NEXT_RUN.clone()))
        .unwrap();

    // Core metrics (runs, extraction, locator, uploads, scheduler firings)
    for metric in reportrelay_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Refresh gauges that mirror the scheduler state.
pub fn collect_dynamic_metrics(state: &AppState) {
    let scheduler = state.scheduler();
    SCHEDULER_ACTIVE.set(if scheduler.is_active() { 1 } else { 0 });
    SECONDS_UNTIL_NEXT_RUN.set(
        scheduler
            .time_until_next_run()
            .map(|d| d.as_secs() as i64)
            .unwrap_or(-1),
    );
}

static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());
static HEX_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/[0-9a-fA-F]{16,}(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = HEX_SEGMENT.replace_all(path, "/{hash}$1");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_numeric() {
        assert_eq!(normalize_path("/api/v1/runs/12345"), "/api/v1/runs/{id}");
    }

    #[test]
    fn test_normalize_path_hash() {
        let path = "/api/v1/runs/a94a8fe5ccb19ba61c4c0873d391e987982fbbd3";
        assert_eq!(normalize_path(path), "/api/v1/runs/{hash}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(
            normalize_path("/api/v1/scheduler/run-time"),
            "/api/v1/scheduler/run-time"
        );
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();
        SCHEDULER_ACTIVE.set(0);

        let output = encode_metrics();
        assert!(output.contains("reportrelay_http_requests_total"));
        assert!(output.contains("reportrelay_scheduler_active"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_includes_core_metrics() {
        reportrelay_core::metrics::RUN_IN_PROGRESS.set(0);
        reportrelay_core::metrics::RUNS
            .with_label_values(&["success"])
            .inc_by(0);

        let output = encode_metrics();
        assert!(output.contains("reportrelay_run_in_progress"));
        assert!(output.contains("reportrelay_runs_total"));
    }
}
