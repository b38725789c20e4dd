//! Configuration for the artifact locator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Polling and filtering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Accepted file extensions, without the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Case-insensitive name fragments marking files still being written
    /// or owned by an editor.
    #[serde(default = "default_transient_markers")]
    pub transient_markers: Vec<String>,

    /// Maximum age of an acceptable candidate, in seconds.
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,

    /// Sleep between two scans, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive unchanged observations required by `wait_for_stability`.
    #[serde(default = "default_stability_checks")]
    pub stability_checks: u32,

    /// Interval between stability observations, in milliseconds.
    #[serde(default = "default_stability_interval_ms")]
    pub stability_interval_ms: u64,

    /// Default budget for `wait_for_stability`, in seconds.
    #[serde(default = "default_stability_max_wait_secs")]
    pub stability_max_wait_secs: u64,
}

fn default_extensions() -> Vec<String> {
    vec!["xlsx".to_string(), "xls".to_string()]
}

fn default_transient_markers() -> Vec<String> {
    ["~$", ".~lock.", ".tmp", ".temp", ".crdownload", ".partial"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_freshness_secs() -> u64 {
    3600
}

fn default_poll_interval_ms() -> u64 {
    10_000
}

fn default_stability_checks() -> u32 {
    3
}

fn default_stability_interval_ms() -> u64 {
    2_000
}

fn default_stability_max_wait_secs() -> u64 {
    30
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            transient_markers: default_transient_markers(),
            freshness_secs: default_freshness_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            stability_checks: default_stability_checks(),
            stability_interval_ms: default_stability_interval_ms(),
            stability_max_wait_secs: default_stability_max_wait_secs(),
        }
    }
}

impl LocatorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    pub fn stability_interval(&self) -> Duration {
        Duration::from_millis(self.stability_interval_ms)
    }

    pub fn stability_max_wait(&self) -> Duration {
        Duration::from_secs(self.stability_max_wait_secs)
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Sets the freshness threshold.
    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness_secs = freshness.as_secs();
        self
    }

    /// Sets the stability check count and interval.
    pub fn with_stability(mut self, checks: u32, interval: Duration) -> Self {
        self.stability_checks = checks;
        self.stability_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Whether `extension` (with or without a leading dot) is accepted.
    pub fn accepts_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}
