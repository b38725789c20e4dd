//! Workflow configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing knobs for a workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Pause between a successful extraction and artifact detection.
    /// The external producer keeps writing after its process exits.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,

    /// Wait budget for artifact detection.
    #[serde(default = "default_artifact_wait")]
    pub artifact_wait_secs: u64,

    /// Only accept artifacts whose name contains this substring.
    #[serde(default)]
    pub artifact_pattern: Option<String>,

    /// Check that the located artifact stopped changing before transforming it.
    #[serde(default = "default_require_stable")]
    pub require_stable_artifact: bool,

    /// Wait budget used by the detection self-test.
    #[serde(default = "default_test_detection_wait")]
    pub test_detection_wait_secs: u64,
}

fn default_settle_delay() -> u64 {
    10
}

fn default_artifact_wait() -> u64 {
    300 // 5 minutes
}

fn default_require_stable() -> bool {
    true
}

fn default_test_detection_wait() -> u64 {
    60
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            settle_delay_secs: default_settle_delay(),
            artifact_wait_secs: default_artifact_wait(),
            artifact_pattern: None,
            require_stable_artifact: default_require_stable(),
            test_detection_wait_secs: default_test_detection_wait(),
        }
    }
}

impl WorkflowConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn artifact_wait(&self) -> Duration {
        Duration::from_secs(self.artifact_wait_secs)
    }

    pub fn test_detection_wait(&self) -> Duration {
        Duration::from_secs(self.test_detection_wait_secs)
    }

    /// Disables the settle delay and stability check (for tests).
    pub fn immediate(artifact_wait_secs: u64) -> Self {
        Self {
            settle_delay_secs: 0,
            artifact_wait_secs,
            artifact_pattern: None,
            require_stable_artifact: false,
            test_detection_wait_secs: artifact_wait_secs,
        }
    }
}
