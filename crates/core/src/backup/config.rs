//! Configuration for backups.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Age after which backups are deleted by cleanup.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Run cleanup after every successful run.
    #[serde(default)]
    pub cleanup_after_run: bool,

    /// Copy buffer size in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_retention_days() -> u32 {
    30
}

fn default_buffer_size() -> usize {
    64 * 1024
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            retention_days: default_retention_days(),
            cleanup_after_run: false,
            buffer_size: default_buffer_size(),
        }
    }
}
