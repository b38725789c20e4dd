//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Daily fire time, `HH:MM` (24h, local time).
    #[serde(default = "default_run_time")]
    pub run_time: String,

    /// How often the loop wakes up to compare the clock.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Start the scheduler when the server starts.
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,

    /// How long `stop` waits for the loop to exit.
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,

    /// Per-firing retry. Absent means a failed firing waits for the next day.
    #[serde(default)]
    pub retry: Option<ScheduleRetryConfig>,
}

fn default_run_time() -> String {
    "08:00".to_string()
}

fn default_check_interval() -> u64 {
    30
}

fn default_auto_start() -> bool {
    true
}

fn default_stop_timeout() -> u64 {
    5
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            run_time: default_run_time(),
            check_interval_secs: default_check_interval(),
            auto_start: default_auto_start(),
            stop_timeout_secs: default_stop_timeout(),
            retry: None,
        }
    }
}

impl ScheduleConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn with_run_time(mut self, run_time: impl Into<String>) -> Self {
        self.run_time = run_time.into();
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, delay_secs: u64) -> Self {
        self.retry = Some(ScheduleRetryConfig {
            max_attempts,
            delay_secs,
        });
        self
    }
}

/// Retry policy applied to each firing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay")]
    pub delay_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    900 // 15 minutes
}

impl Default for ScheduleRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_retry_delay(),
        }
    }
}
