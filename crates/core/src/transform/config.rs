//! Configuration for the external transform command.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Program implementing the transform rules.
    #[serde(default)]
    pub command: String,

    /// Arguments; `{input}` and `{output}` are substituted. When neither
    /// placeholder appears, input and output paths are appended.
    #[serde(default)]
    pub args: Vec<String>,

    /// Appended to the input stem to name the output.
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_output_suffix() -> String {
    "_cleaned".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            output_suffix: default_output_suffix(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TransformConfig {
    pub fn with_command(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            ..Default::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.command.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
