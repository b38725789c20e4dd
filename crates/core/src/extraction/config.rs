//! Configuration for the extraction driver.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryConfig;

/// How the external extraction script is produced and run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Script interpreter binary.
    #[serde(default = "default_interpreter")]
    pub interpreter: PathBuf,

    /// Arguments placed before the script path.
    #[serde(default = "default_interpreter_args")]
    pub interpreter_args: Vec<String>,

    /// Template rendered into `script_path` before every attempt.
    #[serde(default = "default_template_path")]
    pub template_path: PathBuf,

    /// Where the rendered script is written.
    #[serde(default = "default_script_path")]
    pub script_path: PathBuf,

    /// Template for the availability check script. When unset the check
    /// runs the interpreter with `probe_args` alone.
    #[serde(default = "default_probe_template_path")]
    pub probe_template_path: Option<PathBuf>,

    #[serde(default)]
    pub probe_args: Vec<String>,

    /// Output file name; `{date}` becomes today's date as `MM-DD-YYYY`.
    #[serde(default = "default_output_filename")]
    pub output_filename: String,

    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Hard limit for one script run.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Budget handed to the script for waiting on its own export.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    #[serde(default = "RetryConfig::extraction")]
    pub retry: RetryConfig,
}

fn default_interpreter() -> PathBuf {
    PathBuf::from("cscript")
}

fn default_interpreter_args() -> Vec<String> {
    vec!["//NoLogo".to_string()]
}

fn default_template_path() -> PathBuf {
    PathBuf::from("scripts/zerf_automation.vbs.tmpl")
}

fn default_probe_template_path() -> Option<PathBuf> {
    Some(PathBuf::from("scripts/availability_probe.vbs.tmpl"))
}

fn default_script_path() -> PathBuf {
    PathBuf::from("scripts/zerf_automation.vbs")
}

fn default_output_filename() -> String {
    "zerf_{date}.xlsx".to_string()
}

fn default_probe_timeout_secs() -> u64 {
    30
}

fn default_timeout_secs() -> u64 {
    600 // 10 minutes
}

fn default_max_wait_secs() -> u64 {
    300
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            interpreter_args: default_interpreter_args(),
            template_path: default_template_path(),
            script_path: default_script_path(),
            probe_template_path: default_probe_template_path(),
            probe_args: Vec::new(),
            output_filename: default_output_filename(),
            probe_timeout_secs: default_probe_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            max_wait_secs: default_max_wait_secs(),
            retry: RetryConfig::extraction(),
        }
    }
}

impl ExtractionConfig {
    /// Creates a config for a custom interpreter.
    pub fn with_interpreter(interpreter: PathBuf, interpreter_args: Vec<String>) -> Self {
        Self {
            interpreter,
            interpreter_args,
            ..Default::default()
        }
    }

    /// Sets the template and rendered script locations.
    pub fn with_script(mut self, template_path: PathBuf, script_path: PathBuf) -> Self {
        self.template_path = template_path;
        self.script_path = script_path;
        self
    }

    /// Sets the hard timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExtractionConfig::default();
        assert_eq!(config.interpreter, PathBuf::from("cscript"));
        assert_eq!(config.interpreter_args, vec!["//NoLogo"]);
        assert_eq!(config.timeout(), Duration::from_secs(600));
        assert_eq!(config.probe_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.probe_template_path,
            Some(PathBuf::from("scripts/availability_probe.vbs.tmpl"))
        );
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay_ms, 4_000);
        assert_eq!(config.retry.max_delay_ms, 10_000);
    }

    #[test]
    fn test_deserialize_overrides() {
        let config: ExtractionConfig = toml::from_str(
            r#"
interpreter = "/usr/bin/wscript"
timeout_secs = 120

[retry]
max_attempts = 5
"#,
        )
        .unwrap();
        assert_eq!(config.interpreter, PathBuf::from("/usr/bin/wscript"));
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.output_filename, "zerf_{date}.xlsx");
    }
}
