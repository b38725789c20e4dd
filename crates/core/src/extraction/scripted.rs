//! Extractor that renders a script template and runs it through an
//! interpreter process.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Local;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::config::ExtractionConfig;
use super::error::ExtractionError;
use super::script::{script_variables, ScriptTemplate};
use super::traits::Extractor;
use super::types::{ExtractionOutcome, ExtractionRequest};

/// Lines of stdout kept in the outcome.
const STDOUT_TAIL_LINES: usize = 20;

/// Runs `interpreter [args] <script>` with a hard timeout.
pub struct ScriptedExtractor {
    config: ExtractionConfig,
}

impl ScriptedExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn command(&self, extra: &[String], script: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.config.interpreter);
        cmd.args(&self.config.interpreter_args)
            .args(extra)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(script) = script {
            cmd.arg(script);
        }
        cmd
    }

    /// Spawns and waits. Dropping the wait future on timeout kills the child.
    async fn execute(&self, mut cmd: Command, timeout: Duration) -> Result<Output, ExecError> {
        let child = cmd.spawn().map_err(ExecError::Spawn)?;
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(ExecError::Wait(e)),
            Err(_) => Err(ExecError::TimedOut),
        }
    }

    fn probe_script_path(&self) -> PathBuf {
        let dir = self
            .config
            .script_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let extension = self
            .config
            .script_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        dir.join(format!(
            "probe_{}_{}{}",
            std::process::id(),
            Local::now().format("%Y%m%d%H%M%S%3f"),
            extension
        ))
    }

    async fn write_script(path: &Path, content: &str) -> Result<(), ExtractionError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

enum ExecError {
    Spawn(std::io::Error),
    Wait(std::io::Error),
    TimedOut,
}

fn stdout_tail(output: &Output) -> String {
    let text = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDOUT_TAIL_LINES);
    lines[start..].join("\n")
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn probe(&self) -> Result<(), ExtractionError> {
        let timeout = self.config.probe_timeout();

        let probe_script = match &self.config.probe_template_path {
            Some(template_path) => {
                let template = ScriptTemplate::load(template_path).await?;
                let request = ExtractionRequest {
                    range: crate::date_range::DateRange::single_day(Local::now().date_naive()),
                    download_dir: PathBuf::new(),
                    output_filename: String::new(),
                    max_wait: timeout,
                    attempt: 1,
                    generated_at: Local::now(),
                };
                let path = self.probe_script_path();
                Self::write_script(&path, &template.render(&script_variables(&request))?).await?;
                Some(path)
            }
            None => None,
        };

        let cmd = self.command(&self.config.probe_args, probe_script.as_deref());
        let result = self.execute(cmd, timeout).await;

        if let Some(path) = &probe_script {
            if let Err(e) = tokio::fs::remove_file(path).await {
                debug!("Failed to remove probe script {}: {}", path.display(), e);
            }
        }

        match result {
            Ok(output) if output.status.success() => {
                debug!("Extraction probe succeeded");
                Ok(())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stdout = String::from_utf8_lossy(&output.stdout);
                let detail = if stderr.trim().is_empty() {
                    stdout.trim().to_string()
                } else {
                    stderr.trim().to_string()
                };
                Err(ExtractionError::unavailable(format!(
                    "probe exited with {}: {}",
                    output.status, detail
                )))
            }
            Err(ExecError::Spawn(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ExtractionError::unavailable(format!(
                    "interpreter not found: {}",
                    self.config.interpreter.display()
                )))
            }
            Err(ExecError::Spawn(e)) | Err(ExecError::Wait(e)) => {
                Err(ExtractionError::unavailable(format!("probe failed: {}", e)))
            }
            Err(ExecError::TimedOut) => Err(ExtractionError::unavailable(format!(
                "probe timed out after {}s",
                self.config.probe_timeout_secs
            ))),
        }
    }

    async fn run(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome, ExtractionError> {
        let start = Instant::now();

        let template = ScriptTemplate::load(&self.config.template_path).await?;
        let script = template.render(&script_variables(request))?;
        Self::write_script(&self.config.script_path, &script).await?;
        tokio::fs::create_dir_all(&request.download_dir).await?;

        info!(
            "Running extraction for {} (attempt {}) via {}",
            request.range,
            request.attempt,
            self.config.interpreter.display()
        );

        let cmd = self.command(&[], Some(&self.config.script_path));
        let output = match self.execute(cmd, self.config.timeout()).await {
            Ok(output) => output,
            Err(ExecError::Spawn(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExtractionError::unavailable(format!(
                    "interpreter not found: {}",
                    self.config.interpreter.display()
                )));
            }
            Err(ExecError::Spawn(e)) | Err(ExecError::Wait(e)) => {
                return Err(ExtractionError::Io(e))
            }
            Err(ExecError::TimedOut) => {
                warn!(
                    "Extraction script exceeded {}s, killed",
                    self.config.timeout_secs
                );
                return Err(ExtractionError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        if !output.status.success() {
            return Err(ExtractionError::script_failed(
                output.status.code(),
                &String::from_utf8_lossy(&output.stderr),
            ));
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("Extraction script finished in {}ms", duration_ms);

        Ok(ExtractionOutcome {
            script_path: self.config.script_path.clone(),
            expected_output: request.target_file(),
            duration_ms,
            stdout_tail: stdout_tail(&output),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::date_range::DateRange;
    use tempfile::TempDir;

    fn sh_config(dir: &TempDir, template: &str) -> ExtractionConfig {
        let template_path = dir.path().join("extract.sh.tmpl");
        std::fs::write(&template_path, template).unwrap();
        let mut config = ExtractionConfig::with_interpreter(PathBuf::from("sh"), vec![])
            .with_script(template_path, dir.path().join("scripts").join("extract.sh"))
            .with_timeout(5);
        config.probe_template_path = None;
        config.probe_args = vec!["-c".to_string(), "exit 0".to_string()];
        config
    }

    fn request(dir: &TempDir) -> ExtractionRequest {
        ExtractionRequest {
            range: DateRange::parse("08/03/2025", "08/03/2025").unwrap(),
            download_dir: dir.path().join("downloads"),
            output_filename: "zerf_08-03-2025.xlsx".to_string(),
            max_wait: Duration::from_secs(30),
            attempt: 1,
            generated_at: Local::now(),
        }
    }

    #[tokio::test]
    async fn test_run_renders_and_executes() {
        let dir = TempDir::new().unwrap();
        let extractor = ScriptedExtractor::new(sh_config(
            &dir,
            "echo \"${start_date}|${end_date}\" > \"${target_file}\"\necho done\n",
        ));

        let outcome = extractor.run(&request(&dir)).await.unwrap();

        let written = std::fs::read_to_string(&outcome.expected_output).unwrap();
        assert_eq!(written.trim(), "08/03/2025|08/03/2025");
        assert_eq!(outcome.stdout_tail, "done");
        assert!(dir.path().join("scripts").join("extract.sh").exists());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let dir = TempDir::new().unwrap();
        let extractor = ScriptedExtractor::new(sh_config(&dir, "echo oops >&2\nexit 3\n"));

        let err = extractor.run(&request(&dir)).await.unwrap_err();
        match err {
            ExtractionError::ScriptFailed { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_script() {
        let dir = TempDir::new().unwrap();
        let mut config = sh_config(&dir, "sleep 10\n");
        config.timeout_secs = 1;
        let extractor = ScriptedExtractor::new(config);

        let started = Instant::now();
        let err = extractor.run(&request(&dir)).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Timeout { timeout_secs: 1 }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_probe_success_and_failure() {
        let dir = TempDir::new().unwrap();
        let mut config = sh_config(&dir, "exit 0\n");
        assert!(ScriptedExtractor::new(config.clone()).probe().await.is_ok());

        config.probe_args = vec!["-c".to_string(), "exit 7".to_string()];
        let err = ScriptedExtractor::new(config).probe().await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_probe_template_is_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let mut config = sh_config(&dir, "exit 0\n");
        let probe_template = dir.path().join("probe.sh.tmpl");
        std::fs::write(&probe_template, "test -n \"${generated_at}\"\n").unwrap();
        config.probe_template_path = Some(probe_template);
        config.probe_args = vec![];

        ScriptedExtractor::new(config).probe().await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("scripts"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("probe_"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let mut config = sh_config(&dir, "exit 0\n");
        config.interpreter = PathBuf::from("/nonexistent/interpreter");

        let err = ScriptedExtractor::new(config).probe().await.unwrap_err();
        assert!(err.to_string().contains("interpreter not found"));
    }

    #[tokio::test]
    async fn test_missing_template_not_retryable() {
        let dir = TempDir::new().unwrap();
        let mut config = sh_config(&dir, "exit 0\n");
        config.template_path = dir.path().join("missing.tmpl");

        let err = ScriptedExtractor::new(config)
            .run(&request(&dir))
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
