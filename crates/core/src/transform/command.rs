//! Transformer backed by an external command.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::config::TransformConfig;
use super::error::TransformError;
use super::traits::Transformer;
use super::types::TransformOutput;

pub struct CommandTransformer {
    config: TransformConfig,
    output_dir: PathBuf,
}

impl CommandTransformer {
    /// Outputs are written to `output_dir`.
    pub fn new(config: TransformConfig, output_dir: PathBuf) -> Self {
        Self { config, output_dir }
    }

    /// `<output_dir>/<stem><suffix>.<ext>`
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        let name = match input.extension() {
            Some(ext) => format!(
                "{}{}.{}",
                stem,
                self.config.output_suffix,
                ext.to_string_lossy()
            ),
            None => format!("{}{}", stem, self.config.output_suffix),
        };
        self.output_dir.join(name)
    }

    fn build_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.display().to_string();
        let output = output.display().to_string();
        let templated = self
            .config
            .args
            .iter()
            .any(|a| a.contains("{input}") || a.contains("{output}"));

        let mut args: Vec<String> = self
            .config
            .args
            .iter()
            .map(|a| a.replace("{input}", &input).replace("{output}", &output))
            .collect();
        if !templated {
            args.push(input);
            args.push(output);
        }
        args
    }
}

#[async_trait]
impl Transformer for CommandTransformer {
    fn name(&self) -> &str {
        "command"
    }

    async fn transform(&self, input: &Path) -> Result<TransformOutput, TransformError> {
        if !input.exists() {
            return Err(TransformError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        let start = Instant::now();
        let output_path = self.output_path(input);
        tokio::fs::create_dir_all(&self.output_dir).await?;
        match tokio::fs::remove_file(&output_path).await {
            Ok(()) => debug!("Removed previous output {}", output_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(TransformError::Io(e)),
        }

        let args = self.build_args(input, &output_path);
        debug!("Transform command: {} {:?}", self.config.command, args);

        let child = Command::new(&self.config.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TransformError::CommandNotFound {
                        command: self.config.command.clone(),
                    }
                } else {
                    TransformError::Io(e)
                }
            })?;

        let output = tokio::time::timeout(self.config.timeout(), child.wait_with_output())
            .await
            .map_err(|_| TransformError::Timeout {
                timeout_secs: self.config.timeout_secs,
            })??;

        if !output.status.success() {
            return Err(TransformError::failed(
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        let size = match tokio::fs::metadata(&output_path).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => {
                return Err(TransformError::MissingOutput { path: output_path });
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Transformed {} -> {} in {}ms",
            input.display(),
            output_path.display(),
            duration_ms
        );

        Ok(TransformOutput {
            path: output_path,
            size,
            duration_ms,
        })
    }
}
