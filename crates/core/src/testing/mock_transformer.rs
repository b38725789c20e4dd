//! Mock transformer for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::transform::{TransformError, TransformOutput, Transformer};

/// Mock implementation of the Transformer trait.
///
/// Copies the input into `output_dir` as `<stem>_cleaned.<ext>`, or fails
/// when told to.
#[derive(Debug)]
pub struct MockTransformer {
    output_dir: PathBuf,
    fail: AtomicBool,
    inputs: Mutex<Vec<PathBuf>>,
}

impl MockTransformer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            fail: AtomicBool::new(false),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Inputs seen so far.
    pub fn inputs(&self) -> Vec<PathBuf> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transformer for MockTransformer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transform(&self, input: &Path) -> Result<TransformOutput, TransformError> {
        self.inputs.lock().unwrap().push(input.to_path_buf());

        if self.fail.load(Ordering::SeqCst) {
            return Err(TransformError::failed(Some(2), "missing required columns"));
        }
        if !input.exists() {
            return Err(TransformError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = input
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let output = self.output_dir.join(format!("{}_cleaned{}", stem, extension));

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let size = tokio::fs::copy(input, &output).await?;

        Ok(TransformOutput {
            path: output,
            size,
            duration_ms: 0,
        })
    }
}
