use serde::Serialize;
use std::path::PathBuf;

/// The transformed artifact.
#[derive(Debug, Clone, Serialize)]
pub struct TransformOutput {
    pub path: PathBuf,
    pub size: u64,
    pub duration_ms: u64,
}
