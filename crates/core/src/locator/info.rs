//! File inspection helpers used by diagnostics and the CLI.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::io::AsyncReadExt;

use super::error::LocatorError;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm"];
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Snapshot of a file's metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub created: Option<DateTime<Local>>,
    pub modified: Option<DateTime<Local>>,
    pub is_spreadsheet: bool,
    pub accessible: bool,
    /// Hex MD5 of the content, absent when the file could not be read.
    pub md5: Option<String>,
}

/// Collects size, timestamps and an MD5 digest for `path`.
pub async fn artifact_info(path: &Path) -> Result<ArtifactInfo, LocatorError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| LocatorError::Inspect {
            path: path.to_path_buf(),
            source,
        })?;

    let md5 = md5_file(path).await.ok();
    let is_spreadsheet = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false);

    Ok(ArtifactInfo {
        path: path.to_path_buf(),
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size: metadata.len(),
        created: metadata.created().ok().map(DateTime::<Local>::from),
        modified: metadata.modified().ok().map(DateTime::<Local>::from),
        is_spreadsheet,
        accessible: md5.is_some(),
        md5,
    })
}

async fn md5_file(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        context.consume(&buffer[..n]);
    }

    Ok(format!("{:x}", context.compute()))
}
