//! Timestamped backup copies.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, info, warn};

use super::config::BackupConfig;
use super::error::BackupError;

/// One completed backup.
#[derive(Debug, Clone, Serialize)]
pub struct BackupRecord {
    pub source: PathBuf,
    pub path: PathBuf,
    pub kind: String,
    pub size: u64,
    pub md5: String,
}

/// `{stem}_{kind}_{YYYYMMDD_HHMMSS}{.ext}`
pub fn backup_file_name(source: &Path, kind: &str, at: DateTime<Local>) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let extension = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{}_{}_{}{}", stem, kind, at.format("%Y%m%d_%H%M%S"), extension)
}

/// Copies artifacts into a backup directory.
pub struct BackupStore {
    config: BackupConfig,
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(config: BackupConfig, dir: PathBuf) -> Self {
        Self { config, dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Picks a destination that does not exist yet, adding `-N` when two
    /// backups land in the same second.
    async fn destination(&self, source: &Path, kind: &str) -> PathBuf {
        let name = backup_file_name(source, kind, Local::now());
        let mut candidate = self.dir.join(&name);
        let mut counter = 1;
        while fs::try_exists(&candidate).await.unwrap_or(false) {
            let path = Path::new(&name);
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let extension = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            candidate = self.dir.join(format!("{}-{}{}", stem, counter, extension));
            counter += 1;
        }
        candidate
    }

    /// Copies `source` into the backup directory, verifying the byte count.
    pub async fn backup(&self, source: &Path, kind: &str) -> Result<BackupRecord, BackupError> {
        let expected = match fs::metadata(source).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                return Err(BackupError::SourceNotFound {
                    path: source.to_path_buf(),
                })
            }
        };

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BackupError::DirectoryCreationFailed {
                path: self.dir.clone(),
                source: e,
            })?;

        let destination = self.destination(source, kind).await;
        let (written, md5) = self.copy_file(source, &destination).await?;

        if written != expected {
            let _ = fs::remove_file(&destination).await;
            return Err(BackupError::SizeMismatch {
                path: destination,
                expected,
                actual: written,
            });
        }

        info!(
            "Backed up {} as {}",
            source.display(),
            destination.display()
        );
        Ok(BackupRecord {
            source: source.to_path_buf(),
            path: destination,
            kind: kind.to_string(),
            size: written,
            md5,
        })
    }

    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<(u64, String), BackupError> {
        let source_file = File::open(source).await.map_err(|e| {
            BackupError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;
        let dest_file = File::create(destination).await.map_err(|e| {
            BackupError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;

        let buffer_size = self.config.buffer_size.max(4096);
        let mut reader = BufReader::with_capacity(buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(buffer_size, dest_file);
        let mut context = md5::Context::new();
        let mut buffer = vec![0u8; buffer_size];
        let mut total = 0u64;

        loop {
            let n = reader.read(&mut buffer).await.map_err(|e| {
                BackupError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;
            if n == 0 {
                break;
            }
            writer.write_all(&buffer[..n]).await.map_err(|e| {
                BackupError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;
            context.consume(&buffer[..n]);
            total += n as u64;
        }

        writer.flush().await.map_err(|e| {
            BackupError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;

        Ok((total, format!("{:x}", context.compute())))
    }

    /// Deletes backups older than the configured retention.
    pub async fn cleanup(&self) -> Result<usize, BackupError> {
        cleanup_older_than(&self.dir, self.config.retention_days).await
    }
}

/// Deletes regular files in `dir` last modified more than `days` ago.
/// A missing directory counts as nothing to clean.
pub async fn cleanup_older_than(dir: &Path, days: u32) -> Result<usize, BackupError> {
    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(u64::from(days) * 24 * 60 * 60))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if modified < cutoff {
            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    debug!("Removed old file {}", entry.path().display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
            }
        }
    }

    if removed > 0 {
        info!("Cleaned up {} files older than {} days in {}", removed, days, dir.display());
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_backup_file_name() {
        let at = Local.with_ymd_and_hms(2025, 8, 3, 8, 5, 9).unwrap();
        assert_eq!(
            backup_file_name(Path::new("/dl/zerf_08-03-2025.xlsx"), "original", at),
            "zerf_08-03-2025_original_20250803_080509.xlsx"
        );
        assert_eq!(
            backup_file_name(Path::new("/dl/raw"), "processed", at),
            "raw_processed_20250803_080509"
        );
    }

    #[tokio::test]
    async fn test_backup_copies_content() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("zerf.xlsx");
        std::fs::write(&source, b"hello").unwrap();

        let store = BackupStore::new(BackupConfig::default(), dir.path().join("backup"));
        let record = store.backup(&source, "original").await.unwrap();

        assert_eq!(record.size, 5);
        assert_eq!(record.md5, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(std::fs::read(&record.path).unwrap(), b"hello");
        let name = record.path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("zerf_original_"));
        assert!(name.ends_with(".xlsx"));
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_backups_in_same_second_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("zerf.xlsx");
        std::fs::write(&source, b"data").unwrap();

        let store = BackupStore::new(BackupConfig::default(), dir.path().join("backup"));
        let first = store.backup(&source, "original").await.unwrap();
        let second = store.backup(&source, "original").await.unwrap();
        assert_ne!(first.path, second.path);
    }

    #[tokio::test]
    async fn test_backup_missing_source() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(BackupConfig::default(), dir.path().to_path_buf());
        let err = store
            .backup(&dir.path().join("missing.xlsx"), "original")
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::SourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_cleanup_keeps_recent_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("recent.xlsx"), b"x").unwrap();

        assert_eq!(cleanup_older_than(dir.path(), 30).await.unwrap(), 0);
        assert!(dir.path().join("recent.xlsx").exists());
    }

    #[tokio::test]
    async fn test_cleanup_zero_days_removes_everything_older_than_now() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.xlsx");
        std::fs::write(&path, b"x").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(cleanup_older_than(dir.path(), 0).await.unwrap(), 1);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_missing_dir() {
        assert_eq!(
            cleanup_older_than(Path::new("/nonexistent/backup"), 30)
                .await
                .unwrap(),
            0
        );
    }
}
