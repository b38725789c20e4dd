use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::backup::BackupConfig;
use crate::date_range::{DateRange, DateRangeError};
use crate::extraction::ExtractionConfig;
use crate::locator::LocatorConfig;
use crate::orchestrator::WorkflowConfig;
use crate::scheduler::ScheduleConfig;
use crate::transform::TransformConfig;
use crate::upload::UploadConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub date_range: DateRangeConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub locator: LocatorConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Report date range, `MM/DD/YYYY`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DateRangeConfig {
    #[serde(default = "default_start_date")]
    pub start_date: String,
    /// Today when absent.
    #[serde(default)]
    pub end_date: Option<String>,
}

fn default_start_date() -> String {
    "08/03/2025".to_string()
}

impl Default for DateRangeConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            end_date: None,
        }
    }
}

impl DateRangeConfig {
    /// Resolves the configured range, using `today` for a missing end date.
    pub fn resolve(&self, today: chrono::NaiveDate) -> Result<DateRange, DateRangeError> {
        let end = match &self.end_date {
            Some(end) if !end.trim().is_empty() => end.clone(),
            _ => crate::date_range::format_date(today),
        };
        DateRange::parse(&self.start_date, &end)
    }
}

/// Directory layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Primary directory the extraction writes to.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Searched after the primary directory, in order.
    #[serde(default = "default_fallback_dirs")]
    pub fallback_dirs: Vec<PathBuf>,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    /// Where transformed artifacts are written.
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_fallback_dirs() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from);
    match home {
        Some(home) => vec![home.join("Downloads"), home.join("Desktop")],
        None => Vec::new(),
    }
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backup")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("processed")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            fallback_dirs: default_fallback_dirs(),
            backup_dir: default_backup_dir(),
            processed_dir: default_processed_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Control API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    8085
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub date_range: DateRangeConfig,
    pub paths: PathsConfig,
    pub schedule: ScheduleConfig,
    pub workflow: WorkflowConfig,
    pub extraction: SanitizedExtractionConfig,
    pub locator: LocatorConfig,
    pub transform: TransformConfig,
    pub upload: SanitizedUploadConfig,
    pub backup: BackupConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedExtractionConfig {
    pub interpreter: PathBuf,
    pub template_path: PathBuf,
    pub output_filename: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

/// Upload config with the password hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUploadConfig {
    pub site_url: String,
    pub username: String,
    pub password_configured: bool,
    pub folder_path: String,
    pub configured: bool,
    pub chunk_size_bytes: u64,
    pub simple_upload_limit_bytes: u64,
    pub max_attempts: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            date_range: config.date_range.clone(),
            paths: config.paths.clone(),
            schedule: config.schedule.clone(),
            workflow: config.workflow.clone(),
            extraction: SanitizedExtractionConfig {
                interpreter: config.extraction.interpreter.clone(),
                template_path: config.extraction.template_path.clone(),
                output_filename: config.extraction.output_filename.clone(),
                timeout_secs: config.extraction.timeout_secs,
                max_attempts: config.extraction.retry.max_attempts,
            },
            locator: config.locator.clone(),
            transform: config.transform.clone(),
            upload: SanitizedUploadConfig {
                site_url: config.upload.site_url.clone(),
                username: config.upload.username.clone(),
                password_configured: !config.upload.password.is_empty(),
                folder_path: config.upload.folder_path.clone(),
                configured: config.upload.is_configured(),
                chunk_size_bytes: config.upload.chunk_size_bytes,
                simple_upload_limit_bytes: config.upload.simple_upload_limit_bytes,
                max_attempts: config.upload.retry.max_attempts,
            },
            backup: config.backup.clone(),
            logging: config.logging.clone(),
            server: config.server.clone(),
        }
    }
}
