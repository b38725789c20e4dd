use chrono::Local;
use regex_lite::Regex;

use super::{types::Config, ConfigError};

const RUN_TIME_PATTERN: &str = r"^([01]?[0-9]|2[0-3]):[0-5][0-9]$";

/// Graph upload sessions require chunks in multiples of 320 KiB.
pub const CHUNK_ALIGNMENT: u64 = 320 * 1024;

/// Validate configuration
///
/// Every problem found is reported in a single `ValidationError`, one per
/// line.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if let Err(e) = config.date_range.resolve(Local::now().date_naive()) {
        errors.push(format!("date_range: {}", e));
    }

    let run_time_ok = Regex::new(RUN_TIME_PATTERN)
        .map(|re| re.is_match(config.schedule.run_time.trim()))
        .unwrap_or(false);
    if !run_time_ok {
        errors.push(format!(
            "schedule.run_time '{}' must be HH:MM",
            config.schedule.run_time
        ));
    }
    if config.schedule.check_interval_secs == 0 {
        errors.push("schedule.check_interval_secs cannot be 0".to_string());
    }
    if let Some(retry) = &config.schedule.retry {
        if retry.max_attempts == 0 {
            errors.push("schedule.retry.max_attempts must be at least 1".to_string());
        }
    }

    if config.paths.download_dir.as_os_str().is_empty() {
        errors.push("paths.download_dir cannot be empty".to_string());
    }
    if config.paths.backup_dir.as_os_str().is_empty() {
        errors.push("paths.backup_dir cannot be empty".to_string());
    }

    if config.extraction.retry.max_attempts == 0 {
        errors.push("extraction.retry.max_attempts must be at least 1".to_string());
    }
    if config.extraction.timeout_secs == 0 {
        errors.push("extraction.timeout_secs cannot be 0".to_string());
    }
    if config.extraction.probe_template_path.is_none() && config.extraction.probe_args.is_empty() {
        errors.push(
            "extraction.probe_template_path or extraction.probe_args is required".to_string(),
        );
    }

    if !config.transform.is_configured() {
        errors.push("transform.command is required".to_string());
    }

    if config.locator.extensions.is_empty() {
        errors.push("locator.extensions cannot be empty".to_string());
    }
    if config.locator.poll_interval_ms == 0 {
        errors.push("locator.poll_interval_ms cannot be 0".to_string());
    }

    let upload = &config.upload;
    if upload.is_configured() && upload.site_parts().is_none() {
        errors.push(format!(
            "upload.site_url '{}' must be an absolute URL with a host",
            upload.site_url
        ));
    }
    if upload.chunk_size_bytes == 0 {
        errors.push("upload.chunk_size_bytes cannot be 0".to_string());
    } else if upload.chunk_size_bytes % CHUNK_ALIGNMENT != 0 {
        errors.push(format!(
            "upload.chunk_size_bytes must be a multiple of {} bytes",
            CHUNK_ALIGNMENT
        ));
    }
    if upload.retry.max_attempts == 0 {
        errors.push("upload.retry.max_attempts must be at least 1".to_string());
    }

    if config.server.port == 0 {
        errors.push("server.port cannot be 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TransformConfig;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.transform = TransformConfig::with_command("clean-report", vec![]);
        config
    }

    fn validation_message(config: &Config) -> String {
        match validate_config(config) {
            Err(ConfigError::ValidationError(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_run_time() {
        for good in ["08:00", "8:05", "23:59", "00:00"] {
            let mut config = valid_config();
            config.schedule.run_time = good.to_string();
            assert!(validate_config(&config).is_ok(), "{}", good);
        }
        for bad in ["24:00", "08:60", "8", "noon", ""] {
            let mut config = valid_config();
            config.schedule.run_time = bad.to_string();
            assert!(validation_message(&config).contains("schedule.run_time"), "{}", bad);
        }
    }

    #[test]
    fn test_validate_inverted_dates() {
        let mut config = valid_config();
        config.date_range.start_date = "08/05/2025".to_string();
        config.date_range.end_date = Some("08/03/2025".to_string());
        assert!(validation_message(&config).contains("date_range"));
    }

    #[test]
    fn test_validate_blank_end_date_means_today() {
        let mut config = valid_config();
        config.date_range.start_date = "08/03/2025".to_string();
        config.date_range.end_date = Some(String::new());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_start_date_after_today() {
        let mut config = valid_config();
        config.date_range.start_date = "01/01/2999".to_string();
        config.date_range.end_date = None;
        assert!(validation_message(&config).contains("date_range"));
    }

    #[test]
    fn test_validate_requires_availability_check() {
        let mut config = valid_config();
        config.extraction.probe_template_path = None;
        config.extraction.probe_args = Vec::new();
        assert!(validation_message(&config).contains("extraction.probe_template_path"));

        config.extraction.probe_args = vec!["//B".to_string(), "check.vbs".to_string()];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_reports_all_problems() {
        let mut config = valid_config();
        config.server.port = 0;
        config.upload.chunk_size_bytes = 1000;
        config.transform = TransformConfig::default();

        let msg = validation_message(&config);
        assert!(msg.contains("server.port"));
        assert!(msg.contains("upload.chunk_size_bytes"));
        assert!(msg.contains("transform.command"));
        assert_eq!(msg.lines().count(), 3);
    }

    #[test]
    fn test_validate_upload_url() {
        let mut config = valid_config();
        config.upload.site_url = "not a url".to_string();
        config.upload.username = "bot".to_string();
        config.upload.password = "pw".to_string();
        assert!(validation_message(&config).contains("upload.site_url"));
    }

    #[test]
    fn test_unconfigured_upload_is_valid() {
        let mut config = valid_config();
        config.upload.site_url = "n/A".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
