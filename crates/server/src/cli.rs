//! Command-line interface.

use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand};

use reportrelay_core::config::DateRangeConfig;
use reportrelay_core::{DateRange, DateRangeError};

#[derive(Parser, Debug)]
#[command(name = "reportrelay")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file
    #[arg(
        short,
        long,
        env = "REPORTRELAY_CONFIG",
        default_value = "reportrelay.toml",
        global = true
    )]
    pub config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the workflow once and exit
    Run {
        /// First report day, MM/DD/YYYY
        #[arg(long)]
        start_date: Option<String>,

        /// Last report day, MM/DD/YYYY (defaults to today)
        #[arg(long)]
        end_date: Option<String>,
    },

    /// Run the daily scheduler and the control API until interrupted
    Serve,

    /// Check the configuration file and exit
    ValidateConfig,

    /// Authenticate against the document library and check the target folder
    TestUpload,

    /// Check that the automation host is reachable
    TestExtraction,

    /// Look for a report in the watched directories
    TestDetection,

    /// Transform, upload and back up an existing report
    Process {
        /// Report file to process
        file: PathBuf,
    },

    /// Delete backups older than the retention period
    Cleanup {
        /// Age limit in days (defaults to backup.retention_days)
        #[arg(long)]
        days: Option<u32>,
    },
}

/// Date range requested by a caller. `None` when neither bound is given, so
/// the configured range is resolved at run time.
pub fn requested_range(
    configured: &DateRangeConfig,
    start_date: Option<String>,
    end_date: Option<String>,
) -> Result<Option<DateRange>, DateRangeError> {
    if start_date.is_none() && end_date.is_none() {
        return Ok(None);
    }

    let requested = DateRangeConfig {
        start_date: start_date.unwrap_or_else(|| configured.start_date.clone()),
        end_date: end_date.or_else(|| configured.end_date.clone()),
    };
    requested.resolve(Local::now().date_naive()).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_dates() {
        let cli = Cli::parse_from([
            "reportrelay",
            "--config",
            "/etc/reportrelay.toml",
            "run",
            "--start-date",
            "08/01/2025",
            "--end-date",
            "08/03/2025",
        ]);

        assert_eq!(cli.config, PathBuf::from("/etc/reportrelay.toml"));
        match cli.command {
            Commands::Run {
                start_date,
                end_date,
            } => {
                assert_eq!(start_date.as_deref(), Some("08/01/2025"));
                assert_eq!(end_date.as_deref(), Some("08/03/2025"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["reportrelay", "cleanup", "--days", "7", "--log-json"]);
        assert!(cli.log_json);
        assert!(matches!(cli.command, Commands::Cleanup { days: Some(7) }));
    }

    #[test]
    fn test_requested_range_defaults_to_config() {
        let configured = DateRangeConfig::default();
        assert!(requested_range(&configured, None, None).unwrap().is_none());
    }

    #[test]
    fn test_requested_range_fills_missing_bound() {
        let configured = DateRangeConfig {
            start_date: "08/01/2025".to_string(),
            end_date: Some("08/10/2025".to_string()),
        };

        let range = requested_range(&configured, None, Some("08/05/2025".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(range.start_str(), "08/01/2025");
        assert_eq!(range.end_str(), "08/05/2025");
    }

    #[test]
    fn test_requested_range_rejects_bad_dates() {
        let configured = DateRangeConfig::default();
        assert!(requested_range(&configured, Some("2025-08-01".to_string()), None).is_err());
        assert!(requested_range(
            &configured,
            Some("08/05/2025".to_string()),
            Some("08/01/2025".to_string())
        )
        .is_err());
    }
}
