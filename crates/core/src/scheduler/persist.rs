//! TOML-backed schedule persistence.

use std::path::PathBuf;

use super::error::SchedulerError;
use super::traits::SchedulePersister;
use crate::config::update_run_time_in_file;

/// Rewrites `schedule.run_time` in a TOML config file.
pub struct TomlSchedulePersister {
    path: PathBuf,
}

impl TomlSchedulePersister {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SchedulePersister for TomlSchedulePersister {
    fn persist_run_time(&self, run_time: &str) -> Result<(), SchedulerError> {
        update_run_time_in_file(&self.path, run_time)
            .map_err(|e| SchedulerError::Persist(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_persist_keeps_other_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reportrelay.toml");
        std::fs::write(
            &path,
            "[schedule]\nrun_time = \"08:00\"\ncheck_interval_secs = 15\n\n[server]\nport = 9000\n",
        )
        .unwrap();

        TomlSchedulePersister::new(&path)
            .persist_run_time("09:45")
            .unwrap();

        let config = crate::config::load_config_from_str(&std::fs::read_to_string(&path).unwrap())
            .unwrap();
        assert_eq!(config.schedule.run_time, "09:45");
        assert_eq!(config.schedule.check_interval_secs, 15);
        assert_eq!(config.server.port, 9000);
    }
}
