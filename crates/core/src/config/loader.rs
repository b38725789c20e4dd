use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
///
/// Nested keys use a double underscore, e.g. `REPORTRELAY_SCHEDULE__RUN_TIME`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("REPORTRELAY_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Write the full configuration as TOML.
pub fn save_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::WriteError(e.to_string()))?;
    std::fs::write(path, content)
        .map_err(|e| ConfigError::WriteError(format!("{}: {}", path.display(), e)))
}

/// Set `schedule.run_time` in a config file, leaving other keys as they are.
/// A missing file is created.
pub fn update_run_time_in_file(path: &Path, run_time: &str) -> Result<(), ConfigError> {
    let mut table = if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        content
            .parse::<toml::Table>()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?
    } else {
        toml::Table::new()
    };

    let schedule = table
        .entry("schedule")
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    match schedule {
        toml::Value::Table(schedule) => {
            schedule.insert(
                "run_time".to_string(),
                toml::Value::String(run_time.to_string()),
            );
        }
        _ => {
            return Err(ConfigError::ParseError(
                "schedule must be a table".to_string(),
            ))
        }
    }

    let content =
        toml::to_string_pretty(&table).map_err(|e| ConfigError::WriteError(e.to_string()))?;
    std::fs::write(path, content)
        .map_err(|e| ConfigError::WriteError(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[server]
port = 9000
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_load_config_from_str_invalid() {
        let toml = r#"
[server]
port = "not a port"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[schedule]
run_time = "07:30"

[server]
host = "0.0.0.0"
port = 3000
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.schedule.run_time, "07:30");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reportrelay.toml");

        let mut config = Config::default();
        config.schedule.run_time = "17:05".to_string();
        config.paths.fallback_dirs = vec![];
        save_config(&path, &config).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.schedule.run_time, "17:05");
        assert!(loaded.paths.fallback_dirs.is_empty());
    }

    #[test]
    fn test_update_run_time_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.toml");

        update_run_time_in_file(&path, "10:10").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.schedule.run_time, "10:10");
    }
}
