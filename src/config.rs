//! Configuration
//!
//! Read from environment variables:
//! - `TODO_FOREST_LOG_DIR` - Optional. Enables file logging into this directory.
//! - `TODO_FOREST_LOG_LEVEL` - Optional. `off`, `error`, `warn`, `info`, `debug` or `trace`. Defaults to `info`.
//! - `TODO_FOREST_LOG_MAX_BYTES` - Optional. Size at which the log file rotates. Defaults to 1 MiB.
//! - `TODO_FOREST_LOG_FILES` - Optional. Rotated files kept next to the live one. Defaults to `5`.
//! - `TODO_FOREST_LOG_BUFFER` - Optional. Recent log lines kept in memory. Defaults to `200`.

use std::path::PathBuf;
use std::str::FromStr;

use rolling_logger::LoggerConfig;
use thiserror::Error;

pub const APP_NAME: &str = "todo-forest";

const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;
const DEFAULT_MAX_FILES: usize = 5;
const DEFAULT_BUFFER_LINES: usize = 200;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// No directory means no file logging
    pub dir: Option<PathBuf>,
    pub level: log::LevelFilter,
    pub max_file_bytes: u64,
    pub max_files: usize,
    pub buffer_lines: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            level: log::LevelFilter::Info,
            max_file_bytes: DEFAULT_MAX_BYTES,
            max_files: DEFAULT_MAX_FILES,
            buffer_lines: DEFAULT_BUFFER_LINES,
        }
    }
}

impl LoggingConfig {
    /// Settings for the rolling logger, if file logging is enabled
    pub fn logger_config(&self) -> Option<LoggerConfig> {
        let dir = self.dir.as_ref()?;
        let mut config = LoggerConfig::new(dir.clone(), APP_NAME);
        config.level = self.level;
        config.max_file_bytes = self.max_file_bytes;
        config.max_files = self.max_files;
        config.buffer_lines = self.buffer_lines;
        Some(config)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = LoggingConfig::default();

        let logging = LoggingConfig {
            dir: get("TODO_FOREST_LOG_DIR").map(PathBuf::from),
            level: parse_or("TODO_FOREST_LOG_LEVEL", get("TODO_FOREST_LOG_LEVEL"), defaults.level)?,
            max_file_bytes: parse_or(
                "TODO_FOREST_LOG_MAX_BYTES",
                get("TODO_FOREST_LOG_MAX_BYTES"),
                defaults.max_file_bytes,
            )?,
            max_files: parse_or(
                "TODO_FOREST_LOG_FILES",
                get("TODO_FOREST_LOG_FILES"),
                defaults.max_files,
            )?,
            buffer_lines: parse_or(
                "TODO_FOREST_LOG_BUFFER",
                get("TODO_FOREST_LOG_BUFFER"),
                defaults.buffer_lines,
            )?,
        };
        Ok(Self { logging })
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}", e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.logging.logger_config().is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("TODO_FOREST_LOG_DIR", "/tmp/forest"),
            ("TODO_FOREST_LOG_LEVEL", "debug"),
            ("TODO_FOREST_LOG_MAX_BYTES", "4096"),
            ("TODO_FOREST_LOG_FILES", " 2 "),
        ])
        .unwrap();

        let logger = config.logging.logger_config().unwrap();
        assert_eq!(logger.dir, PathBuf::from("/tmp/forest"));
        assert_eq!(logger.app_name, APP_NAME);
        assert_eq!(logger.level, log::LevelFilter::Debug);
        assert_eq!(logger.max_file_bytes, 4096);
        assert_eq!(logger.max_files, 2);
        assert_eq!(logger.buffer_lines, DEFAULT_BUFFER_LINES);
    }

    #[test]
    fn test_blank_dir_disables_logging() {
        let config = config(&[("TODO_FOREST_LOG_DIR", "  ")]).unwrap();
        assert_eq!(config.logging.dir, None);
    }

    #[test]
    fn test_invalid_values() {
        let err = config(&[("TODO_FOREST_LOG_FILES", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "TODO_FOREST_LOG_FILES"));

        let err = config(&[("TODO_FOREST_LOG_LEVEL", "loud")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "TODO_FOREST_LOG_LEVEL"));
    }
}
