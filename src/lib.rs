//! Todo Forest
//!
//! Named lists, each holding a forest of tasks nested up to three levels.
//!
//! Layered architecture:
//! - domain: Core entities, identifiers and error taxonomy
//! - forest: Per-list tree index, completion gate and mutation engine
//! - registry: Synchronous multi-list entry point
//! - service: Concurrent host with the persistence seam
//! - commands: JSON command envelope
//! - config: Environment configuration

pub mod commands;
pub mod config;
pub mod domain;
pub mod forest;
pub mod registry;
pub mod service;

pub use commands::{execute, execute_json, Command, ErrorBody, Response};
pub use config::{Config, ConfigError};
pub use domain::{EngineError, EngineResult, Item, ItemId, Level, ListId, TodoList};
pub use forest::{ItemNode, ItemSummary, ListEngine, ListSnapshot};
pub use registry::ListRegistry;
pub use service::{MemoryBackend, ServiceError, TodoBackend, TodoService};

/// Install the rolling file logger when a log directory is configured
///
/// Returns whether a logger was installed.
pub fn init_logging(config: &Config) -> Result<bool, rolling_logger::LoggerError> {
    match config.logging.logger_config() {
        Some(logger) => {
            let path = logger.log_path();
            rolling_logger::init_with_config(logger)?;
            log::info!("Logging to {}", path.display());
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging() {
        assert!(matches!(init_logging(&Config::default()), Ok(false)));

        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.logging.dir = Some(dir.path().to_path_buf());
        assert!(matches!(init_logging(&config), Ok(true)));
        assert!(dir.path().join("todo-forest.log").exists());

        log::info!("forest ready");
        assert!(rolling_logger::recent_lines()
            .iter()
            .any(|line| line.contains("forest ready")));
    }
}
