//! CLI runner for common setup.
//!
//! Encapsulates settings loading and logging initialization so command
//! handlers do not repeat them.

use std::path::Path;

use geocell::logging::{LoggingGuard, default_log_file, init_logging};
use tracing::info;

use crate::config::{self, Settings};
use crate::error::CliError;

/// Runner that manages CLI lifecycle.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded settings
    settings: Settings,
}

impl CliRunner {
    /// Create a new CLI runner, loading settings and initializing logging.
    ///
    /// With an explicit `config_path` the file must exist; without one the
    /// default location is tried and defaults apply when it is absent.
    /// Logs go to stderr and to a file under the config directory, never
    /// to stdout, which carries cell output.
    pub fn new(config_path: Option<&Path>, debug_mode: bool) -> Result<Self, CliError> {
        let settings = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Settings::load_from(path).map_err(|e| CliError::Config(e.to_string()))?
            }
            None => Settings::load().map_err(|e| CliError::Config(e.to_string()))?,
        };

        let level = if debug_mode {
            "debug"
        } else {
            &settings.logging.level
        };

        let log_dir = config::log_directory();
        let logging_guard = init_logging(&log_dir.to_string_lossy(), default_log_file(), level)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            settings,
        })
    }

    /// Get the loaded settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("geocell v{}", geocell::VERSION);
        info!("geocell CLI: {} command", command);
    }
}
