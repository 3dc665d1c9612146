//! CLI error handling with user-friendly messages.
//!
//! Centralizes error formatting and the exit-code contract: 0 for
//! success, 1 for a usage problem the caller can fix on the command
//! line, 2 for a runtime failure.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process;

use geocell::stream::StreamError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file problem
    Config(String),
    /// A command-line value was rejected
    InvalidArgument(String),
    /// Failed to open or create a named file
    File { path: PathBuf, error: io::Error },
    /// Streaming pipeline failure
    Stream(StreamError),
    /// Any other I/O failure
    Io(io::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument(_) => 1,
            _ => 2,
        }
    }

    /// Exit the process with an appropriate message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if matches!(self, CliError::InvalidArgument(_)) {
            eprintln!();
            eprintln!("Run with --help for usage.");
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::File { path, error } => {
                write!(f, "Failed to access '{}': {}", path.display(), error)
            }
            CliError::Stream(e) => write!(f, "Streaming failure: {}", e),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::File { error, .. } => Some(error),
            CliError::Stream(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StreamError> for CliError {
    fn from(e: StreamError) -> Self {
        CliError::Stream(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
