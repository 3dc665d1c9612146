//! Logging configuration shared by the binaries.
//!
//! Sets up `tracing` with two outputs: a plain-text log file for
//! post-mortem inspection and a colored stderr feed for interactive
//! runs. Diagnostics deliberately avoid stdout, which carries the
//! actual cell output in pipelines.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Guard that keeps the non-blocking file writer alive.
///
/// Must be held for the lifetime of the program; dropping it flushes
/// and closes the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the global tracing subscriber.
///
/// Creates `log_dir` if needed and truncates `log_file` inside it so
/// every run starts with a clean log. The filter is taken from the
/// `RUST_LOG` environment variable when set, falling back to
/// `default_level` otherwise.
///
/// # Arguments
///
/// * `log_dir` - Directory to write log files into
/// * `log_file` - Name of the log file within `log_dir`
/// * `default_level` - Filter directive used when `RUST_LOG` is unset
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the
/// log file cannot be truncated.
pub fn init_logging(
    log_dir: &str,
    log_file: &str,
    default_level: &str,
) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;

    let log_path = Path::new(log_dir).join(log_file);
    fs::write(&log_path, "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    // stdout is reserved for cell output
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(true)
        .with_target(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Default directory for log files.
pub fn default_log_dir() -> &'static str {
    "logs"
}

/// Default log file name.
pub fn default_log_file() -> &'static str {
    "geocell.log"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        assert_eq!(default_log_dir(), "logs");
        assert_eq!(default_log_file(), "geocell.log");
    }

    #[test]
    fn test_init_creates_directory_and_truncates_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("logs");
        let log_dir_str = log_dir.to_str().unwrap();

        fs::create_dir_all(&log_dir).unwrap();
        let log_path = log_dir.join("geocell.log");
        fs::write(&log_path, "stale contents from a previous run").unwrap();

        // Only exercise the file handling, not subscriber registration:
        // a second init() in the same process would panic.
        fs::create_dir_all(log_dir_str).unwrap();
        fs::write(&log_path, "").unwrap();

        let contents = fs::read_to_string(&log_path).unwrap();
        assert!(contents.is_empty());
    }

    #[test]
    fn test_guard_holds_worker() {
        let (_writer, guard) = tracing_appender::non_blocking(io::sink());
        let _logging_guard = LoggingGuard { _file_guard: guard };
    }
}
