//! Common utilities shared across CLI commands.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::config;
use crate::error::CliError;

/// Open a cell stream for reading; "-" selects stdin.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>, CliError> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).map_err(|error| CliError::File {
        path: path.to_path_buf(),
        error,
    })?;
    Ok(Box::new(BufReader::new(file)))
}

/// Open the output sink; `None` or "-" selects stdout.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::create(path).map_err(|error| CliError::File {
                path: path.to_path_buf(),
                error,
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        _ => Ok(Box::new(io::stdout().lock())),
    }
}

/// Parse a thresholds argument into its packed nibble form.
pub fn parse_thresholds(text: &str) -> Result<u64, CliError> {
    config::parse_thresholds(text).map_err(|_| {
        CliError::InvalidArgument(format!(
            "invalid thresholds {:?}, expected up to 16 hex digits",
            text
        ))
    })
}
