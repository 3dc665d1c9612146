//! Combine command - set algebra over two cell streams.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use geocell::stream;

use super::common;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Set operation applied to the two streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SetOperation {
    /// Every cell present in either stream, duplicates kept
    Union,
    /// Cells of the first stream not present in the second
    Difference,
    /// Cells present in both streams
    Intersection,
}

/// Arguments for the combine command.
#[derive(Debug, Args)]
pub struct CombineArgs {
    /// Operation to apply
    #[arg(value_enum)]
    pub operation: SetOperation,

    /// First cell stream, "-" for stdin
    pub first: PathBuf,

    /// Second cell stream, "-" for stdin
    pub second: PathBuf,

    /// Output file, stdout when absent
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the combine command.
///
/// Difference and intersection match cells at equal resolution only;
/// streams of mixed resolution should go through normalize first.
pub fn run(args: &CombineArgs, runner: &CliRunner) -> Result<(), CliError> {
    if args.first.as_os_str() == "-" && args.second.as_os_str() == "-" {
        return Err(CliError::InvalidArgument(
            "only one input may come from stdin".to_string(),
        ));
    }

    let first = common::open_input(&args.first)?;
    let second = common::open_input(&args.second)?;
    let mut output = common::open_output(args.output.as_deref())?;
    let config = runner.settings().sort_config();

    match args.operation {
        SetOperation::Union => stream::merge(first, second, &mut output)?,
        SetOperation::Difference => stream::minus(first, second, &mut output, &config)?,
        SetOperation::Intersection => stream::intersection(first, second, &mut output, &config)?,
    }
    output.flush().map_err(CliError::Io)?;

    Ok(())
}
