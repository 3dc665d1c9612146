//! Optimize command - collapse sibling groups in a cell stream.

use std::path::PathBuf;

use clap::Args;
use geocell::stream;

use super::common;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the optimize command.
#[derive(Debug, Args)]
pub struct OptimizeArgs {
    /// Cell stream to optimize, "-" for stdin
    pub input: PathBuf,

    /// Clustering thresholds as up to 16 hex nibbles, one per
    /// resolution from coarsest to finest; 0 means a full group of 16
    #[arg(short, long)]
    pub thresholds: Option<String>,

    /// Leave cells at or below this resolution untouched
    #[arg(short, long, default_value_t = 0)]
    pub min_resolution: u32,

    /// Output file, stdout when absent
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the optimize command.
///
/// A single pass over the sorted stream; sibling groups reaching their
/// resolution's threshold collapse into the parent cell. Run the pass
/// again to cascade collapses further up.
pub fn run(args: &OptimizeArgs, runner: &CliRunner) -> Result<(), CliError> {
    let thresholds = match &args.thresholds {
        Some(text) => common::parse_thresholds(text)?,
        None => runner.settings().cover.thresholds,
    };

    let input = common::open_input(&args.input)?;
    let mut output = common::open_output(args.output.as_deref())?;
    let config = runner.settings().sort_config();

    stream::optimize(input, &mut output, thresholds, args.min_resolution, &config)?;
    output.flush().map_err(CliError::Io)?;

    Ok(())
}
