//! Normalize command - rewrite a cell stream at a fixed resolution.

use std::path::PathBuf;

use clap::Args;
use geocell::hhcode;
use geocell::stream;

use super::common;
use crate::error::CliError;

/// Arguments for the normalize command.
#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Cell stream to normalize, "-" for stdin
    pub input: PathBuf,

    /// Resolution every cell is rewritten to, an even value from 2 to 32
    #[arg(short, long)]
    pub resolution: u32,

    /// Output file, stdout when absent
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the normalize command.
///
/// Coarser cells expand into all their descendants at the target
/// resolution; finer cells are truncated. The output is unsorted and
/// may repeat cells.
pub fn run(args: &NormalizeArgs) -> Result<(), CliError> {
    let resolution = hhcode::check_resolution(args.resolution)
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;

    let input = common::open_input(&args.input)?;
    let mut output = common::open_output(args.output.as_deref())?;

    stream::normalize(input, &mut output, resolution)?;
    output.flush().map_err(CliError::Io)?;

    Ok(())
}
