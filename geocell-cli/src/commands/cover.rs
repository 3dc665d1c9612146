//! Cover command - evaluate a shape expression into a cell stream.
//!
//! The expression is a whitespace-separated list of terms, each a mode
//! character followed by a shape definition:
//!
//! - `+SHAPE` adds the shape's cells
//! - `-SHAPE` removes them
//! - `&SHAPE` intersects with them
//!
//! A bare definition without a mode is treated as a single `+` term.
//! Terms before the first additive one have nothing to subtract from
//! or intersect with and are dropped. Every term is rasterized to a
//! scratch file and the files are folded left to right with the
//! streaming set operations, so the working set never has to fit in
//! memory.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use geocell::stream::{self, SortConfig, StreamCoverage};
use tracing::debug;

use super::common;
use crate::error::CliError;
use crate::runner::CliRunner;
use crate::shapes;

/// Arguments for the cover command.
#[derive(Debug, Args)]
pub struct CoverArgs {
    /// Shape expression, e.g. "+circle:48.85:2.35:5000 -rect:48:2,49:3"
    pub definition: String,

    /// Target resolution, an even value from 2 to 32; zero or less
    /// picks one per shape from its extent
    #[arg(short, long, allow_negative_numbers = true)]
    pub resolution: Option<i32>,

    /// Clustering thresholds as up to 16 hex nibbles, applied in a
    /// final pass
    #[arg(short, long)]
    pub thresholds: Option<String>,

    /// Emit KML instead of cell lines
    #[arg(long)]
    pub kml: bool,

    /// Output file, stdout when absent
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

enum Mode {
    Add,
    Subtract,
    Intersect,
}

/// Run the cover command.
pub fn run(args: &CoverArgs, runner: &CliRunner) -> Result<(), CliError> {
    let settings = runner.settings();
    let resolution = args.resolution.unwrap_or(settings.cover.resolution);
    let thresholds = match &args.thresholds {
        Some(text) => common::parse_thresholds(text)?,
        None => settings.cover.thresholds,
    };

    let result = evaluate(
        &args.definition,
        resolution,
        thresholds,
        &settings.sort_config(),
        settings.stream.tmp_dir.as_deref(),
    )?;

    let mut output = common::open_output(args.output.as_deref())?;
    if args.kml {
        stream::to_kml(BufReader::new(&result), &mut output)?;
    } else {
        io::copy(&mut BufReader::new(&result), &mut output).map_err(CliError::Io)?;
        output.flush().map_err(CliError::Io)?;
    }

    Ok(())
}

/// Evaluate a shape expression into a sorted, optimized scratch file.
fn evaluate(
    definition: &str,
    resolution: i32,
    thresholds: u64,
    config: &SortConfig,
    tmp_dir: Option<&Path>,
) -> Result<File, CliError> {
    let expression = if definition.starts_with(['+', '-', '&']) {
        definition.to_string()
    } else {
        format!("+{}", definition)
    };

    let mut acc: Option<File> = None;

    for term in expression.split_whitespace() {
        let mut chars = term.chars();
        let mode = match chars.next() {
            Some('+') => Mode::Add,
            Some('-') => Mode::Subtract,
            Some('&') => Mode::Intersect,
            _ => continue,
        };
        let body = chars.as_str();
        debug!("evaluating term {:?}", term);

        acc = match (acc.take(), mode) {
            (None, Mode::Add) => Some(rasterize_term(body, resolution, tmp_dir)?),
            (None, _) => None,
            (Some(current), mode) => {
                let term_file = rasterize_term(body, resolution, tmp_dir)?;
                let mut combined = scratch_file(tmp_dir)?;
                {
                    let first = BufReader::new(current);
                    let second = BufReader::new(term_file);
                    let mut out = BufWriter::new(&combined);
                    match mode {
                        Mode::Add => stream::merge(first, second, &mut out)?,
                        Mode::Subtract => stream::minus(first, second, &mut out, config)?,
                        Mode::Intersect => stream::intersection(first, second, &mut out, config)?,
                    }
                    out.flush().map_err(CliError::Io)?;
                }
                combined.seek(SeekFrom::Start(0)).map_err(CliError::Io)?;
                Some(combined)
            }
        };
    }

    let mut current = match acc {
        Some(current) => current,
        None => return scratch_file(tmp_dir),
    };

    // Collapse complete sibling groups until the stream stops
    // shrinking; each pass cascades the groups completed by the last.
    // The pass also sorts, so the result is ordered even when nothing
    // collapses.
    let mut len = current.metadata().map_err(CliError::Io)?.len();
    for _ in 0..16 {
        let mut next = scratch_file(tmp_dir)?;
        {
            let reader = BufReader::new(&current);
            let mut out = BufWriter::new(&next);
            stream::optimize(reader, &mut out, 0, 0, config)?;
            out.flush().map_err(CliError::Io)?;
        }
        next.seek(SeekFrom::Start(0)).map_err(CliError::Io)?;
        let next_len = next.metadata().map_err(CliError::Io)?.len();
        current = next;
        if next_len == len {
            break;
        }
        len = next_len;
    }

    if thresholds != 0 {
        let mut next = scratch_file(tmp_dir)?;
        {
            let reader = BufReader::new(&current);
            let mut out = BufWriter::new(&next);
            stream::optimize(reader, &mut out, thresholds, 0, config)?;
            out.flush().map_err(CliError::Io)?;
        }
        next.seek(SeekFrom::Start(0)).map_err(CliError::Io)?;
        current = next;
    }

    Ok(current)
}

/// Rasterize one term into a rewound scratch file of cell lines.
fn rasterize_term(body: &str, resolution: i32, tmp_dir: Option<&Path>) -> Result<File, CliError> {
    let file = scratch_file(tmp_dir)?;
    let mut sink = StreamCoverage::new(BufWriter::new(file));
    shapes::parse_area(body, resolution, &mut sink);

    let writer = sink.finish()?;
    let mut file = writer
        .into_inner()
        .map_err(|e| CliError::Io(e.into_error()))?;
    file.seek(SeekFrom::Start(0)).map_err(CliError::Io)?;
    Ok(file)
}

fn scratch_file(tmp_dir: Option<&Path>) -> Result<File, CliError> {
    let file = match tmp_dir {
        Some(dir) => tempfile::tempfile_in(dir),
        None => tempfile::tempfile(),
    };
    file.map_err(CliError::Io)
}
