//! Streaming coverage pipeline for cell sets larger than memory.
//!
//! Everything here works on the line-oriented text form: one
//! hex-truncated cell per line. [`StreamCoverage`] adapts any writer
//! into a [`CellSink`] so rasterizers can emit straight to disk, and
//! the free functions combine such dumps without materializing them:
//! union by concatenation ([`merge`]), difference ([`minus`]) and
//! intersection ([`intersection`]) via a sort-merge join against a
//! tagged second stream, clustering ([`optimize`]) and resolution
//! rewriting ([`normalize`]) as single passes. The external sort
//! under the joins keeps memory bounded by spilling runs to temp
//! files that vanish on every exit path.

mod algebra;
mod error;
mod sort;

pub use algebra::{intersection, merge, minus, normalize, optimize};
pub use error::StreamError;
pub use sort::{DEFAULT_SORT_BUFFER_BYTES, SortConfig, sort_lines};

use std::io::{self, BufRead, Write};

use crate::coverage::{self, CellSink, Coverage};
use crate::hhcode;

/// A [`CellSink`] that writes cells as text lines instead of storing
/// them.
///
/// The streaming counterpart of [`Coverage`]: rasterizers emit into it
/// directly, so a polygon can be covered to disk without the cell set
/// ever living in memory. Write errors are sticky; the first failure
/// stops all further output and surfaces from [`finish`].
///
/// [`finish`]: StreamCoverage::finish
pub struct StreamCoverage<W: Write> {
    out: W,
    marker: Option<char>,
    error: Option<io::Error>,
}

impl<W: Write> StreamCoverage<W> {
    /// Wrap `out` as a plain cell-line writer.
    pub fn new(out: W) -> Self {
        StreamCoverage {
            out,
            marker: None,
            error: None,
        }
    }

    /// Wrap `out`, appending `marker` to every cell line.
    ///
    /// Produces the tagged second operand of the combine joins: `-`
    /// for difference, `+` for intersection.
    pub fn with_marker(out: W, marker: char) -> Self {
        StreamCoverage {
            out,
            marker: Some(marker),
            error: None,
        }
    }

    /// Dump every cell of an in-memory coverage as lines.
    pub fn write_coverage(&mut self, coverage: &Coverage) {
        for (resolution, hhcode) in coverage.iter() {
            self.add_cell(resolution, hhcode);
        }
    }

    /// Flush and hand back the writer.
    ///
    /// # Errors
    ///
    /// Surfaces the first write error hit while cells were added, or
    /// the flush failure.
    pub fn finish(mut self) -> Result<W, StreamError> {
        if let Some(error) = self.error.take() {
            return Err(StreamError::Io(error));
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> CellSink for StreamCoverage<W> {
    fn add_cell(&mut self, resolution: u32, hhcode: u64) {
        if self.error.is_some() {
            return;
        }
        // same silent drop of out-of-range resolutions as the
        // in-memory container
        if (resolution >> 1).wrapping_sub(1) >= 16 {
            return;
        }

        let mut line = hhcode::to_hex(hhcode, resolution);
        if let Some(marker) = self.marker {
            line.push(marker);
        }
        line.push('\n');

        if let Err(error) = self.out.write_all(line.as_bytes()) {
            self.error = Some(error);
        }
    }
}

/// Read a line-oriented cell dump into a sink.
///
/// Blank lines are skipped; anything else must be a hex cell whose
/// length gives its resolution.
///
/// # Errors
///
/// [`StreamError::InvalidCell`] on the first non-hex line, or any I/O
/// failure from the reader.
pub fn read_cells<R: BufRead, S: CellSink>(input: R, sink: &mut S) -> Result<(), StreamError> {
    for line in input.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let (hhcode, resolution) =
            hhcode::from_hex(&line).map_err(|_| StreamError::InvalidCell { line: line.clone() })?;
        sink.add_cell(resolution, hhcode);
    }
    Ok(())
}

/// Render a cell-line stream as a KML document, one bounding-box
/// polygon per cell.
pub fn to_kml<R: BufRead, W: Write>(input: R, mut output: W) -> Result<(), StreamError> {
    coverage::write_header(&mut output)?;
    for line in input.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let (hhcode, resolution) =
            hhcode::from_hex(&line).map_err(|_| StreamError::InvalidCell { line: line.clone() })?;
        coverage::write_cell(&mut output, resolution, hhcode)?;
    }
    coverage::write_footer(&mut output)?;
    output.flush()?;
    Ok(())
}
