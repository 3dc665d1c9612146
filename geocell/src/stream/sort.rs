//! Bounded-memory external sort for cell line streams.
//!
//! Classic run-generation / k-way-merge split: input lines accumulate
//! in memory until a byte budget fills, each full run is sorted and
//! spilled to an anonymous temp file, and the merge phase replays the
//! runs through a min-heap. Cell dumps sort bytewise, which is exactly
//! the hex-prefix order the combine joins in [`super::algebra`] need.
//! Spill files are unlinked on creation, so they disappear on every
//! exit path including errors.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::PathBuf;

use super::error::StreamError;

/// Bytes of buffered line data per sort run when none is configured.
pub const DEFAULT_SORT_BUFFER_BYTES: usize = 2_000_000;

/// Tuning knobs for the external sort.
#[derive(Debug, Clone)]
pub struct SortConfig {
    buffer_bytes: usize,
    tmp_dir: Option<PathBuf>,
}

impl SortConfig {
    pub fn new() -> Self {
        SortConfig {
            buffer_bytes: DEFAULT_SORT_BUFFER_BYTES,
            tmp_dir: None,
        }
    }

    /// Cap the bytes of line data held in memory per run.
    ///
    /// A budget of zero still admits one line at a time.
    pub fn with_buffer_bytes(mut self, bytes: usize) -> Self {
        self.buffer_bytes = bytes;
        self
    }

    /// Spill runs into `dir` instead of the system temp directory.
    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(dir.into());
        self
    }

    fn spill_file(&self) -> io::Result<File> {
        match &self.tmp_dir {
            Some(dir) => tempfile::tempfile_in(dir),
            None => tempfile::tempfile(),
        }
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort a line stream into `output` under the configured memory
/// budget.
///
/// Output is newline-terminated, bytewise ascending. Duplicate lines
/// are kept.
pub fn sort_lines<R, W>(input: R, mut output: W, config: &SortConfig) -> Result<(), StreamError>
where
    R: BufRead,
    W: Write,
{
    for line in sorted(input.lines(), config)? {
        let line = line?;
        output.write_all(line.as_bytes())?;
        output.write_all(b"\n")?;
    }
    output.flush()?;
    Ok(())
}

/// Sort `lines` with bounded memory, yielding them in ascending order.
///
/// A single run that fits the budget is served straight from memory;
/// anything larger goes through spill files and a heap merge.
pub(crate) fn sorted<I>(lines: I, config: &SortConfig) -> Result<SortedLines, StreamError>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut run: Vec<String> = Vec::new();
    let mut run_bytes = 0usize;
    let mut runs: Vec<BufReader<File>> = Vec::new();

    for line in lines {
        let line = line?;
        run_bytes += line.len();
        run.push(line);

        if run_bytes >= config.buffer_bytes {
            runs.push(spill_run(&mut run, config)?);
            run_bytes = 0;
        }
    }

    if runs.is_empty() {
        run.sort_unstable();
        return Ok(SortedLines::Memory(run.into_iter()));
    }

    if !run.is_empty() {
        runs.push(spill_run(&mut run, config)?);
    }

    let mut heap = BinaryHeap::with_capacity(runs.len());
    for (index, reader) in runs.iter_mut().enumerate() {
        if let Some(line) = read_line(reader)? {
            heap.push(Reverse((line, index)));
        }
    }

    Ok(SortedLines::Merge { heap, runs })
}

fn spill_run(run: &mut Vec<String>, config: &SortConfig) -> Result<BufReader<File>, StreamError> {
    run.sort_unstable();

    let mut writer = BufWriter::new(config.spill_file()?);
    for line in run.iter() {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    run.clear();

    let mut file = writer.into_inner().map_err(|e| e.into_error())?;
    file.seek(SeekFrom::Start(0))?;
    Ok(BufReader::new(file))
}

fn read_line(reader: &mut BufReader<File>) -> Result<Option<String>, StreamError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

/// Iterator over externally sorted lines.
pub(crate) enum SortedLines {
    /// Everything fit in one in-memory run.
    Memory(std::vec::IntoIter<String>),
    /// Multi-run merge off the spill files.
    Merge {
        heap: BinaryHeap<Reverse<(String, usize)>>,
        runs: Vec<BufReader<File>>,
    },
}

impl Iterator for SortedLines {
    type Item = Result<String, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SortedLines::Memory(lines) => lines.next().map(Ok),
            SortedLines::Merge { heap, runs } => {
                let Reverse((line, index)) = heap.pop()?;
                match read_line(&mut runs[index]) {
                    Ok(Some(next)) => heap.push(Reverse((next, index))),
                    Ok(None) => {}
                    Err(e) => return Some(Err(e)),
                }
                Some(Ok(line))
            }
        }
    }
}
