//! Single-pass combines over sorted cell streams.
//!
//! Every operation here reads line-oriented cell dumps and writes one.
//! Difference and intersection join their two inputs by sorting them
//! together, the second stream's lines tagged with a trailing marker;
//! the join only matches a cell against its tagged twin at the same
//! resolution, so streams of mixed resolutions should go through
//! [`normalize`] first. Union is plain concatenation and leaves
//! canonicalization to a later [`optimize`] pass.

use std::io::{self, BufRead, Write};

use super::error::StreamError;
use super::sort::{SortConfig, sorted};
use crate::hhcode;

fn write_line<W: Write>(output: &mut W, line: &str) -> io::Result<()> {
    output.write_all(line.as_bytes())?;
    output.write_all(b"\n")
}

fn tag_lines<R: BufRead>(reader: R, marker: char) -> impl Iterator<Item = io::Result<String>> {
    reader.lines().map(move |line| {
        line.map(|mut cell| {
            cell.push(marker);
            cell
        })
    })
}

/// One pending sibling group during a clustering pass.
struct Group {
    prefix: String,
    threshold: u32,
    subcells: u16,
}

impl Group {
    fn open(prefix: String, digit: u32, level_threshold: &[u32; 16]) -> Group {
        let mut threshold = level_threshold[prefix.len()];
        if threshold == 0 {
            threshold = 16;
        }
        Group {
            prefix,
            threshold,
            subcells: 1 << digit,
        }
    }

    fn flush<W: Write>(&self, output: &mut W) -> io::Result<()> {
        if self.subcells.count_ones() >= self.threshold {
            write_line(output, &self.prefix)
        } else {
            for digit in 0..16 {
                if self.subcells & (1u16 << digit) != 0 {
                    writeln!(output, "{}{:x}", self.prefix, digit)?;
                }
            }
            Ok(())
        }
    }
}

fn split_last_digit(line: &str) -> Result<(&str, u32), StreamError> {
    match line.chars().next_back().and_then(|c| c.to_digit(16)) {
        Some(digit) => Ok((&line[..line.len() - 1], digit)),
        None => Err(StreamError::InvalidCell {
            line: line.to_string(),
        }),
    }
}

/// Cluster a cell stream, replacing filled sibling groups by their
/// parent cell.
///
/// The input is externally sorted first and may arrive in any order.
/// `thresholds` packs one hex digit per resolution level exactly as
/// [`Coverage::optimize`](crate::coverage::Coverage::optimize) reads
/// it, a zero digit meaning "require all 16 children". Cells at or
/// below `min_resolution` pass through untouched. Duplicate cells
/// collapse into their group, so a second pass over the output is a
/// cheap way to cascade the clustering upward.
pub fn optimize<R, W>(
    input: R,
    mut output: W,
    thresholds: u64,
    min_resolution: u32,
    config: &SortConfig,
) -> Result<(), StreamError>
where
    R: BufRead,
    W: Write,
{
    // Nibble i governs cells of resolution 2 * (i + 1), MSB first
    let mut level_threshold = [0u32; 16];
    for (i, threshold) in level_threshold.iter_mut().enumerate() {
        *threshold = ((thresholds >> (60 - 4 * i)) & 0xf) as u32;
    }

    let mut group: Option<Group> = None;

    for line in sorted(input.lines(), config)? {
        let line = line?;

        if line.len() as u32 * 2 <= min_resolution {
            write_line(&mut output, &line)?;
            continue;
        }
        if line.len() > 16 {
            return Err(StreamError::InvalidCell { line });
        }

        let (prefix, digit) = split_last_digit(&line)?;

        match group.as_mut() {
            Some(g) if g.prefix.as_str() == prefix => g.subcells |= 1u16 << digit,
            _ => {
                if let Some(g) = group.take() {
                    g.flush(&mut output)?;
                }
                group = Some(Group::open(prefix.to_string(), digit, &level_threshold));
            }
        }
    }

    if let Some(g) = group.take() {
        g.flush(&mut output)?;
    }
    output.flush()?;
    Ok(())
}

/// Rewrite every cell in a stream to exactly `resolution`.
///
/// Coarser cells expand into all their descendants at the target
/// resolution, finer cells truncate to their ancestor. Out-of-range
/// resolutions clamp to the nearest valid one. The output is neither
/// sorted nor deduplicated.
pub fn normalize<R, W>(input: R, mut output: W, resolution: u32) -> Result<(), StreamError>
where
    R: BufRead,
    W: Write,
{
    let resolution = hhcode::clamp_resolution(resolution);
    let digits = (resolution / 2) as usize;

    for line in input.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        if line.len() >= digits {
            match line.get(..digits) {
                Some(prefix) => write_line(&mut output, prefix)?,
                None => return Err(StreamError::InvalidCell { line }),
            }
        } else {
            let width = digits - line.len();
            for child in 0..1u64 << (2 * (resolution - 2 * line.len() as u32)) {
                writeln!(output, "{line}{child:0width$x}")?;
            }
        }
    }
    output.flush()?;
    Ok(())
}

/// Write the cells of `first` that are not cancelled by a matching
/// cell in `second`.
///
/// Both streams are sorted together with `second`'s lines tagged by a
/// trailing `-`; a cell is removed when its tagged twin at the same
/// resolution follows it. Duplicates of `first` come out once.
pub fn minus<A, B, W>(
    first: A,
    second: B,
    mut output: W,
    config: &SortConfig,
) -> Result<(), StreamError>
where
    A: BufRead,
    B: BufRead,
    W: Write,
{
    let tagged = first.lines().chain(tag_lines(second, '-'));
    let mut last: Option<String> = None;

    for line in sorted(tagged, config)? {
        let line = line?;
        let is_tagged = line.ends_with('-');

        match last.take() {
            None => {
                // A tag with no pending cell has nothing to cancel
                if !is_tagged {
                    last = Some(line);
                }
            }
            Some(prev) => {
                if is_tagged && line.len() == prev.len() + 1 && line.starts_with(prev.as_str()) {
                    // cancelled
                } else if is_tagged {
                    write_line(&mut output, &prev)?;
                } else if line != prev {
                    write_line(&mut output, &prev)?;
                    last = Some(line);
                } else {
                    last = Some(prev);
                }
            }
        }
    }

    if let Some(prev) = last {
        write_line(&mut output, &prev)?;
    }
    output.flush()?;
    Ok(())
}

/// Write the cells present in both `first` and `second`.
///
/// Same sort-merge join as [`minus`] with a `+` tag: a cell of
/// `first` is emitted once when its tagged twin at the same resolution
/// follows it, and dropped otherwise.
pub fn intersection<A, B, W>(
    first: A,
    second: B,
    mut output: W,
    config: &SortConfig,
) -> Result<(), StreamError>
where
    A: BufRead,
    B: BufRead,
    W: Write,
{
    let tagged = first.lines().chain(tag_lines(second, '+'));
    let mut last: Option<String> = None;

    for line in sorted(tagged, config)? {
        let line = line?;
        let is_tagged = line.ends_with('+');

        match last.take() {
            None => {
                if !is_tagged {
                    last = Some(line);
                }
            }
            Some(prev) => {
                if is_tagged && line.len() == prev.len() + 1 && line.starts_with(prev.as_str()) {
                    write_line(&mut output, &prev)?;
                } else if !is_tagged {
                    last = Some(line);
                }
            }
        }
    }
    output.flush()?;
    Ok(())
}

/// Concatenate two cell streams line by line.
///
/// The cheap union: no ordering, no deduplication. Canonical form
/// comes from a later [`optimize`] pass.
pub fn merge<A, B, W>(first: A, second: B, mut output: W) -> Result<(), StreamError>
where
    A: BufRead,
    B: BufRead,
    W: Write,
{
    for line in first.lines().chain(second.lines()) {
        write_line(&mut output, &line?)?;
    }
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optimize_to_string(input: &str, thresholds: u64, min_resolution: u32) -> String {
        let mut out = Vec::new();
        optimize(
            input.as_bytes(),
            &mut out,
            thresholds,
            min_resolution,
            &SortConfig::new(),
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_optimize_collapses_full_sibling_group() {
        let input: String = (0..16).rev().map(|d| format!("b57{d:x}\n")).collect();
        assert_eq!(optimize_to_string(&input, 0, 0), "b57\n");
    }

    #[test]
    fn test_optimize_keeps_fifteen_of_sixteen() {
        let input: String = (0..15).map(|d| format!("b57{d:x}\n")).collect();
        let expected: String = (0..15).map(|d| format!("b57{d:x}\n")).collect();
        assert_eq!(optimize_to_string(&input, 0, 0), expected);
    }

    #[test]
    fn test_optimize_threshold_nibble_applies_to_its_resolution() {
        // Threshold 2 for resolution 8 cells (4 hex digits)
        let thresholds = 0x2u64 << 48;
        assert_eq!(
            optimize_to_string("b571\nb570\n", thresholds, 0),
            "b57\n",
            "two siblings reach the lowered threshold"
        );
        assert_eq!(
            optimize_to_string("b570\n", thresholds, 0),
            "b570\n",
            "a single sibling stays below it"
        );
    }

    #[test]
    fn test_optimize_min_resolution_passes_cells_through() {
        let input: String = (0..16).map(|d| format!("b{d:x}\n")).collect();
        let out = optimize_to_string(&input, 0, 4);
        assert_eq!(out, input, "resolution 4 cells are exempt from clustering");
    }

    #[test]
    fn test_optimize_merges_duplicate_cells() {
        assert_eq!(optimize_to_string("b570\nb570\nb571\n", 0, 0), "b570\nb571\n");
    }

    #[test]
    fn test_optimize_rejects_non_hex_line() {
        let mut out = Vec::new();
        let result = optimize("b57z\n".as_bytes(), &mut out, 0, 0, &SortConfig::new());
        assert!(matches!(result, Err(StreamError::InvalidCell { .. })));
    }

    fn normalize_to_string(input: &str, resolution: u32) -> String {
        let mut out = Vec::new();
        normalize(input.as_bytes(), &mut out, resolution).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_normalize_truncates_finer_cells() {
        assert_eq!(normalize_to_string("b5707070\n", 8), "b570\n");
    }

    #[test]
    fn test_normalize_keeps_exact_resolution() {
        assert_eq!(normalize_to_string("b570\n", 8), "b570\n");
    }

    #[test]
    fn test_normalize_expands_coarser_cells() {
        let out = normalize_to_string("b5\n", 8);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 256);
        assert_eq!(lines[0], "b500");
        assert_eq!(lines[255], "b5ff");
    }

    #[test]
    fn test_normalize_clamps_resolution() {
        assert_eq!(normalize_to_string("b570\n", 0), "b\n");
    }

    fn minus_to_string(first: &str, second: &str) -> String {
        let mut out = Vec::new();
        minus(
            first.as_bytes(),
            second.as_bytes(),
            &mut out,
            &SortConfig::new(),
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_minus_removes_matching_cells() {
        assert_eq!(minus_to_string("00\n01\n02\n", "01\n"), "00\n02\n");
    }

    #[test]
    fn test_minus_ignores_orphaned_removals() {
        assert_eq!(minus_to_string("00\n", "01\n"), "00\n");
    }

    #[test]
    fn test_minus_deduplicates_kept_cells() {
        assert_eq!(minus_to_string("02\n00\n01\n00\n", ""), "00\n01\n02\n");
    }

    #[test]
    fn test_minus_does_not_match_across_resolutions() {
        // A coarser removal does not subsume finer cells; callers
        // normalize both streams first when that is wanted
        assert_eq!(minus_to_string("b570\n", "b57\n"), "b570\n");
    }

    #[test]
    fn test_minus_spills_under_tiny_budget() {
        let config = SortConfig::new().with_buffer_bytes(2);
        let mut out = Vec::new();
        minus("00\n01\n02\n".as_bytes(), "01\n".as_bytes(), &mut out, &config).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "00\n02\n");
    }

    fn intersection_to_string(first: &str, second: &str) -> String {
        let mut out = Vec::new();
        intersection(
            first.as_bytes(),
            second.as_bytes(),
            &mut out,
            &SortConfig::new(),
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_intersection_keeps_common_cells() {
        assert_eq!(intersection_to_string("00\n01\n02\n", "01\n03\n"), "01\n");
    }

    #[test]
    fn test_intersection_requires_matching_resolution() {
        assert_eq!(intersection_to_string("b570\n", "b57\n"), "");
    }

    #[test]
    fn test_intersection_emits_duplicates_once() {
        assert_eq!(intersection_to_string("00\n00\n", "00\n"), "00\n");
    }

    #[test]
    fn test_merge_concatenates_without_dedup() {
        let mut out = Vec::new();
        merge("00\n01\n".as_bytes(), "00\n".as_bytes(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "00\n01\n00\n");
    }
}
