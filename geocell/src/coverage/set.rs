//! Resolution-bucketed cell sets and their optimizer.
//!
//! A [`Coverage`] holds one hash set per even resolution, keyed by the
//! cell's HHCode masked down to the bits that resolution keeps. All
//! mutation goes through `&mut` methods; a finished coverage is freely
//! shareable for reads.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::hhcode;

use super::sink::CellSink;

/// Mask keeping the significant bits of a cell stored in `bucket`.
///
/// Bucket `b` holds resolution `2 * (b + 1)` cells, so it keeps the
/// top `4 * (b + 1)` bits.
#[inline]
fn prefix_mask(bucket: usize) -> u64 {
    !0u64 << (60 - 4 * bucket as u32)
}

/// A set of grid cells of mixed resolutions.
///
/// Cells are canonicalized on insertion: only the bits significant at
/// the cell's resolution are stored, so two HHCodes falling in the
/// same cell land on the same entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coverage {
    buckets: [HashSet<u64>; 16],
}

impl Coverage {
    pub fn new() -> Self {
        Coverage::default()
    }

    /// Bucket index for `resolution`, or `None` outside [2, 33].
    ///
    /// Odd resolutions share the bucket of the even resolution below
    /// them.
    fn bucket(resolution: u32) -> Option<usize> {
        let r = (resolution >> 1).wrapping_sub(1) as usize;
        (r < 16).then_some(r)
    }

    /// Insert the cell at `resolution` containing `hhcode`.
    ///
    /// Out-of-range resolutions are ignored.
    pub fn add_cell(&mut self, resolution: u32, hhcode: u64) {
        if let Some(r) = Self::bucket(resolution) {
            self.buckets[r].insert(hhcode & prefix_mask(r));
        }
    }

    /// Remove the cell at `resolution` containing `hhcode`.
    pub fn remove_cell(&mut self, resolution: u32, hhcode: u64) {
        if let Some(r) = Self::bucket(resolution) {
            self.buckets[r].remove(&(hhcode & prefix_mask(r)));
        }
    }

    /// Whether the exact cell at `resolution` containing `hhcode` is
    /// present.
    pub fn contains(&self, resolution: u32, hhcode: u64) -> bool {
        match Self::bucket(resolution) {
            Some(r) => self.buckets[r].contains(&(hhcode & prefix_mask(r))),
            None => false,
        }
    }

    /// Whether some cell of the coverage, at any resolution, encloses
    /// `hhcode`.
    pub fn includes(&self, hhcode: u64) -> bool {
        self.buckets
            .iter()
            .enumerate()
            .any(|(r, bucket)| bucket.contains(&(hhcode & prefix_mask(r))))
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(HashSet::is_empty)
    }

    /// Total number of cells across all resolutions.
    pub fn cell_count(&self) -> usize {
        self.buckets.iter().map(HashSet::len).sum()
    }

    /// Number of cells at `resolution`.
    pub fn cell_count_at(&self, resolution: u32) -> usize {
        Self::bucket(resolution).map_or(0, |r| self.buckets[r].len())
    }

    /// Cell counts per resolution, coarsest first, empty levels
    /// skipped.
    pub fn cardinalities(&self) -> Vec<(u32, usize)> {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(r, bucket)| (2 * (r as u32 + 1), bucket.len()))
            .collect()
    }

    /// Resolutions at which the coverage has cells, ascending.
    pub fn resolutions(&self) -> Vec<u32> {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(r, _)| 2 * (r as u32 + 1))
            .collect()
    }

    /// Cells stored at `resolution`, in no particular order.
    pub fn cells_at(&self, resolution: u32) -> impl Iterator<Item = u64> + '_ {
        Self::bucket(resolution)
            .and_then(|r| self.buckets.get(r))
            .into_iter()
            .flatten()
            .copied()
    }

    /// All `(resolution, cell)` pairs, coarsest resolution first.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.buckets.iter().enumerate().flat_map(|(r, bucket)| {
            let resolution = 2 * (r as u32 + 1);
            bucket.iter().map(move |&cell| (resolution, cell))
        })
    }

    /// All `(resolution, cell)` pairs, coarsest resolution first and
    /// cells ascending within each resolution.
    pub fn sorted_cells(&self) -> Vec<(u32, u64)> {
        let mut out = Vec::with_capacity(self.cell_count());

        for (r, bucket) in self.buckets.iter().enumerate() {
            let mut cells: Vec<u64> = bucket.iter().copied().collect();
            cells.sort_unstable();
            let resolution = 2 * (r as u32 + 1);
            out.extend(cells.into_iter().map(|cell| (resolution, cell)));
        }

        out
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    /// Union the cells of `other` into `self`.
    pub fn merge(&mut self, other: &Coverage) {
        for (bucket, theirs) in self.buckets.iter_mut().zip(&other.buckets) {
            bucket.extend(theirs);
        }
    }

    /// Covered area in units of two resolution 32 cells.
    ///
    /// Per-resolution cell counts are weighted by cell size and the
    /// sum halved, so a single resolution 32 cell reports 0 and a
    /// whole-planet coverage wraps around. Useful as a relative
    /// measure only.
    pub fn area(&self) -> u64 {
        let mut area = 0u64;

        for (r, bucket) in self.buckets.iter().enumerate() {
            area = area.wrapping_add((bucket.len() as u64).wrapping_mul(1u64 << (60 - 4 * r)));
        }

        area >> 1
    }

    /// Resolution of the coarsest cell enclosing `hhcode`, if any.
    pub fn coarsest_containing(&self, hhcode: u64) -> Option<u32> {
        self.buckets
            .iter()
            .enumerate()
            .find(|(r, bucket)| bucket.contains(&(hhcode & prefix_mask(*r))))
            .map(|(r, _)| 2 * (r as u32 + 1))
    }

    /// Resolution of the finest cell enclosing `hhcode`, if any.
    pub fn finest_containing(&self, hhcode: u64) -> Option<u32> {
        self.buckets
            .iter()
            .enumerate()
            .rev()
            .find(|(r, bucket)| bucket.contains(&(hhcode & prefix_mask(*r))))
            .map(|(r, _)| 2 * (r as u32 + 1))
    }

    /// Coarsest resolution at which the coverage has cells.
    pub fn coarsest_resolution(&self) -> Option<u32> {
        self.resolutions().first().copied()
    }

    /// Finest resolution at which the coverage has cells.
    pub fn finest_resolution(&self) -> Option<u32> {
        self.resolutions().last().copied()
    }

    /// Approximate mean resolution derived from the mean cell area.
    ///
    /// Returns 0 for an empty coverage.
    pub fn mean_resolution(&self) -> u32 {
        let count = self.cell_count() as u64;

        if count == 0 {
            return 0;
        }

        let avg_area = (self.area() / count) << 1;

        if avg_area == 0 {
            return 32;
        }

        (((64.0 - (avg_area as f64).log2()) as u32) >> 1) & 0x3e
    }

    /// Merge sibling cells into their parent wherever enough of them
    /// are present.
    ///
    /// `thresholds` packs one 4-bit threshold per resolution, coarsest
    /// in the top nibble; a nibble of 0 demands the full 16 siblings.
    /// Merging proceeds finest to coarsest so freshly created parents
    /// can merge in turn, and finishes by dropping any cell already
    /// enclosed by a coarser one.
    pub fn optimize(&mut self, thresholds: u64) {
        self.optimize_within(thresholds, hhcode::MIN_RESOLUTION, 0);
    }

    /// [`optimize`](Self::optimize) restricted to resolutions finer
    /// than `min_resolution`, stopping early once the cell count drops
    /// to `max_cells` (0 for no limit).
    pub fn optimize_within(&mut self, thresholds: u64, min_resolution: u32, max_cells: usize) {
        let mut total = self.cell_count();

        if max_cells > 0 && total <= max_cells {
            return;
        }

        // Cells at resolution 2 have no parent, hence the floor of 1.
        let floor = ((min_resolution >> 1) as usize).max(1);

        'levels: for r in (floor..16).rev() {
            if self.buckets[r].is_empty() {
                continue;
            }

            let threshold = (thresholds >> (4 * (15 - r))) & 0xf;

            let mut cells: Vec<u64> = self.buckets[r].iter().copied().collect();
            cells.sort_unstable();

            let parent_mask = prefix_mask(r - 1);

            for group in cells.chunk_by(|a, b| a & parent_mask == b & parent_mask) {
                if (threshold > 0 && group.len() as u64 >= threshold) || group.len() == 16 {
                    self.buckets[r - 1].insert(group[0] & parent_mask);
                    for cell in group {
                        self.buckets[r].remove(cell);
                    }

                    total = total + 1 - group.len();
                    if max_cells > 0 && total <= max_cells {
                        break 'levels;
                    }
                }
            }
        }

        self.drop_covered();
    }

    /// Remove every cell already enclosed by a coarser cell.
    ///
    /// Merging at one level can create a parent covering cells the
    /// thresholds kept at finer levels, so this runs after each
    /// optimize pass.
    fn drop_covered(&mut self) {
        for r in 1..16 {
            let (coarser, finer) = self.buckets.split_at_mut(r);
            let bucket = &mut finer[0];

            if bucket.is_empty() {
                continue;
            }

            bucket.retain(|&cell| {
                !coarser
                    .iter()
                    .enumerate()
                    .any(|(c, set)| set.contains(&(cell & prefix_mask(c))))
            });
        }
    }

    /// Drop sibling groups with too few members.
    ///
    /// The inverse of [`optimize`](Self::optimize): where optimize
    /// promotes dense groups, prune discards sparse ones. A group of
    /// cells sharing a parent is removed when its size is less than or
    /// equal to the resolution's 4-bit threshold (0 keeps everything).
    /// `max_cells` stops pruning early once the count drops that low
    /// (0 for no limit).
    pub fn prune(&mut self, thresholds: u64, min_resolution: u32, max_cells: usize) {
        let mut total = self.cell_count();

        if max_cells > 0 && total <= max_cells {
            return;
        }

        let floor = ((min_resolution >> 1) as usize).max(1);

        'levels: for r in (floor..16).rev() {
            if self.buckets[r].is_empty() {
                continue;
            }

            let threshold = (thresholds >> (4 * (15 - r))) & 0xf;

            let mut cells: Vec<u64> = self.buckets[r].iter().copied().collect();
            cells.sort_unstable();

            let parent_mask = prefix_mask(r - 1);

            for group in cells.chunk_by(|a, b| a & parent_mask == b & parent_mask) {
                if group.len() as u64 <= threshold {
                    for cell in group {
                        self.buckets[r].remove(cell);
                    }

                    total -= group.len();
                    if max_cells > 0 && total <= max_cells {
                        break 'levels;
                    }
                }
            }
        }
    }

    /// Rewrite the coverage to cells at exactly `resolution`.
    ///
    /// Coarser cells are expanded into their descendants at the target
    /// resolution; finer cells are merged upward level by level until
    /// they reach it. Expansion multiplies the cell count by 16 per
    /// resolution step, so normalizing far downward gets expensive
    /// fast.
    pub fn normalize(&mut self, resolution: u32) {
        let Some(target) = Self::bucket(resolution) else {
            return;
        };

        for r in 0..target {
            if self.buckets[r].is_empty() {
                continue;
            }

            let coarse: Vec<u64> = self.buckets[r].drain().collect();
            let children = 1u64 << (4 * (target - r) as u32);

            debug!(
                cells = coarse.len(),
                from = 2 * (r + 1),
                to = resolution,
                "expanding coverage cells"
            );

            for child in 0..children {
                let mask = child << (4 * (15 - target) as u32);
                for &cell in &coarse {
                    self.buckets[target].insert((cell | mask) & prefix_mask(target));
                }
            }
        }

        let thresholds = 0x0111_1111_1111_1111u64 >> (4 * target as u32);
        self.optimize_within(thresholds, resolution, 0);
    }

    /// Split covering cells until the cell at `resolution` containing
    /// `hhcode` exists on its own.
    ///
    /// Each step replaces the coarsest covering cell with its 16
    /// children, so revealing a cell 2k resolution steps down costs
    /// 15k + 16 cells instead of the 16^k a full expansion would.
    /// Nothing happens when the coverage does not cover `hhcode` at
    /// `resolution` or coarser, or already holds the exact cell.
    pub fn split_to(&mut self, resolution: u32, hhcode: u64) {
        let Some(target) = Self::bucket(resolution) else {
            return;
        };

        loop {
            let covered = (0..=target).find(|&r| self.buckets[r].contains(&(hhcode & prefix_mask(r))));

            let Some(r) = covered else {
                return;
            };
            if r == target {
                return;
            }

            let parent = hhcode & prefix_mask(r);
            self.buckets[r].remove(&parent);

            for child in 0..16u64 {
                let cell = (parent | (child << (60 - 4 * (r as u32 + 1)))) & prefix_mask(r + 1);
                self.buckets[r + 1].insert(cell);
            }
        }
    }

    /// Split cells of both coverages until any cell covered by both
    /// appears in both at the same resolution.
    ///
    /// Optimizing both sides first keeps the number of splits down.
    pub fn normalize_pair(a: &mut Coverage, b: &mut Coverage) {
        for r in 0..16 {
            let resolution = 2 * (r as u32 + 1);

            for &cell in &a.buckets[r] {
                b.split_to(resolution, cell);
            }
            for &cell in &b.buckets[r] {
                a.split_to(resolution, cell);
            }
        }
    }

    /// Cells of `self` not covered by `other`.
    ///
    /// Both sides are cloned, canonicalized and mutually split so that
    /// shared cells line up at equal resolutions before removal.
    pub fn minus(&self, other: &Coverage) -> Coverage {
        let mut a = self.clone();
        let mut b = other.clone();

        a.optimize(0);
        b.optimize(0);

        Coverage::normalize_pair(&mut a, &mut b);

        for r in 0..16 {
            for cell in &b.buckets[r] {
                a.buckets[r].remove(cell);
            }
        }

        a
    }

    /// Cells covered by both `self` and `other`.
    pub fn intersection(&self, other: &Coverage) -> Coverage {
        if self.is_empty() || other.is_empty() {
            return Coverage::new();
        }

        let mut a = self.clone();
        let mut b = other.clone();

        a.optimize(0);
        b.optimize(0);

        Coverage::normalize_pair(&mut a, &mut b);

        let mut out = Coverage::new();

        for r in 0..16 {
            let resolution = 2 * (r as u32 + 1);
            let (small, large) = if a.buckets[r].len() < b.buckets[r].len() {
                (&a.buckets[r], &b.buckets[r])
            } else {
                (&b.buckets[r], &a.buckets[r])
            };

            for &cell in small {
                if large.contains(&cell) {
                    out.add_cell(resolution, cell);
                }
            }
        }

        out
    }

    /// Coarsen the coverage until it holds at most `target` cells.
    ///
    /// Starts with a full-sibling merge, then sweeps the finest
    /// populated resolution with thresholds 15 down to 1 before moving
    /// one resolution up, until the target is met or only resolution 2
    /// cells remain (which cannot be merged further).
    pub fn reduce(&mut self, target: usize) {
        self.optimize_within(0, hhcode::MIN_RESOLUTION, target);

        if self.cell_count() <= target {
            return;
        }

        let Some(mut resolution) = self.finest_resolution() else {
            return;
        };
        let mut threshold: u64 = 15;

        while self.cell_count() > target && self.cell_count_at(2) != self.cell_count() {
            debug!(
                cells = self.cell_count(),
                resolution, threshold, "reducing coverage"
            );

            let thresholds = threshold << (64 - 2 * resolution);
            self.optimize_within(thresholds, resolution - 2, target);

            threshold -= 1;
            if threshold == 0 {
                threshold = 15;
                loop {
                    resolution -= 2;
                    if resolution == 0 || self.cell_count_at(resolution) > 0 {
                        break;
                    }
                }
            }
        }
    }

    /// Pack every cell at resolutions 2 to `finest` into the GeoCell
    /// form, sorted ascending.
    ///
    /// `finest` is capped at 30; resolution 32 cells never fit a
    /// GeoCell and are skipped.
    pub fn to_geocells(&self, finest: u32) -> Vec<u64> {
        let finest = finest.min(hhcode::geocell::MAX_GEOCELL_RESOLUTION);
        let mut geocells = Vec::new();

        for r in 0..(finest as usize >> 1) {
            for &cell in &self.buckets[r] {
                geocells.push((((r as u64) + 1) << 60) | ((cell >> 4) & 0x0fff_ffff_ffff_ffff));
            }
        }

        geocells.sort_unstable();
        geocells
    }
}

impl CellSink for Coverage {
    fn add_cell(&mut self, resolution: u32, hhcode: u64) {
        Coverage::add_cell(self, resolution, hhcode);
    }
}

/// Cells as hex prefixes, coarsest resolution first, space separated.
impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (resolution, cell)) in self.sorted_cells().into_iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&hhcode::to_hex(cell, resolution))?;
        }

        Ok(())
    }
}
