//! GeoCell packed form.
//!
//! A GeoCell folds a cell's resolution into the key itself: bits 60-63
//! hold `resolution / 2` (1 to 15), bits 0-59 the leading `resolution *
//! 2` bits of the HHCode, zero padded. One u64 therefore names a cell
//! at any resolution from 2 to 30, which is what index backends store.
//!
//! Resolution 32 does not fit (its index would need 16); full
//! resolution cells travel as raw HHCodes instead.

/// Finest resolution representable as a GeoCell.
pub const MAX_GEOCELL_RESOLUTION: u32 = 30;

const PAYLOAD_MASK: u64 = 0x0fff_ffff_ffff_ffff;

/// Pack the cell containing `hhcode` at `resolution` into a GeoCell.
///
/// Returns `None` for odd resolutions and resolutions outside 2 to 30.
pub fn to_geocell(hhcode: u64, resolution: u32) -> Option<u64> {
    if resolution & 1 != 0 || !(2..=MAX_GEOCELL_RESOLUTION).contains(&resolution) {
        return None;
    }

    let index = resolution as u64 >> 1;
    let mut geocell = index << 60;
    geocell |= (hhcode >> 4) & PAYLOAD_MASK;
    geocell &= !((1u64 << (4 * (15 - index))) - 1);

    Some(geocell)
}

/// GeoCells of `hhcode` at every resolution from 2 up to `finest`.
///
/// `finest` is capped at 30; below 2 the result is empty.
pub fn to_geocells(hhcode: u64, finest: u32) -> Vec<u64> {
    let finest = finest.min(MAX_GEOCELL_RESOLUTION);
    let mut cells = Vec::with_capacity((finest / 2) as usize);

    for resolution in (2..=finest).step_by(2) {
        if let Some(cell) = to_geocell(hhcode, resolution) {
            cells.push(cell);
        }
    }

    cells
}

/// Resolution encoded in a GeoCell.
#[inline]
pub fn resolution(geocell: u64) -> u32 {
    ((geocell >> 60) & 0xf) as u32 * 2
}

/// The 16 direct children of a GeoCell.
///
/// Children of a resolution 30 cell do not fit the GeoCell layout and
/// come back as raw resolution 32 HHCodes.
pub fn children(geocell: u64) -> [u64; 16] {
    let index = (geocell >> 60) & 0xf;
    let mut cells = [0u64; 16];

    if index == 15 {
        for (i, cell) in cells.iter_mut().enumerate() {
            *cell = ((geocell << 4) & 0xffff_ffff_ffff_fff0) | i as u64;
        }
    } else {
        let payload = geocell & PAYLOAD_MASK;
        for (i, cell) in cells.iter_mut().enumerate() {
            *cell = ((index + 1) << 60) | payload | ((i as u64) << (4 * (15 - (index + 1))));
        }
    }

    cells
}

/// The enclosing GeoCell one resolution step up, or `None` at the
/// coarsest level.
pub fn parent(geocell: u64) -> Option<u64> {
    let index = (geocell >> 60) & 0xf;

    if index <= 1 {
        return None;
    }

    let parent_index = index - 1;
    let payload = geocell & PAYLOAD_MASK & !((1u64 << (4 * (15 - parent_index))) - 1);

    Some((parent_index << 60) | payload)
}

/// Whether `hhcode` falls inside any cell of a sorted GeoCell slice.
///
/// `geocells` must be sorted ascending; the candidate enclosing cell
/// at each resolution is looked up by binary search.
pub fn contains(geocells: &[u64], hhcode: u64) -> bool {
    contains_within(geocells, hhcode, 2, MAX_GEOCELL_RESOLUTION)
}

/// [`contains`] restricted to resolutions in `[coarsest, finest]`.
///
/// Bounds are clamped to the representable 2 to 30 range, so passing a
/// raw resolution 32 as `finest` checks every GeoCell level.
pub fn contains_within(geocells: &[u64], hhcode: u64, coarsest: u32, finest: u32) -> bool {
    let coarsest = coarsest.max(2);
    let finest = finest.min(MAX_GEOCELL_RESOLUTION);

    for resolution in (coarsest..=finest).step_by(2) {
        if let Some(cell) = to_geocell(hhcode, resolution) {
            if geocells.binary_search(&cell).is_ok() {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hhcode;

    #[test]
    fn test_to_geocell_packs_resolution_index() {
        let hhcode = 0xb570_7070_7070_7070;

        assert_eq!(to_geocell(hhcode, 2), Some(0x1b00_0000_0000_0000));
        assert_eq!(to_geocell(hhcode, 4), Some(0x2b50_0000_0000_0000));
        assert_eq!(to_geocell(hhcode, 30), Some(0xfb57_0707_0707_0707));
    }

    #[test]
    fn test_to_geocell_rejects_bad_resolutions() {
        assert_eq!(to_geocell(0, 0), None);
        assert_eq!(to_geocell(0, 3), None);
        assert_eq!(to_geocell(0, 32), None);
    }

    #[test]
    fn test_to_geocells_covers_every_level() {
        let cells = to_geocells(0xb570_7070_7070_7070, 30);

        assert_eq!(cells.len(), 15);
        for (i, cell) in cells.iter().enumerate() {
            assert_eq!(resolution(*cell), 2 * (i as u32 + 1));
        }
    }

    #[test]
    fn test_to_geocells_honors_finest() {
        assert_eq!(to_geocells(0, 8).len(), 4);
        assert_eq!(to_geocells(0, 32).len(), 15);
        assert!(to_geocells(0, 0).is_empty());
    }

    #[test]
    fn test_children_stay_inside_parent() {
        let cell = to_geocell(0xb570_7070_7070_7070, 8).unwrap();

        for child in children(cell) {
            assert_eq!(resolution(child), 10);
            assert_eq!(parent(child), Some(cell));
        }
    }

    #[test]
    fn test_children_enumerate_distinct_nibbles() {
        let cell = to_geocell(0xb570_7070_7070_7070, 8).unwrap();
        let kids = children(cell);

        for i in 1..16 {
            assert_ne!(kids[i], kids[i - 1]);
        }
    }

    #[test]
    fn test_children_of_finest_geocell_are_hhcodes() {
        let cell = to_geocell(0xb570_7070_7070_7070, 30).unwrap();
        let kids = children(cell);

        // Raw resolution 32 keys share the parent's 60-bit prefix
        assert_eq!(kids[0], 0xb570_7070_7070_7070);
        assert_eq!(kids[15], 0xb570_7070_7070_707f);
    }

    #[test]
    fn test_parent_of_coarsest_is_none() {
        let cell = to_geocell(0xb570_7070_7070_7070, 2).unwrap();
        assert_eq!(parent(cell), None);
    }

    #[test]
    fn test_contains_matches_enclosing_cells() {
        let hhcode = hhcode::from_lat_lon(48.0, -4.5);
        let mut cells = vec![
            to_geocell(hhcode, 6).unwrap(),
            to_geocell(0x1234_5678_9abc_def0, 10).unwrap(),
        ];
        cells.sort_unstable();

        assert!(contains(&cells, hhcode));
        assert!(contains(&cells, 0x1234_5678_0000_0000));
        assert!(!contains(&cells, 0x0123_4567_89ab_cdef));
    }

    #[test]
    fn test_contains_on_empty_slice() {
        assert!(!contains(&[], 0xb570_7070_7070_7070));
    }

    #[test]
    fn test_contains_within_respects_bounds() {
        let cells = vec![to_geocell(0xb570_7070_7070_7070, 10).unwrap()];

        assert!(contains_within(&cells, 0xb570_7070_0000_0000, 2, 30));
        assert!(contains_within(&cells, 0xb570_7070_0000_0000, 10, 10));
        // The enclosing cell sits at resolution 10, outside both windows
        assert!(!contains_within(&cells, 0xb570_7070_0000_0000, 2, 8));
        assert!(!contains_within(&cells, 0xb570_7070_0000_0000, 12, 30));
    }
}
