//! Resolution auto-selection for the rasterizers.
//!
//! Shapes covered without an explicit resolution get one derived from
//! their bounding box: the log2 of the box's unit spans picks a cell
//! size a little smaller than the box, with guards keeping the two
//! axes comparable and the result inside the valid range.

use crate::hhcode::MIN_RESOLUTION;

/// Largest tolerated gap between the per-axis log2 spans before the
/// larger axis wins.
const MAX_RESOLUTION_GAP: i32 = 4;

/// Cell-per-side ceiling for the polyline heuristic.
const MAX_CELLS_PER_SIDE: u64 = 64;

/// Finest resolution the polyline heuristic will pick, about 60cm of
/// cell side at the equator.
const POLYLINE_RESOLUTION_CAP: i32 = 26;

/// Bounding box of a vertex list, as `[south, west, north, east]` in
/// unit coordinates.
///
/// Returns `None` for an empty list.
pub fn bounding_box(vertices: &[(i64, i64)]) -> Option<[i64; 4]> {
    let (first, rest) = vertices.split_first()?;

    let mut bbox = [first.0, first.1, first.0, first.1];

    for &(lat, lon) in rest {
        bbox[0] = bbox[0].min(lat);
        bbox[1] = bbox[1].min(lon);
        bbox[2] = bbox[2].max(lat);
        bbox[3] = bbox[3].max(lon);
    }

    Some(bbox)
}

/// Pick a covering resolution for a polygon from its bounding box.
///
/// The resolution comes from the floor log2 of the unit span on each
/// axis, the axes being kept within [`MAX_RESOLUTION_GAP`] of one
/// another, rounded even. `offset` then shifts the result, negative
/// values selecting a finer grid; a shift that would leave the valid
/// range is not applied.
pub fn optimal_polygon_resolution(bbox: &[i64; 4], offset: i32) -> u32 {
    let resoffset = -offset;

    // Spans wider than the grid wrap around, clamp them; a span of
    // zero has no log2, treat it as one unit
    let delta_lat = (bbox[2] - bbox[0])
        .unsigned_abs()
        .min((1u64 << 32) - 1)
        .max(1);
    let delta_lon = (bbox[3] - bbox[1])
        .unsigned_abs()
        .min((1u64 << 32) - 1)
        .max(1);

    let latres = delta_lat.ilog2() as i32;
    let lonres = delta_lon.ilog2() as i32;

    let mut resolution = if (latres - lonres).abs() > MAX_RESOLUTION_GAP {
        latres.max(lonres) - MAX_RESOLUTION_GAP
    } else {
        latres.min(lonres)
    };

    resolution &= 0xfe;
    resolution = 32 - resolution;

    if resolution + resoffset <= 32 {
        resolution = (resolution + resoffset).max(MIN_RESOLUTION as i32);
        resolution &= 0x3e;
    }

    resolution as u32
}

/// Pick a covering resolution for a polyline from its bounding box.
///
/// Starts four steps finer than the polygon choice so the line is not
/// covered too coarsely, backs off while the box spans more than
/// [`MAX_CELLS_PER_SIDE`] cells on either axis (a long horizontal line
/// would otherwise explode the cell count), caps at resolution 26,
/// then applies `offset` as in [`optimal_polygon_resolution`].
pub fn optimal_polyline_resolution(bbox: &[i64; 4], offset: i32) -> u32 {
    let mut resolution = optimal_polygon_resolution(bbox, 0) as i32 + 4;

    let delta_lat = (bbox[2] - bbox[0]).unsigned_abs();
    let delta_lon = (bbox[3] - bbox[1]).unsigned_abs();

    while resolution <= 32
        && ((delta_lat >> (32 - resolution) as u32) > MAX_CELLS_PER_SIDE
            || (delta_lon >> (32 - resolution) as u32) > MAX_CELLS_PER_SIDE)
    {
        resolution -= 2;
    }

    if resolution > POLYLINE_RESOLUTION_CAP {
        resolution = POLYLINE_RESOLUTION_CAP;
    }

    if resolution - offset <= 32 && resolution - offset >= MIN_RESOLUTION as i32 {
        resolution -= offset;
        resolution &= 0x3e;
    }

    resolution as u32
}
