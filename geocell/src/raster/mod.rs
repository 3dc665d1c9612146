//! Shape rasterizers.
//!
//! Each function walks a shape expressed in unit coordinates and
//! pushes every cell it touches into a [`CellSink`], usually a
//! [`Coverage`](crate::coverage::Coverage). Coordinates are `i64` so
//! shapes may legitimately overshoot the grid (a circle drawn around a
//! pole, a box across the antimeridian); the sink wraps them back onto
//! the sphere.
//!
//! Polygons use a scanline fill over cell rows, pairing edge crossings
//! sorted by longitude. Cells are also claimed along each crossing
//! edge itself, so thin spikes narrower than a cell still show up in
//! the coverage.

mod resolution;

pub use resolution::{bounding_box, optimal_polygon_resolution, optimal_polyline_resolution};

use std::collections::HashSet;

use crate::coverage::CellSink;
use crate::geodesy;
use crate::hhcode::{self, LAT_UNITS_PER_METER, MAX_RESOLUTION};

/// Cover a polygon with cells at `resolution`.
///
/// Vertices are (lat, lon) unit pairs and the polygon is implicitly
/// closed. A resolution at or below zero is auto-selected from the
/// bounding box, the value acting as a finer/coarser offset (so -2
/// covers one step finer than the optimum). Fewer than three vertices
/// cover nothing.
pub fn cover_polygon<S: CellSink>(vertices: &[(i64, i64)], resolution: i32, sink: &mut S) {
    if vertices.len() < 3 {
        return;
    }

    let Some(bbox) = bounding_box(vertices) else {
        return;
    };

    let resolution = if resolution <= 0 {
        optimal_polygon_resolution(&bbox, resolution)
    } else {
        hhcode::clamp_resolution(resolution as u32)
    };

    let offset = 1i64 << (32 - resolution);
    let offsetmask = offset - 1;
    let prefixmask = !offsetmask;

    // Snap the scanned latitude range outward to cell boundaries
    let top_lat = bbox[2] | offsetmask;
    let bottom_lat = bbox[0] & prefixmask;

    // Scan rows are every cell-row bottom in range plus every raw
    // vertex latitude, deduplicated
    let mut row_set: HashSet<i64> = vertices.iter().map(|&(lat, _)| lat).collect();

    let mut lat = bottom_lat;
    while lat <= top_lat {
        row_set.insert(lat & prefixmask);
        lat += offset;
    }

    let mut rows: Vec<i64> = row_set.into_iter().collect();
    rows.sort_unstable();

    let mut crossings: Vec<i64> = Vec::with_capacity(vertices.len());

    for lat in rows {
        crossings.clear();

        // Walk the edges, j trailing i to close the ring
        let mut j = vertices.len() - 1;

        for i in 0..vertices.len() {
            let (ilat, ilon) = vertices[i];
            let (jlat, jlon) = vertices[j];

            if ilat != jlat && ((ilat >= lat && jlat <= lat) || (jlat >= lat && ilat <= lat)) {
                // The edge crosses this row. Interpolate where it
                // meets the row's bottom and top; the slope must be
                // f64 or the products wrap for shapes reaching past
                // the grid.
                let slope = (jlon - ilon) as f64 / (jlat - ilat) as f64;

                let bottom_lon = ilon + ((lat - ilat) as f64 * slope) as i64;
                let top_lon = ilon + (((lat | offsetmask) - ilat) as f64 * slope) as i64;

                let mut start = top_lon & prefixmask;
                let mut stop = bottom_lon & prefixmask;

                if start > stop {
                    std::mem::swap(&mut start, &mut stop);
                }

                // Claim the columns the edge passes through on this
                // row, keeping the westernmost as the edge's crossing
                let mut crossing = 0i64;
                let mut claimed = false;

                let mut lng = start;
                while lng <= stop {
                    if (lng >= (ilon & prefixmask) && lng <= (jlon | offsetmask))
                        || (lng >= (jlon & prefixmask) && lng <= (ilon | offsetmask))
                    {
                        sink.add_cell_at(resolution, lat, lng);
                        if !claimed {
                            crossing = lng;
                            claimed = true;
                        }
                    }
                    lng += offset;
                }

                // A row through a vertex takes the crossing only at a
                // local extremum, otherwise the vertex would count
                // once per adjacent edge and break the pairing
                let next = vertices[(i + 1) % vertices.len()].0;

                if lat != ilat || (next - ilat).signum() * (jlat - ilat).signum() > 0 {
                    crossings.push(crossing);
                }
            } else if ilat == jlat && (lat & prefixmask) == (ilat & prefixmask) {
                // Horizontal edge on this row, enumerate it directly
                let mut lng = ilon.min(jlon);
                let stop = ilon.max(jlon);

                while lng <= stop {
                    sink.add_cell_at(resolution, lat, lng);
                    lng += offset;
                }
            }

            j = i;
        }

        crossings.sort_unstable();

        // Fill between crossing pairs; an unpaired trailing crossing
        // is dropped
        for pair in crossings.chunks_exact(2) {
            let mut lng = pair[0] & prefixmask;
            let stop = pair[1] | offsetmask;

            while lng <= stop {
                sink.add_cell_at(resolution, lat, lng);
                lng += offset;
            }
        }
    }
}

/// Cover the straight segment between two unit positions.
///
/// A resolution at or below zero is auto-selected from the endpoints,
/// the value acting as an offset as in [`cover_polygon`].
pub fn cover_line<S: CellSink>(from: (i64, i64), to: (i64, i64), resolution: i32, sink: &mut S) {
    let resolution = if resolution <= 0 {
        optimal_polyline_resolution(&[from.0, from.1, to.0, to.1], resolution)
    } else {
        hhcode::clamp_resolution(resolution as u32)
    };

    walk_line(from, to, resolution, sink);
}

/// DDA walk from cell to cell along a segment.
///
/// At each cell the slope to the exit corner is compared with the
/// segment slope to decide whether the segment leaves east, north or
/// south, or exactly through the corner.
fn walk_line<S: CellSink>(mut from: (i64, i64), mut to: (i64, i64), resolution: u32, sink: &mut S) {
    // Walk west to east
    if from.1 > to.1 {
        std::mem::swap(&mut from, &mut to);
    }

    let dlat = (to.0 - from.0).abs();
    let dlon = (to.1 - from.1).abs();

    let north = to.0 - from.0;

    let offset = 1i64 << (32 - resolution);
    let offsetmask = offset - 1;
    let prefixmask = !offsetmask;

    if north == 0 {
        let (lat, mut lon) = from;

        while (lon & prefixmask) < to.1 {
            sink.add_cell_at(resolution, lat, lon);
            lon += offset;
        }
    } else if to.1 == from.1 {
        let (mut lat, lon) = from;

        if north > 0 {
            while (lat & prefixmask) < to.0 {
                sink.add_cell_at(resolution, lat, lon);
                lat += offset;
            }
        } else {
            while (lat | offsetmask) > to.0 {
                sink.add_cell_at(resolution, lat, lon);
                lat -= offset;
            }
        }
    } else {
        let (mut lat, mut lon) = from;

        loop {
            sink.add_cell_at(resolution, lat, lon);

            // Distances to the exit sides of the current cell
            let latoffset = if north > 0 {
                (lat | offsetmask) + 1 - lat
            } else {
                lat - (lat & prefixmask) + 1
            };
            let lonoffset = (lon | offsetmask) + 1 - lon;

            let latoffdlon = latoffset * dlon;
            let lonoffdlat = lonoffset * dlat;
            let delta = latoffdlon - lonoffdlat;

            if delta > 0 {
                // The segment exits through the east side
                lat += north.signum() * (lonoffdlat / dlon);
                lon = (lon | offsetmask) + 1;
            } else if delta < 0 {
                // Through the north or south side
                if north > 0 {
                    lat = (lat | offsetmask) + 1;
                } else {
                    lat = (lat & prefixmask) - 1;
                }
                lon += latoffdlon / dlat;
            } else {
                // Exactly through the corner
                if north > 0 {
                    lat = (lat | offsetmask) + 1;
                } else {
                    lat = (lat & prefixmask) - 1;
                }
                lon = (lon | offsetmask) + 1;
            }

            let more = if north > 0 {
                (lat & prefixmask) < to.0 && (lon & prefixmask) < to.1
            } else {
                (lat | offsetmask) > to.0 && (lon & prefixmask) < to.1
            };

            if !more {
                break;
            }
        }
    }
}

/// Cover a polyline segment by segment.
///
/// With `approximate` set the cheaper Bresenham walk is used instead
/// of the exact cell walk; it may skip cells the segment barely grazes
/// but includes both endpoint cells. A resolution at or below zero
/// auto-selects from the whole polyline's bounding box.
pub fn cover_polyline<S: CellSink>(
    vertices: &[(i64, i64)],
    resolution: i32,
    approximate: bool,
    sink: &mut S,
) {
    if vertices.len() < 2 {
        return;
    }

    let resolution = if resolution <= 0 {
        match bounding_box(vertices) {
            Some(bbox) => optimal_polyline_resolution(&bbox, resolution),
            None => return,
        }
    } else {
        hhcode::clamp_resolution(resolution as u32)
    };

    for pair in vertices.windows(2) {
        if approximate {
            bresenham_segment(pair[0], pair[1], resolution, sink);
        } else {
            walk_line(pair[0], pair[1], resolution, sink);
        }
    }
}

/// Bresenham walk over the cell grid.
fn bresenham_segment<S: CellSink>(
    from: (i64, i64),
    to: (i64, i64),
    resolution: u32,
    sink: &mut S,
) {
    let offset = 1i64 << (32 - resolution);
    let prefixmask = !(offset - 1);

    // Walk the dominant axis; a steep segment walks latitude and
    // swaps the axes back when emitting
    let steep = (to.0 - from.0).abs() > (to.1 - from.1).abs();

    let (mut a, mut b) = (from, to);

    if steep {
        a = (a.1, a.0);
        b = (b.1, b.0);
    }

    if a.1 > b.1 {
        std::mem::swap(&mut a, &mut b);
    }

    let deltalat = (b.0 - a.0).abs();
    let deltalon = b.1 - a.1;

    let mut error = deltalon >> 2;

    let mut lat = a.0;
    let mut lon = a.1;

    let latstep = if a.0 < b.0 { offset } else { -offset };

    while (lon & prefixmask) <= b.1 {
        if steep {
            sink.add_cell_at(resolution, lon, lat);
        } else {
            sink.add_cell_at(resolution, lat, lon);
        }

        error -= deltalat;

        if error < 0 {
            lat += latstep;
            error += deltalon;
        }

        lon += offset;
    }
}

/// Cover a segment thickened by `distance` meters on every side.
///
/// The segment is inflated into a rectangle reaching `distance` beyond
/// both endpoints and on both flanks, using the meters-to-units scale
/// at the segment midpoint, then handed to the polygon fill. The
/// length computation is cartesian at the midpoint latitude, good
/// enough at buffering scales.
pub fn cover_segment<S: CellSink>(
    from: (i64, i64),
    to: (i64, i64),
    distance: f64,
    resolution: i32,
    sink: &mut S,
) {
    let mid = hhcode::build((from.0 + to.0) / 2, (from.1 + to.1) / 2, MAX_RESOLUTION);
    let (_, lon_scale) = geodesy::local_scale(mid);

    // Direction vector and its orthogonal
    let dir = (to.0 - from.0, to.1 - from.1);
    let ortho = (-dir.1, dir.0);

    let dir_len = ((dir.0 as f64 / LAT_UNITS_PER_METER).powi(2)
        + ((dir.1 / lon_scale) as f64).powi(2))
    .sqrt();
    let ortho_len = ((ortho.0 as f64 / LAT_UNITS_PER_METER).powi(2)
        + ((ortho.1 / lon_scale) as f64).powi(2))
    .sqrt();

    let a = (
        from.0
            + (ortho.0 as f64 * (distance / ortho_len) - dir.0 as f64 * (distance / dir_len))
                as i64,
        from.1
            + (ortho.1 as f64 * (distance / ortho_len) - dir.1 as f64 * (distance / dir_len))
                as i64,
    );
    let b = (
        a.0 + (dir.0 as f64 * ((dir_len + 2.0 * distance) / dir_len)) as i64,
        a.1 + (dir.1 as f64 * ((dir_len + 2.0 * distance) / dir_len)) as i64,
    );
    let c = (
        b.0 - (ortho.0 as f64 * (2.0 * distance / ortho_len)) as i64,
        b.1 - (ortho.1 as f64 * (2.0 * distance / ortho_len)) as i64,
    );
    let d = (
        c.0 - (dir.0 as f64 * ((dir_len + 2.0 * distance) / dir_len)) as i64,
        c.1 - (dir.1 as f64 * ((dir_len + 2.0 * distance) / dir_len)) as i64,
    );

    cover_polygon(&[a, b, c, d], resolution, sink);
}

/// Cover a latitude/longitude rectangle given in degrees.
///
/// `sw` and `ne` are (lat, lon) corners. A box whose western edge lies
/// east of its eastern edge with the longitudes of opposite signs
/// crosses the antimeridian; it is split at ±180 and both halves are
/// covered separately.
pub fn cover_rectangle<S: CellSink>(sw: (f64, f64), ne: (f64, f64), resolution: i32, sink: &mut S) {
    let (swlat, swlon) = sw;
    let (nelat, nelon) = ne;

    if swlon > nelon && swlon * nelon <= 0.0 {
        let south = hhcode::lat_to_unit(swlat);
        let north = hhcode::lat_to_unit(nelat);
        let west = hhcode::lon_to_unit(swlon);
        let east = hhcode::lon_to_unit(nelon);

        let dateline_east = hhcode::lon_to_unit(180.0);
        let dateline_west = hhcode::lon_to_unit(-180.0);

        cover_polygon(
            &[
                (south, west),
                (north, west),
                (north, dateline_east),
                (south, dateline_east),
            ],
            resolution,
            sink,
        );
        cover_polygon(
            &[
                (south, east),
                (north, east),
                (north, dateline_west),
                (south, dateline_west),
            ],
            resolution,
            sink,
        );

        return;
    }

    // Corners can arrive tangled, reorder instead of guessing intent
    let south = hhcode::lat_to_unit(swlat.min(nelat));
    let north = hhcode::lat_to_unit(swlat.max(nelat));
    let west = hhcode::lon_to_unit(swlon.min(nelon));
    let east = hhcode::lon_to_unit(swlon.max(nelon));

    cover_polygon(
        &[(south, west), (south, east), (north, east), (north, west)],
        resolution,
        sink,
    );
}

/// Collapse consecutive polyline nodes falling in the same cell at
/// `resolution`.
///
/// Keeps the first node of each run, re-centered in its cell. Only
/// consecutive duplicates collapse; a path revisiting a cell later
/// keeps the revisit.
pub fn resample_polyline(nodes: &[u64], resolution: u32) -> Vec<u64> {
    let resolution = hhcode::clamp_resolution(resolution);

    let mask = !0u64 << (2 * (32 - resolution));

    // Half a cell on both axes, centering the node
    let center = if resolution == 32 {
        0
    } else {
        0xcu64 << (2 * (32 - 2 - resolution))
    };

    let mut resampled = Vec::new();
    let mut last = None;

    for &node in nodes {
        if last == Some(node & mask) {
            continue;
        }

        resampled.push((node & mask) | center);
        last = Some(node & mask);
    }

    resampled
}
