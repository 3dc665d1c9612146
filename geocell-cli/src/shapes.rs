//! Textual shape definitions and their rasterization.
//!
//! The cover command accepts shapes in a compact `kind:body` syntax:
//!
//! - `circle:LAT:LON:RADIUS` with the radius in meters
//! - `polygon:LAT:LON,LAT:LON,LAT:LON(,LAT:LON)*`
//! - `rect:LAT:LON,LAT:LON` naming two opposite corners
//! - `path:LAT:LON:DIST(,LAT:LON(:DIST)?)+` buffered by DIST meters,
//!   adjustable per segment
//! - `polyline:DIST:ENCODED` where ENCODED is a Google Maps encoded
//!   polyline, buffered by DIST meters
//!
//! Malformed definitions emit no cells rather than failing partway
//! through, so a bad term in a compound expression contributes an
//! empty set.

use geocell::coverage::CellSink;
use geocell::hhcode::{self, LAT_UNITS_PER_METER, LON_UNITS_PER_METER};
use geocell::raster;

/// Number of sides on each quadrant of the polygon approximating a circle.
const QUADRANT_SIDES: usize = 16;

/// Parse an area definition and rasterize it into `sink`.
///
/// Unknown kinds and malformed bodies add nothing.
pub fn parse_area<S: CellSink>(def: &str, resolution: i32, sink: &mut S) {
    if let Some(body) = def.strip_prefix("circle:") {
        parse_circle(body, resolution, sink);
    } else if let Some(body) = def.strip_prefix("polygon:") {
        parse_polygon(body, resolution, sink);
    } else if let Some(body) = def.strip_prefix("rect:") {
        parse_rect(body, resolution, sink);
    } else if let Some(body) = def.strip_prefix("path:") {
        parse_path(body, resolution, sink);
    } else if let Some(body) = def.strip_prefix("polyline:") {
        parse_buffered_polyline(body, resolution, sink);
    }
}

/// Rasterize a `LAT:LON,...` vertex list as a filled polygon.
pub fn parse_polygon<S: CellSink>(body: &str, resolution: i32, sink: &mut S) {
    if let Some(vertices) = polygon_vertices(body) {
        raster::cover_polygon(&vertices, resolution, sink);
    }
}

fn polygon_vertices(body: &str) -> Option<Vec<(i64, i64)>> {
    let entries: Vec<&str> = body.split(',').collect();
    if entries.len() < 3 {
        return None;
    }

    let mut vertices = Vec::with_capacity(entries.len());
    for entry in entries {
        let fields: Vec<&str> = entry.split(':').collect();
        // Entries that are not exactly LAT:LON are skipped, not fatal
        if fields.len() != 2 {
            continue;
        }
        let lat: f64 = fields[0].parse().ok()?;
        let lon: f64 = fields[1].parse().ok()?;
        vertices.push((hhcode::lat_to_unit(lat), hhcode::lon_to_unit(lon)));
    }

    if vertices.len() < 3 {
        return None;
    }

    // Drop an explicit closing point, the ring closes implicitly
    if vertices.first() == vertices.last() {
        vertices.pop();
    }

    Some(vertices)
}

/// Rasterize a `LAT:LON:RADIUS` disc as a 64-gon.
pub fn parse_circle<S: CellSink>(body: &str, resolution: i32, sink: &mut S) {
    if let Some(vertices) = circle_vertices(body) {
        raster::cover_polygon(&vertices, resolution, sink);
    }
}

fn circle_vertices(body: &str) -> Option<Vec<(i64, i64)>> {
    let fields: Vec<&str> = body.split(':').collect();
    if fields.len() != 3 {
        return None;
    }

    let lat: f64 = fields[0].parse().ok()?;
    let lon: f64 = fields[1].parse().ok()?;
    let radius: f64 = fields[2].parse::<f64>().ok()?.abs();

    let center_lat = hhcode::lat_to_unit(lat) as f64;
    let center_lon = hhcode::lon_to_unit(lon) as f64;

    // Longitude units per meter grow with latitude
    let scale = lat.to_radians().cos();
    let lat_radius = (radius * LAT_UNITS_PER_METER).round();
    let lon_radius = (radius * LON_UNITS_PER_METER / scale).round();

    let side_angle = std::f64::consts::PI * 2.0 / (4.0 * QUADRANT_SIDES as f64);
    let mut vertices = vec![(0i64, 0i64); 4 * QUADRANT_SIDES];

    // One trig evaluation per quadrant covers all four
    for i in 0..QUADRANT_SIDES {
        let a = i as f64 * side_angle;
        let c = a.cos();
        let s = a.sin();

        vertices[i] = (
            (center_lat + s * lat_radius) as i64,
            (center_lon + c * lon_radius) as i64,
        );
        vertices[i + QUADRANT_SIDES] = (
            (center_lat + c * lat_radius) as i64,
            (center_lon - s * lon_radius) as i64,
        );
        vertices[i + 2 * QUADRANT_SIDES] = (
            (center_lat - s * lat_radius) as i64,
            (center_lon - c * lon_radius) as i64,
        );
        vertices[i + 3 * QUADRANT_SIDES] = (
            (center_lat - c * lat_radius) as i64,
            (center_lon + s * lon_radius) as i64,
        );
    }

    Some(vertices)
}

/// Rasterize a `LAT:LON,LAT:LON` corner pair as a filled rectangle.
///
/// Corners may come in any vertical order. A western longitude east of
/// the eastern one with the signs opposing means the rectangle spans
/// the antimeridian and is covered as two halves.
pub fn parse_rect<S: CellSink>(body: &str, resolution: i32, sink: &mut S) {
    let corners: Vec<&str> = body.split(',').collect();
    if corners.len() != 2 {
        return;
    }
    if let (Some(sw), Some(ne)) = (corner(corners[0]), corner(corners[1])) {
        raster::cover_rectangle(sw, ne, resolution, sink);
    }
}

fn corner(text: &str) -> Option<(f64, f64)> {
    let mut fields = text.split(':');
    let lat = fields.next()?.parse().ok()?;
    let lon = fields.next()?.parse().ok()?;
    Some((lat, lon))
}

/// Rasterize a buffered path, one thickened segment at a time.
///
/// A node's third field sets the buffer distance from that node
/// onwards. Segments traversed while the distance is zero emit
/// nothing.
pub fn parse_path<S: CellSink>(body: &str, resolution: i32, sink: &mut S) {
    let nodes = match path_nodes(body) {
        Some(nodes) => nodes,
        None => return,
    };

    let mut distance = 0.0;
    for pair in nodes.windows(2) {
        let (from, from_distance) = pair[0];
        let (to, _) = pair[1];
        if let Some(d) = from_distance {
            distance = d;
        }
        if distance > 0.0 {
            raster::cover_segment(from, to, distance, resolution, sink);
        }
    }
}

/// Tokenize every node up front so malformed input emits nothing.
fn path_nodes(body: &str) -> Option<Vec<((i64, i64), Option<f64>)>> {
    let coords: Vec<&str> = body.split(',').collect();
    if coords.len() < 2 {
        return None;
    }

    let mut nodes = Vec::with_capacity(coords.len());
    for (i, coord) in coords.iter().enumerate() {
        let fields: Vec<&str> = coord.split(':').collect();
        if fields.len() < 2 {
            return None;
        }
        let lat: f64 = fields[0].parse().ok()?;
        let lon: f64 = fields[1].parse().ok()?;

        // The last node never starts a segment, its distance is dead
        let distance = if fields.len() == 3 && i + 1 < coords.len() {
            Some(fields[2].parse::<f64>().ok()?)
        } else {
            None
        };

        nodes.push(((hhcode::lat_to_unit(lat), hhcode::lon_to_unit(lon)), distance));
    }

    Some(nodes)
}

/// Rasterize a `DIST:ENCODED` buffered encoded polyline.
pub fn parse_buffered_polyline<S: CellSink>(body: &str, resolution: i32, sink: &mut S) {
    let idx = match body.find(':') {
        Some(idx) => idx,
        None => return,
    };
    let distance: f64 = match body[..idx].parse() {
        Ok(d) => d,
        Err(_) => return,
    };

    let vertices = decode_polyline(&body[idx + 1..]);
    for pair in vertices.windows(2) {
        raster::cover_segment(pair[0], pair[1], distance, resolution, sink);
    }
}

/// Decode one zigzag varint delta: 5-bit chunks offset by 63, low bit
/// of the result selecting the complement.
fn decode_chunk(bytes: &[u8], index: &mut usize) -> i32 {
    let mut shift = 0u32;
    let mut result: i32 = 0;
    loop {
        let b = bytes[*index] as i32 - 63;
        *index += 1;
        result |= (b & 0x1f).wrapping_shl(shift);
        shift += 5;
        if b < 0x20 || *index >= bytes.len() {
            break;
        }
    }

    if result & 1 != 0 { !(result >> 1) } else { result >> 1 }
}

/// Decode a Google Maps encoded polyline into unit coordinates.
fn decode_polyline(encoded: &str) -> Vec<(i64, i64)> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i32 = 0;
    let mut lng: i32 = 0;
    let mut vertices = Vec::new();

    while index < bytes.len() {
        lat = lat.wrapping_add(decode_chunk(bytes, &mut index));
        if index < bytes.len() {
            lng = lng.wrapping_add(decode_chunk(bytes, &mut index));
        }
        vertices.push((
            hhcode::lat_to_unit(f64::from(lat) / 1e5),
            hhcode::lon_to_unit(f64::from(lng) / 1e5),
        ));
    }

    vertices
}
