//! Great-circle helpers over unit coordinates.
//!
//! Positions are `(lat, lon)` pairs on the unit grid (see
//! [`crate::hhcode`]), kept as `i64` so intermediate geometry may
//! temporarily leave the 0..2^32 range. Distances are spherical; no
//! ellipsoidal correction is attempted.
//!
//! Formulas follow Ed Williams' Aviation Formulary (great circle
//! distance, intermediate points, rhumb line length).

use crate::hhcode::{
    self, LAT_UNITS_PER_METER, LON_UNITS_PER_METER, MAX_RESOLUTION, RADIANS_PER_LAT_UNIT,
    RADIANS_PER_LON_UNIT,
};

/// Tolerance under which a rhumb line is treated as east-west.
const RHUMB_TOLERANCE: f64 = 1e-15;

#[inline]
fn to_radians(point: (i64, i64)) -> (f64, f64) {
    (
        point.0 as f64 * RADIANS_PER_LAT_UNIT - std::f64::consts::PI / 2.0,
        point.1 as f64 * RADIANS_PER_LON_UNIT - std::f64::consts::PI,
    )
}

#[inline]
fn haversine(flat: f64, flon: f64, tlat: f64, tlon: f64) -> f64 {
    let sin_lat = ((flat - tlat) / 2.0).sin();
    let sin_lon = ((flon - tlon) / 2.0).sin();

    2.0 * (sin_lat * sin_lat + flat.cos() * tlat.cos() * sin_lon * sin_lon)
        .sqrt()
        .asin()
}

/// Great-circle distance between two positions, in radians.
///
/// Multiply by the sphere radius implied by the unit/meter constants
/// (180 * 60 * 1852 / pi meters) for a distance in meters.
pub fn orthodromic_distance(from: (i64, i64), to: (i64, i64)) -> f64 {
    let (flat, flon) = to_radians(from);
    let (tlat, tlon) = to_radians(to);

    haversine(flat, flon, tlat, tlon)
}

/// Intermediate point at `fraction` of the great circle from `from`
/// to `to`.
///
/// Fractions at or outside [0, 1] return the closest endpoint.
/// Longitudes wholly below 0 or at/above 2^32 are brought into range
/// by whole-turn offsets before interpolating and the result is
/// shifted back, landing between the endpoint longitudes.
///
/// Returns `None` when either latitude is outside [0, 2^32) or the
/// longitude span reaches half a turn, where the great circle is
/// ambiguous.
pub fn great_circle_intermediate(
    from: (i64, i64),
    to: (i64, i64),
    fraction: f64,
) -> Option<(i64, i64)> {
    if from.0 < 0 || to.0 < 0 || from.0 >= (1i64 << 32) || to.0 >= (1i64 << 32) {
        return None;
    }

    if (from.1 - to.1).abs() >= (1i64 << 31) {
        return None;
    }

    if fraction <= 0.0 {
        return Some(from);
    } else if fraction >= 1.0 {
        return Some(to);
    }

    // Whole-turn offset bringing at least one longitude into range
    let mut lonoffset = 0i64;

    if from.1 < 0 && to.1 < 0 {
        while from.1 + lonoffset < 0 {
            lonoffset += 1i64 << 32;
        }
    } else if from.1 >= (1i64 << 32) && to.1 >= (1i64 << 32) {
        while from.1 + lonoffset >= (1i64 << 32) {
            lonoffset -= 1i64 << 32;
        }
    }

    let from_lon = from.1 + lonoffset;
    let to_lon = to.1 + lonoffset;

    let (flat, flon) = to_radians((from.0, from_lon));
    let (tlat, tlon) = to_radians((to.0, to_lon));

    let d = haversine(flat, flon, tlat, tlon);

    let sd = d.sin();
    let a = ((1.0 - fraction) * d).sin() / sd;
    let b = (fraction * d).sin() / sd;

    let x = a * flat.cos() * flon.cos() + b * tlat.cos() * tlon.cos();
    let y = a * flat.cos() * flon.sin() + b * tlat.cos() * tlon.sin();
    let z = a * flat.sin() + b * tlat.sin();

    let rlat = z.atan2((x * x + y * y).sqrt());
    let rlon = y.atan2(x);

    let lat = ((rlat + std::f64::consts::PI / 2.0) / RADIANS_PER_LAT_UNIT) as i64;
    let mut lon = ((rlon + std::f64::consts::PI) / RADIANS_PER_LON_UNIT) as i64;

    lon -= lonoffset;

    // atan2 may have picked the representative a turn away; move the
    // longitude between the endpoints
    if from.1 < to.1 {
        if lon < from.1 {
            lon += 1i64 << 32;
        } else if lon > to.1 {
            lon -= 1i64 << 32;
        }
    } else if lon < to.1 {
        lon += 1i64 << 32;
    } else if lon > from.1 {
        lon -= 1i64 << 32;
    }

    Some((lat, lon))
}

/// Replace a segment by points along its great circle.
///
/// The segment is recursively split at the great-circle midpoint
/// whenever the rhumb line between two consecutive points is more than
/// `delta` times longer than the orthodromy, so drawing straight lines
/// between the returned points stays close to the true track. `delta`
/// must be above 1.0 or the refinement never settles.
///
/// Segments spanning half a turn of longitude or more are first cut
/// just short of 180 degrees. Latitudes outside [0, 2^32] return the
/// segment untouched.
pub fn orthodromize(from: (i64, i64), to: (i64, i64), delta: f64) -> Vec<(i64, i64)> {
    let mut points = vec![from, to];

    if from.0 < 0 || from.0 > (1i64 << 32) || to.0 < 0 || to.0 > (1i64 << 32) {
        return points;
    }

    let mut i = 0;

    while i + 1 < points.len() {
        let p = points[i];
        let q = points[i + 1];

        let dlon = (p.1 - q.1).abs();

        if dlon > (1i64 << 31) - 1 {
            // Cut at just under 180 degrees of longitude along the
            // chord, then refine both halves
            let ratio = (((1i64 << 31) - 100) as f64) / dlon as f64;
            let inter_lat = (p.0 as f64 * (1.0 - ratio) + ratio * q.0 as f64) as i64;
            let inter_lon = (p.1 as f64 * (1.0 - ratio) + ratio * q.1 as f64) as i64;

            points.insert(i + 1, (inter_lat, inter_lon));
            continue;
        }

        let (flat, flon) = to_radians(p);
        let (tlat, tlon) = to_radians(q);

        let gcd = haversine(flat, flon, tlat, tlon);

        // Rhumb line length
        let q_factor = if (tlat - flat).abs() < RHUMB_TOLERANCE.sqrt() {
            flat.cos()
        } else {
            (tlat - flat)
                / ((tlat / 2.0 + std::f64::consts::FRAC_PI_4).tan()
                    / (flat / 2.0 + std::f64::consts::FRAC_PI_4).tan())
                .ln()
        };

        let rld =
            ((tlat - flat) * (tlat - flat) + (q_factor * q_factor) * (tlon - flon) * (tlon - flon))
                .sqrt();

        let ratio = rld / gcd;

        if !ratio.is_finite() || ratio < delta {
            i += 1;
            continue;
        }

        match great_circle_intermediate(p, q, 0.5) {
            Some(midpoint) => points.insert(i + 1, midpoint),
            // Degenerate segment, leave it alone
            None => i += 1,
        }
    }

    points
}

/// Units per meter at the latitude of `hhcode`.
///
/// Latitude scale is constant; longitude scale grows with latitude as
/// parallels shrink. Both are rounded to whole units.
pub fn local_scale(hhcode: u64) -> (i64, i64) {
    let (lat, _) = hhcode::to_lat_lon(hhcode, MAX_RESOLUTION);
    let shrink = lat.to_radians().cos();

    (
        LAT_UNITS_PER_METER.round() as i64,
        (LON_UNITS_PER_METER / shrink).round() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hhcode::from_lat_lon;
    use std::f64::consts::PI;

    const EQUATOR: i64 = 0x8000_0000;

    #[test]
    fn test_antipodal_points_are_half_a_turn_apart() {
        let d = orthodromic_distance((EQUATOR, EQUATOR), (EQUATOR, 0));
        assert!((d - PI).abs() < 1e-9, "distance was {}", d);
    }

    #[test]
    fn test_pole_to_pole_distance() {
        let d = orthodromic_distance((0, 0x4000_0000), (0xffff_ffff, 0x4000_0000));
        assert!((d - PI).abs() < 1e-8, "distance was {}", d);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = (0xc444_4444, 0x1234_5678);
        assert_eq!(orthodromic_distance(p, p), 0.0);
    }

    #[test]
    fn test_paris_london_distance_in_meters() {
        let paris = crate::hhcode::split(from_lat_lon(48.8566, 2.3522), 32);
        let london = crate::hhcode::split(from_lat_lon(51.5074, -0.1278), 32);

        let radians = orthodromic_distance(
            (paris.0 as i64, paris.1 as i64),
            (london.0 as i64, london.1 as i64),
        );
        let meters = radians * (180.0 * 60.0 * 1852.0) / PI;

        assert!(
            (meters - 343_900.0).abs() < 5_000.0,
            "distance was {} m",
            meters
        );
    }

    #[test]
    fn test_intermediate_at_endpoints() {
        let from = (EQUATOR, 0x6000_0000);
        let to = (EQUATOR, 0xa000_0000);

        assert_eq!(great_circle_intermediate(from, to, 0.0), Some(from));
        assert_eq!(great_circle_intermediate(from, to, 1.0), Some(to));
        assert_eq!(great_circle_intermediate(from, to, -0.5), Some(from));
        assert_eq!(great_circle_intermediate(from, to, 1.5), Some(to));
    }

    #[test]
    fn test_intermediate_midpoint_on_equator() {
        let from = (EQUATOR, 0x6000_0000);
        let to = (EQUATOR, 0xa000_0000);

        let (lat, lon) = great_circle_intermediate(from, to, 0.5).unwrap();

        assert!((lat - EQUATOR).abs() <= 4, "lat was {:x}", lat);
        assert!((lon - 0x8000_0000i64).abs() <= 4, "lon was {:x}", lon);
    }

    #[test]
    fn test_intermediate_midpoint_on_meridian() {
        // -45 to +45 along one meridian
        let from = (0x4000_0000, 0x2000_0000);
        let to = (0xc000_0000, 0x2000_0000);

        let (lat, lon) = great_circle_intermediate(from, to, 0.5).unwrap();

        assert!((lat - EQUATOR).abs() <= 4, "lat was {:x}", lat);
        assert!((lon - 0x2000_0000i64).abs() <= 4, "lon was {:x}", lon);
    }

    #[test]
    fn test_intermediate_rejects_wide_spans() {
        assert_eq!(
            great_circle_intermediate((EQUATOR, 0), (EQUATOR, 1i64 << 31), 0.5),
            None
        );
        assert_eq!(
            great_circle_intermediate((-1, 0), (EQUATOR, 100), 0.5),
            None
        );
    }

    #[test]
    fn test_intermediate_handles_negative_longitudes() {
        // Both longitudes below 0; the result must come back in the
        // same negative frame, between the endpoints
        let from = (EQUATOR, -0x2000_0000);
        let to = (EQUATOR, -0x6000_0000);

        let (_, lon) = great_circle_intermediate(from, to, 0.5).unwrap();

        assert!(
            lon <= -0x2000_0000i64 && lon >= -0x6000_0000i64,
            "lon was {:x}",
            lon
        );
    }

    #[test]
    fn test_orthodromize_keeps_straight_segments() {
        // Along the equator the rhumb line is the great circle
        let from = (EQUATOR, 0x4000_0000);
        let to = (EQUATOR, 0x6000_0000);

        assert_eq!(orthodromize(from, to, 1.1), vec![from, to]);
    }

    #[test]
    fn test_orthodromize_refines_high_latitude_segment() {
        // 120 degrees of longitude at 60N; the great circle runs well
        // north of the parallel
        let from = (0xd555_5555, 0x5555_5555);
        let to = (0xd555_5555, 0xaaaa_aaaa);

        let points = orthodromize(from, to, 1.01);

        assert!(points.len() > 2, "expected refinement, got {:?}", points);
        assert_eq!(points[0], from);
        assert_eq!(*points.last().unwrap(), to);

        // Inserted points bulge toward the pole
        for p in &points[1..points.len() - 1] {
            assert!(p.0 > from.0, "point {:?} south of the endpoints", p);
        }
    }

    #[test]
    fn test_orthodromize_leaves_invalid_latitudes_alone() {
        let from = (-5, 0x4000_0000);
        let to = (EQUATOR, 0x6000_0000);

        assert_eq!(orthodromize(from, to, 1.1), vec![from, to]);
    }

    #[test]
    fn test_local_scale_at_equator() {
        let (lat_scale, lon_scale) = local_scale(from_lat_lon(0.0, 0.0));
        assert_eq!(lat_scale, 215);
        assert_eq!(lon_scale, 107);
    }

    #[test]
    fn test_local_scale_tightens_with_latitude() {
        let (_, equator) = local_scale(from_lat_lon(0.0, 0.0));
        let (_, sixty) = local_scale(from_lat_lon(60.0, 0.0));

        // cos(60) is one half
        assert_eq!(sixty, 2 * equator + 1);
    }
}
