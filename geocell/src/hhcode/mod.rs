//! HHCode codec.
//!
//! An HHCode is a 64-bit key interleaving a latitude and a longitude,
//! each first mapped onto an unsigned 32-bit "unit" grid:
//!
//! - latitude unit = floor((lat + 90) / (180 / 2^32))
//! - longitude unit = floor((lon + 180) / (360 / 2^32))
//!
//! The two unit values are bit-interleaved MSB first, latitude taking
//! the higher bit of each pair. Truncating the key to its top
//! `resolution` bit pairs names a cell; resolution 2 names one cell of
//! a 4 by 4 world grid, resolution 32 is about a centimeter.

mod error;
pub mod geocell;

pub use error::CodecError;

/// Coarsest resolution (one hex digit, two bits per axis).
pub const MIN_RESOLUTION: u32 = 2;

/// Finest resolution (full 32 bits per axis).
pub const MAX_RESOLUTION: u32 = 32;

/// Degrees of latitude per unit.
pub const DEGREES_PER_LAT_UNIT: f64 = 180.0 / 4_294_967_296.0;

/// Degrees of longitude per unit.
pub const DEGREES_PER_LON_UNIT: f64 = 360.0 / 4_294_967_296.0;

/// Radians of latitude per unit.
pub const RADIANS_PER_LAT_UNIT: f64 = std::f64::consts::PI / 4_294_967_296.0;

/// Radians of longitude per unit.
pub const RADIANS_PER_LON_UNIT: f64 = (2.0 * std::f64::consts::PI) / 4_294_967_296.0;

/// Latitude units per meter, one minute of arc being a nautical mile.
pub const LAT_UNITS_PER_METER: f64 = 4_294_967_296.0 / (180.0 * 60.0 * 1852.0);

/// Longitude units per meter at the equator.
pub const LON_UNITS_PER_METER: f64 = 4_294_967_296.0 / (360.0 * 60.0 * 1852.0);

/// Geographic bounding box of a cell, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    /// Southern latitude
    pub south: f64,
    /// Western longitude
    pub west: f64,
    /// Northern latitude
    pub north: f64,
    /// Eastern longitude
    pub east: f64,
}

/// Clamp a resolution into the valid even range 2 to 32.
#[inline]
pub(crate) fn clamp_resolution(resolution: u32) -> u32 {
    resolution.clamp(MIN_RESOLUTION, MAX_RESOLUTION) & !1
}

/// Validate a resolution, rejecting odd or out-of-range values.
///
/// The permissive codec entry points clamp instead; use this where a
/// bad resolution must be reported rather than absorbed.
#[inline]
pub fn check_resolution(resolution: u32) -> Result<u32, CodecError> {
    if resolution < MIN_RESOLUTION || resolution > MAX_RESOLUTION || resolution & 1 != 0 {
        return Err(CodecError::InvalidResolution(resolution));
    }
    Ok(resolution)
}

/// Spread the 32 bits of `value` over the even bit positions of a u64.
#[inline]
const fn spread(value: u32) -> u64 {
    let mut v = value as u64;
    v = (v | (v << 16)) & 0x0000_ffff_0000_ffff;
    v = (v | (v << 8)) & 0x00ff_00ff_00ff_00ff;
    v = (v | (v << 4)) & 0x0f0f_0f0f_0f0f_0f0f;
    v = (v | (v << 2)) & 0x3333_3333_3333_3333;
    v = (v | (v << 1)) & 0x5555_5555_5555_5555;
    v
}

/// Collapse the even bit positions of `value` back into 32 bits.
#[inline]
const fn compact(value: u64) -> u32 {
    let mut v = value & 0x5555_5555_5555_5555;
    v = (v | (v >> 1)) & 0x3333_3333_3333_3333;
    v = (v | (v >> 2)) & 0x0f0f_0f0f_0f0f_0f0f;
    v = (v | (v >> 4)) & 0x00ff_00ff_00ff_00ff;
    v = (v | (v >> 8)) & 0x0000_ffff_0000_ffff;
    v = (v | (v >> 16)) & 0x0000_0000_ffff_ffff;
    v as u32
}

/// Mask keeping the top `resolution` bit pairs of an HHCode.
#[inline]
fn key_mask(resolution: u32) -> u64 {
    !0u64 << (2 * (MAX_RESOLUTION - resolution))
}

/// Build an HHCode from unit coordinates.
///
/// Coordinates are taken modulo 2^32, with one twist: when the
/// latitude overflows into bit 32 (a walk across a pole), the latitude
/// is mirrored and the longitude shifted by half a turn, so stepping
/// off a pole lands on the far meridian instead of wrapping to the
/// opposite hemisphere.
///
/// Bits below `resolution` are zeroed; out-of-range resolutions are
/// clamped to the nearest valid even value.
#[inline]
pub fn build(lat: i64, lon: i64, resolution: u32) -> u64 {
    let resolution = clamp_resolution(resolution);

    let mut lat = lat;
    let mut lon = lon;

    // Pole wrap
    if 0 != (lat & 0x1_0000_0000) {
        lat ^= 0xffff_ffff;
        lon ^= 0x8000_0000;
    }

    lat &= 0xffff_ffff;
    lon &= 0xffff_ffff;

    let hhcode = (spread(lat as u32) << 1) | spread(lon as u32);

    hhcode & key_mask(resolution)
}

/// Split an HHCode back into `(lat, lon)` unit coordinates.
///
/// Exact inverse of [`build`]: bits below `resolution` come back as
/// zero, so the result names the southwest corner of the cell.
#[inline]
pub fn split(hhcode: u64, resolution: u32) -> (u32, u32) {
    let resolution = clamp_resolution(resolution);
    let mask = !0u32 << (MAX_RESOLUTION - resolution);
    (compact(hhcode >> 1) & mask, compact(hhcode) & mask)
}

/// Convert a latitude in degrees to a unit coordinate.
///
/// 90.0 maps to the last unit row rather than the first row of the
/// wrapped grid. A latitude just below -90.0 maps to -1 so the
/// caller's modulo arithmetic wraps it instead of pinning it to 0.
#[inline]
pub fn lat_to_unit(lat: f64) -> i64 {
    if lat == 90.0 {
        return (1i64 << 32) - 1;
    }

    let mut unit = ((lat + 90.0) / DEGREES_PER_LAT_UNIT) as i64;

    if lat + 90.0 < 0.0 && unit == 0 {
        unit = -1;
    }

    unit
}

/// Convert a longitude in degrees to a unit coordinate.
#[inline]
pub fn lon_to_unit(lon: f64) -> i64 {
    if lon == 180.0 {
        return (1i64 << 32) - 1;
    }

    let mut unit = ((lon + 180.0) / DEGREES_PER_LON_UNIT) as i64;

    if lon + 180.0 < 0.0 && unit == 0 {
        unit = -1;
    }

    unit
}

/// Convert a latitude unit coordinate back to degrees.
#[inline]
pub fn unit_to_lat(unit: i64) -> f64 {
    unit as f64 * DEGREES_PER_LAT_UNIT - 90.0
}

/// Convert a longitude unit coordinate back to degrees.
#[inline]
pub fn unit_to_lon(unit: i64) -> f64 {
    unit as f64 * DEGREES_PER_LON_UNIT - 180.0
}

/// Encode a position in degrees as a full-resolution HHCode.
#[inline]
pub fn from_lat_lon(lat: f64, lon: f64) -> u64 {
    build(lat_to_unit(lat), lon_to_unit(lon), MAX_RESOLUTION)
}

/// Decode an HHCode to degrees at the given resolution.
///
/// Returns the southwest corner of the cell; see [`center`] for the
/// middle.
#[inline]
pub fn to_lat_lon(hhcode: u64, resolution: u32) -> (f64, f64) {
    let (lat, lon) = split(hhcode, resolution);
    (unit_to_lat(lat as i64), unit_to_lon(lon as i64))
}

/// One cell side at `resolution`, in units.
#[inline]
fn unit_delta(resolution: u32) -> i64 {
    1i64 << (MAX_RESOLUTION - clamp_resolution(resolution))
}

/// The cell one step north at `resolution`.
///
/// Stepping wraps silently across the dateline and mirrors across the
/// poles (see [`build`]); range clipping is the caller's concern. Bits
/// below `resolution` are preserved.
#[inline]
pub fn north(hhcode: u64, resolution: u32) -> u64 {
    let (lat, lon) = split(hhcode, MAX_RESOLUTION);
    build(lat as i64 + unit_delta(resolution), lon as i64, MAX_RESOLUTION)
}

/// The cell one step south at `resolution`.
#[inline]
pub fn south(hhcode: u64, resolution: u32) -> u64 {
    let (lat, lon) = split(hhcode, MAX_RESOLUTION);
    build(lat as i64 - unit_delta(resolution), lon as i64, MAX_RESOLUTION)
}

/// The cell one step east at `resolution`.
#[inline]
pub fn east(hhcode: u64, resolution: u32) -> u64 {
    let (lat, lon) = split(hhcode, MAX_RESOLUTION);
    build(lat as i64, lon as i64 + unit_delta(resolution), MAX_RESOLUTION)
}

/// The cell one step west at `resolution`.
#[inline]
pub fn west(hhcode: u64, resolution: u32) -> u64 {
    let (lat, lon) = split(hhcode, MAX_RESOLUTION);
    build(lat as i64, lon as i64 - unit_delta(resolution), MAX_RESOLUTION)
}

/// The cell one step north and one step east at `resolution`.
#[inline]
pub fn north_east(hhcode: u64, resolution: u32) -> u64 {
    let (lat, lon) = split(hhcode, MAX_RESOLUTION);
    let delta = unit_delta(resolution);
    build(lat as i64 + delta, lon as i64 + delta, MAX_RESOLUTION)
}

/// The cell one step south and one step east at `resolution`.
#[inline]
pub fn south_east(hhcode: u64, resolution: u32) -> u64 {
    let (lat, lon) = split(hhcode, MAX_RESOLUTION);
    let delta = unit_delta(resolution);
    build(lat as i64 - delta, lon as i64 + delta, MAX_RESOLUTION)
}

/// The cell one step south and one step west at `resolution`.
#[inline]
pub fn south_west(hhcode: u64, resolution: u32) -> u64 {
    let (lat, lon) = split(hhcode, MAX_RESOLUTION);
    let delta = unit_delta(resolution);
    build(lat as i64 - delta, lon as i64 - delta, MAX_RESOLUTION)
}

/// The cell one step north and one step west at `resolution`.
#[inline]
pub fn north_west(hhcode: u64, resolution: u32) -> u64 {
    let (lat, lon) = split(hhcode, MAX_RESOLUTION);
    let delta = unit_delta(resolution);
    build(lat as i64 + delta, lon as i64 - delta, MAX_RESOLUTION)
}

/// Full-resolution HHCode of the center of the cell containing
/// `hhcode` at `resolution`.
pub fn center(hhcode: u64, resolution: u32) -> u64 {
    let resolution = clamp_resolution(resolution);
    let (lat, lon) = split(hhcode, MAX_RESOLUTION);
    let offset = ((1i64 << (MAX_RESOLUTION - resolution)) - 1) >> 1;
    build(lat as i64 | offset, lon as i64 | offset, MAX_RESOLUTION)
}

/// Geographic bounding box of the cell containing `hhcode` at
/// `resolution`.
pub fn cell_bounds(hhcode: u64, resolution: u32) -> CellBounds {
    let resolution = clamp_resolution(resolution);
    let (lat, lon) = split(hhcode, MAX_RESOLUTION);
    let offset = (1i64 << (MAX_RESOLUTION - resolution)) - 1;

    let south = (lat as i64 | offset) ^ offset;
    let west = (lon as i64 | offset) ^ offset;

    CellBounds {
        south: unit_to_lat(south),
        west: unit_to_lon(west),
        north: unit_to_lat(south | offset),
        east: unit_to_lon(west | offset),
    }
}

/// Render an HHCode as lowercase hex truncated to `resolution / 2`
/// digits.
///
/// Resolution 32 yields the full 16 digits, resolution 2 a single
/// digit. Odd resolutions round down, values above 32 clamp.
pub fn to_hex(hhcode: u64, resolution: u32) -> String {
    let digits = ((resolution & !1) / 2).min(16) as usize;
    let mut text = format!("{:016x}", hhcode);
    text.truncate(digits);
    text
}

/// Parse the hex form back into an HHCode and its resolution.
///
/// The digit count is the cell's resolution / 2; missing low digits
/// read as zero.
///
/// # Errors
///
/// Returns [`CodecError::InvalidHex`] when `text` is empty, longer
/// than 16 digits, or not hexadecimal.
pub fn from_hex(text: &str) -> Result<(u64, u32), CodecError> {
    if text.is_empty() || text.len() > 16 {
        return Err(CodecError::InvalidHex(text.to_string()));
    }

    let value =
        u64::from_str_radix(text, 16).map_err(|_| CodecError::InvalidHex(text.to_string()))?;

    let resolution = 2 * text.len() as u32;

    Ok((value << (64 - 4 * text.len()), resolution))
}
