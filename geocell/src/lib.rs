//! HHCode cell indexing for geographic data.
//!
//! An HHCode packs a latitude and a longitude into a single 64-bit key
//! by interleaving their bits; truncating the key to fewer bit pairs
//! names a square cell rather than a point. On top of that codec this
//! library provides a resolution-bucketed cell set with clustering and
//! set algebra ([`coverage`]), rasterizers that fill polygons, lines
//! and buffered segments with cells ([`raster`]), great-circle helpers
//! ([`geodesy`]) and a streaming pipeline for cell files that do not
//! fit in memory ([`stream`]).
//!
//! # Quick tour
//!
//! ```ignore
//! use geocell::coverage::Coverage;
//! use geocell::{hhcode, raster};
//!
//! let paris = hhcode::from_lat_lon(48.8566, 2.3522);
//! println!("{}", hhcode::to_hex(paris, 16));
//!
//! let mut cells = Coverage::new();
//! raster::cover_rectangle((48.0, 2.0), (49.0, 3.0), 0, &mut cells);
//! cells.optimize(0);
//! println!("{cells}");
//! ```

pub mod coverage;
pub mod geodesy;
pub mod hhcode;
pub mod logging;
pub mod raster;
pub mod stream;

/// Version of the geocell library and CLI.
///
/// Kept in a single place so the crates in this workspace always
/// report the same version, injected from `Cargo.toml` at compile
/// time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
