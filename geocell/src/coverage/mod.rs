//! Cell-set coverages over the HHCode grid.
//!
//! A [`Coverage`] is the in-memory form: one set of cells per even
//! resolution, with merging, pruning, normalization and set algebra on
//! top. Rasterizers hand cells to anything implementing [`CellSink`],
//! which both the in-memory container and the streaming writer in
//! [`crate::stream`] do; [`GeoCellFilter`] slots between the two when
//! output must be restricted to (or kept out of) a zone of GeoCells.

mod kml;
mod set;
mod sink;

pub use kml::write_kml;
pub use set::Coverage;
pub use sink::{CellSink, GeoCellFilter};

pub(crate) use kml::{write_cell, write_footer, write_header};
