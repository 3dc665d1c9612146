//! Cell emission seam between rasterizers and coverage stores.

use crate::hhcode::{self, geocell};

/// Receiver for cells produced by the rasterizers.
///
/// The in-memory [`Coverage`](super::Coverage) implements this for
/// direct accumulation; decorators such as [`GeoCellFilter`] sit in
/// between when cells need vetting before they land.
pub trait CellSink {
    /// Record the cell at `resolution` containing `hhcode`.
    fn add_cell(&mut self, resolution: u32, hhcode: u64);

    /// Record the cell at `resolution` containing the point at
    /// `(lat, lon)` unit coordinates.
    ///
    /// Coordinates wrap toroidally: values outside `[0, 2^32)` come
    /// back in range modulo 2^32 on each axis independently, with no
    /// pole mirroring.
    fn add_cell_at(&mut self, resolution: u32, lat: i64, lon: i64) {
        let span = 1i64 << 32;
        let hhcode = hhcode::build(
            lat.rem_euclid(span),
            lon.rem_euclid(span),
            hhcode::MAX_RESOLUTION,
        );
        self.add_cell(resolution, hhcode);
    }
}

/// A [`CellSink`] decorator admitting cells by GeoCell membership.
///
/// With `exclude` unset only cells lying inside one of `geocells` pass
/// through; with it set only cells lying outside do. A cell lies
/// inside when some zone cell at its resolution or coarser encloses
/// it.
pub struct GeoCellFilter<'a, S> {
    sink: &'a mut S,
    geocells: &'a [u64],
    exclude: bool,
}

impl<'a, S: CellSink> GeoCellFilter<'a, S> {
    /// Wrap `sink`. `geocells` must be sorted ascending.
    pub fn new(sink: &'a mut S, geocells: &'a [u64], exclude: bool) -> Self {
        GeoCellFilter {
            sink,
            geocells,
            exclude,
        }
    }
}

impl<S: CellSink> CellSink for GeoCellFilter<'_, S> {
    fn add_cell(&mut self, resolution: u32, hhcode: u64) {
        let inside = geocell::contains_within(self.geocells, hhcode, 2, resolution);

        if inside != self.exclude {
            self.sink.add_cell(resolution, hhcode);
        }
    }
}
