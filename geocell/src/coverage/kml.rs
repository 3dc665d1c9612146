//! KML rendering of coverages.
//!
//! Each cell becomes a filled `Placemark` polygon over its lat/lon
//! bounding box, ready to drop into Google Earth for eyeballing a
//! coverage.

use std::io::{self, Write};

use crate::hhcode;

use super::set::Coverage;

pub(crate) fn write_header<W: Write>(writer: &mut W) -> io::Result<()> {
    writer.write_all(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;
    writer.write_all(b"<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n")?;
    writer.write_all(b"<Document>\n")?;
    writer.write_all(b"  <name>geocell coverage</name>\n")
}

pub(crate) fn write_cell<W: Write>(writer: &mut W, resolution: u32, hhcode: u64) -> io::Result<()> {
    let bounds = hhcode::cell_bounds(hhcode, resolution);

    writer.write_all(b"  <Placemark>\n")?;
    writer.write_all(b"  <Style>\n")?;
    writer.write_all(b"    <LineStyle>\n")?;
    writer.write_all(b"      <color>c0008000</color>\n")?;
    writer.write_all(b"      <width>1</width>\n")?;
    writer.write_all(b"    </LineStyle>\n")?;
    writer.write_all(b"    <PolyStyle>\n")?;
    writer.write_all(b"      <color>c0f0f0f0</color>\n")?;
    writer.write_all(b"      <fill>1</fill>\n")?;
    writer.write_all(b"      <outline>1</outline>\n")?;
    writer.write_all(b"    </PolyStyle>\n")?;
    writer.write_all(b"  </Style>\n")?;
    writeln!(writer, "    <name>{}</name>", hhcode::to_hex(hhcode, resolution))?;
    writer.write_all(b"    <MultiGeometry>\n")?;
    writer.write_all(b"      <tessellate>1</tessellate>\n")?;
    writer.write_all(b"      <Polygon><outerBoundaryIs><LinearRing>\n")?;
    writer.write_all(b"        <coordinates>\n")?;
    // Ring runs SW, NW, NE, SE and back, KML's lon,lat,alt order
    writeln!(writer, "          {},{},0", bounds.west, bounds.south)?;
    writeln!(writer, "          {},{},0", bounds.west, bounds.north)?;
    writeln!(writer, "          {},{},0", bounds.east, bounds.north)?;
    writeln!(writer, "          {},{},0", bounds.east, bounds.south)?;
    writeln!(writer, "          {},{},0", bounds.west, bounds.south)?;
    writer.write_all(b"        </coordinates>\n")?;
    writer.write_all(b"      </LinearRing></outerBoundaryIs></Polygon>\n")?;
    writer.write_all(b"    </MultiGeometry>\n")?;
    writer.write_all(b"  </Placemark>\n")
}

pub(crate) fn write_footer<W: Write>(writer: &mut W) -> io::Result<()> {
    writer.write_all(b"</Document>\n")?;
    writer.write_all(b"</kml>\n")
}

/// Render `coverage` as a KML document, one placemark per cell.
///
/// # Errors
///
/// Returns any error raised by the underlying writer.
pub fn write_kml<W: Write>(coverage: &Coverage, writer: &mut W) -> io::Result<()> {
    write_header(writer)?;

    for (resolution, cell) in coverage.sorted_cells() {
        write_cell(writer, resolution, cell)?;
    }

    write_footer(writer)
}
