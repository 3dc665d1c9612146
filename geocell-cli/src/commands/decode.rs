//! Decode command - report the location and extent of a cell.

use clap::Args;
use geocell::hhcode::{self, MAX_RESOLUTION};
use serde::Serialize;

use crate::error::CliError;

/// Arguments for the decode command.
#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Cell to decode, 1 to 16 hex digits
    pub cell: String,

    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct Point {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Serialize)]
struct Bounds {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
}

#[derive(Debug, Serialize)]
struct DecodeReport {
    cell: String,
    resolution: u32,
    center: Point,
    bounds: Bounds,
}

fn report(cell: &str) -> Result<DecodeReport, CliError> {
    let (hhcode, resolution) =
        hhcode::from_hex(cell).map_err(|e| CliError::InvalidArgument(e.to_string()))?;

    let (lat, lon) = hhcode::to_lat_lon(hhcode::center(hhcode, resolution), MAX_RESOLUTION);
    let bounds = hhcode::cell_bounds(hhcode, resolution);

    Ok(DecodeReport {
        cell: hhcode::to_hex(hhcode, resolution),
        resolution,
        center: Point { lat, lon },
        bounds: Bounds {
            south: bounds.south,
            west: bounds.west,
            north: bounds.north,
            east: bounds.east,
        },
    })
}

/// Run the decode command.
pub fn run(args: &DecodeArgs) -> Result<(), CliError> {
    let report = report(&args.cell)?;

    if args.json {
        let text = serde_json::to_string_pretty(&report).map_err(|e| CliError::Io(e.into()))?;
        println!("{}", text);
    } else {
        println!("cell:       {}", report.cell);
        println!("resolution: {}", report.resolution);
        println!("center:     {:.6}:{:.6}", report.center.lat, report.center.lon);
        println!("south west: {:.6}:{:.6}", report.bounds.south, report.bounds.west);
        println!("north east: {:.6}:{:.6}", report.bounds.north, report.bounds.east);
    }

    Ok(())
}
