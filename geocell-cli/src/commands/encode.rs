//! Encode command - turn a coordinate pair into a cell.

use clap::Args;
use geocell::hhcode;

use crate::error::CliError;

/// Arguments for the encode command.
#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Resolution of the reported cell, an even value from 2 to 32
    #[arg(short, long, default_value_t = 32)]
    pub resolution: u32,
}

/// Run the encode command.
pub fn run(args: &EncodeArgs) -> Result<(), CliError> {
    let resolution = hhcode::check_resolution(args.resolution)
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;

    let cell = hhcode::from_lat_lon(args.lat, args.lon);
    println!("{}", hhcode::to_hex(cell, resolution));

    Ok(())
}
