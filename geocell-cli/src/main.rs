//! geocell CLI - command-line interface
//!
//! This binary provides a command-line interface to the geocell
//! library: encoding and decoding cells, rasterizing shapes, and set
//! algebra over cell streams. Cell output always goes to stdout or the
//! requested file; logs go to stderr and the log file.

mod commands;
mod config;
mod error;
mod runner;
mod shapes;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::combine::CombineArgs;
use commands::cover::CoverArgs;
use commands::decode::DecodeArgs;
use commands::encode::EncodeArgs;
use commands::normalize::NormalizeArgs;
use commands::optimize::OptimizeArgs;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "geocell")]
#[command(version = geocell::VERSION)]
#[command(about = "Encode, cover and combine geodesic cells", long_about = None)]
struct Cli {
    /// Path to an alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Turn a coordinate pair into a cell
    Encode(EncodeArgs),
    /// Report the location and extent of a cell
    Decode(DecodeArgs),
    /// Evaluate a shape expression into a cell stream
    Cover(CoverArgs),
    /// Apply a set operation to two cell streams
    Combine(CombineArgs),
    /// Rewrite a cell stream at a fixed resolution
    Normalize(NormalizeArgs),
    /// Collapse sibling groups in a cell stream
    Optimize(OptimizeArgs),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Encode(_) => "encode",
            Command::Decode(_) => "decode",
            Command::Cover(_) => "cover",
            Command::Combine(_) => "combine",
            Command::Normalize(_) => "normalize",
            Command::Optimize(_) => "optimize",
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage problems exit 1, help and version exit 0
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    let runner = match CliRunner::new(cli.config.as_deref(), cli.debug) {
        Ok(runner) => runner,
        Err(e) => e.exit(),
    };
    runner.log_startup(cli.command.name());

    let result = match &cli.command {
        Command::Encode(args) => commands::encode::run(args),
        Command::Decode(args) => commands::decode::run(args),
        Command::Cover(args) => commands::cover::run(args, &runner),
        Command::Combine(args) => commands::combine::run(args, &runner),
        Command::Normalize(args) => commands::normalize::run(args),
        Command::Optimize(args) => commands::optimize::run(args, &runner),
    };

    if let Err(e) = result {
        e.exit();
    }
}
