//! CLI entry point of the tilt motion-planning experiment runner

use std::process::ExitCode;

use clap::Parser;
use tiltplan::io::cli::{Cli, ExperimentRunner};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let runner = ExperimentRunner::new(cli);
    ExitCode::from(runner.run() as u8)
}
