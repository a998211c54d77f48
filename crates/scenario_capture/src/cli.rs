use clap::{Parser, Subcommand};

use crate::capture::{ConfigCommandArgs, RunArgs, print_config, run_capture};
use crate::doctor::{DoctorArgs, run_doctor};
use crate::error::Result;

#[derive(Debug, Parser)]
#[command(
    name = "scenario_capture",
    about = "Record scenarios on screen and keep the video only when they fail",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
#[allow(clippy::large_enum_variant)]
pub enum Commands {
    /// Run a command as one scenario under capture.
    Run(RunArgs),

    /// Validate recorder, display and capture directory.
    Doctor(DoctorArgs),

    /// Print the resolved capture configuration as JSON.
    Config(ConfigCommandArgs),
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run_capture(args),
        Commands::Doctor(args) => run_doctor(args),
        Commands::Config(args) => print_config(args),
    }
}
