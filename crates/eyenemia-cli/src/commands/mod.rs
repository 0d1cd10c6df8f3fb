//! CLI command definitions and handlers.

pub mod models;
pub mod screen;

use clap::{Parser, Subcommand};

/// Eyenemia - eye-photo quality gate and anemia screening
#[derive(Parser)]
#[command(name = "eyenemia")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the quality gate and the screening pipeline
    Screen(screen::ScreenArgs),
    /// Run the quality gate only (no models needed)
    Check(screen::ScreenArgs),
    /// Inspect installed models
    Models(models::ModelsArgs),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every image passed (and was diagnosed, for `screen`).
    Success = 0,
    /// At least one image was rejected or not diagnosed.
    NotDiagnosed = 1,
    /// The command could not run.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}
