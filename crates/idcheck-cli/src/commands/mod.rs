//! CLI command definitions and handlers.

pub mod check;
pub mod models;

use clap::{Parser, Subcommand};

/// idcheck - ID photo compliance checker
#[derive(Parser)]
#[command(name = "idcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared check arguments (paths, thresholds, flags).
    #[command(flatten)]
    pub check: check::CheckArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Validate photos against the ID photo rules
    Check(check::CheckArgs),
    /// Inspect detector models
    Models(models::ModelsArgs),
}

/// Process exit status.
///
/// Mirrors the decision status codes: a batch exits with the worst status
/// seen, and any photo that could not be evaluated counts as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every photo was approved.
    Success = 0,
    /// At least one photo needs correction or was rejected.
    NotApproved = 1,
    /// A photo could not be evaluated, or the command failed.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}
