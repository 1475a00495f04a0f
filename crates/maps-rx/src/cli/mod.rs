//! CLI module for maps-rx.
//!
//! Replays scripted host events against a headless map and inspects the
//! configuration. Everything runs in-process on the main thread.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;

use crate::error::MapsRxError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), MapsRxError> {
    let cli = Cli::parse();
    cli.execute()
}
