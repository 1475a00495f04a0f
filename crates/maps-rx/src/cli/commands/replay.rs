//! Replay CLI command.

use std::path::Path;

use crate::cli::output::{print_highlighted_json, print_report};
use crate::config::RxConfig;
use crate::error::MapsRxError;
use crate::replay::{load_script, run_script};

/// Loads, runs and prints a replay script.
///
/// # Errors
///
/// Returns an error if the script cannot be read, does not parse, or
/// cancels a subscription that is not live.
pub fn execute(script: &Path, json: bool, config: &RxConfig) -> Result<(), MapsRxError> {
    let parsed = load_script(script)?;
    let report = run_script(&parsed, config)?;

    if json {
        print_highlighted_json(&serde_json::to_value(&report)?);
    } else {
        print_report(&report, config.slot_release);
    }
    Ok(())
}
