//! Config CLI commands.

use clap::Subcommand;

use crate::cli::output::print_highlighted_json;
use crate::config::{RxConfig, config_paths, custom_config_path};
use crate::error::MapsRxError;

/// Config inspection commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ConfigCommands {
    /// Show the path to the configuration file.
    ///
    /// Displays the paths where maps-rx looks for configuration files,
    /// and indicates which one is currently in use (if any).
    Path,

    /// Show the effective configuration.
    ///
    /// Prints the configuration after defaults and command-line overrides
    /// have been applied.
    Show {
        /// Print plain JSON without highlighting.
        #[arg(long)]
        plain: bool,
    },
}

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the configuration cannot be serialized.
pub fn execute(cmd: &ConfigCommands, config: &RxConfig) -> Result<(), MapsRxError> {
    match cmd {
        ConfigCommands::Path => {
            show_config_path();
            Ok(())
        }
        ConfigCommands::Show { plain } => show_config(config, *plain),
    }
}

fn show_config(config: &RxConfig, plain: bool) -> Result<(), MapsRxError> {
    let value = serde_json::to_value(config)?;
    if plain {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_highlighted_json(&value);
    }
    Ok(())
}

fn show_config_path() {
    if let Some(path) = custom_config_path() {
        println!("Using configuration file from --config:\n\n  {}", path.display());
        return;
    }

    println!("Configuration file search paths (in priority order):\n");

    let paths = config_paths();
    let mut found_config = false;

    for (i, path) in paths.iter().enumerate() {
        let exists = path.exists();
        let marker = if exists && !found_config {
            found_config = true;
            " (active)"
        } else if exists {
            " (exists)"
        } else {
            ""
        };

        println!("  {}. {}{}", i + 1, path.display(), marker);
    }

    if !found_config {
        println!("\nNo configuration file found; defaults are in effect.");
    }
}
