//! CLI command definitions using Clap.
//!
//! - `config_cmd` - Configuration inspection commands
//! - `replay` - Script replay against a headless map

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{self, ConfigError, RxConfig};
use crate::error::MapsRxError;
use crate::logging;
use crate::slots::SlotRelease;

pub mod config_cmd;
pub mod replay;

pub use config_cmd::ConfigCommands;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// maps-rx CLI - Drive map event streams from the command line.
#[derive(Parser, Debug)]
#[command(name = "maps-rx")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Slot release policy, overriding the configuration file.
    #[arg(long, global = true, value_enum, value_name = "POLICY")]
    pub release: Option<SlotRelease>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Replay a script of subscriptions and host events.
    ///
    /// Runs every step against a fresh headless map on the main thread and
    /// prints each event a subscriber received, followed by the final state
    /// of every slot the script touched.
    #[command(
        verbatim_doc_comment,
        after_long_help = r#"Examples:
  maps-rx replay clicks.jsonc                    # Human-readable output
  maps-rx replay clicks.jsonc --json             # Report as JSON
  maps-rx replay clicks.jsonc --release owner-only"#
    )]
    Replay {
        /// The script to replay.
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Print the report as JSON.
        #[arg(long, short)]
        json: bool,
    },

    /// Configuration file commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

impl Cli {
    /// The effective configuration: file (or defaults) plus flag overrides.
    fn effective_config(&self) -> RxConfig {
        let mut effective = config::get_config().clone();
        if let Some(release) = self.release {
            effective.slot_release = release;
        }
        effective
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), MapsRxError> {
        if let Some(path) = &self.config {
            if !path.exists() {
                return Err(ConfigError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Configuration file not found: {}", path.display()),
                ))
                .into());
            }
            // Validate up front so a broken file is an error, not a silent default.
            config::load_config_from_path(path)?;
            config::set_custom_config_path(path.clone());
        }

        let effective = self.effective_config();
        logging::init(&effective.log);

        match &self.command {
            Commands::Replay { script, json } => replay::execute(script, *json, &effective),
            Commands::Config(cmd) => config_cmd::execute(cmd, &effective),
        }
    }
}
