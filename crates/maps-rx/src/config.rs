//! Configuration for maps-rx.
//!
//! The configuration file supports JSONC format (JSON with comments). Both
//! single-line (`//`) and multi-line (`/* */`) comments are allowed. Every
//! field is optional; a missing file means defaults.
//!
//! ```jsonc
//! {
//!   // "unconditional" (default) or "ownerOnly"
//!   "slotRelease": "ownerOnly",
//!   "warnOffContextDelivery": true,
//!   "log": { "filter": "maps_rx=debug" }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::slots::SlotRelease;

/// Directory name used under the platform config directories.
const APP_DIR: &str = "maps-rx";

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Default tracing filter.
const DEFAULT_LOG_FILTER: &str = "info";

/// Global configuration instance, loaded once on first use.
static CONFIG: OnceLock<RxConfig> = OnceLock::new();

/// Custom config path override (set via CLI --config flag).
static CUSTOM_CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Bridge behaviour settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RxConfig {
    /// What a disposing subscription writes to its slot.
    pub slot_release: SlotRelease,

    /// Log a warning when the host delivers an event off the main context.
    /// The event is still forwarded.
    pub warn_off_context_delivery: bool,

    /// Logging settings.
    pub log: LogConfig,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directives. `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self { Self { filter: DEFAULT_LOG_FILTER.to_string() } }
}

/// Errors that can occur when loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error("No configuration file found. Expected at ~/.config/maps-rx/config.jsonc")]
    NotFound,
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/maps-rx/config.jsonc` or `config.json`, if set
/// 2. `~/.config/maps-rx/config.jsonc` or `config.json`
/// 3. The platform config directory (`dirs::config_dir()`)
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut dirs_to_search = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        dirs_to_search.push(PathBuf::from(xdg_config).join(APP_DIR));
    }
    if let Some(home) = dirs::home_dir() {
        dirs_to_search.push(home.join(".config").join(APP_DIR));
    }
    if let Some(config_dir) = dirs::config_dir() {
        dirs_to_search.push(config_dir.join(APP_DIR));
    }

    let mut paths = Vec::new();
    for dir in dirs_to_search {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Loads and parses a JSONC configuration file.
///
/// # Errors
///
/// Returns `ConfigError::Io` if the file cannot be read and
/// `ConfigError::Parse` if it is not valid JSON once comments are stripped.
pub fn load_config_from_path(path: &Path) -> Result<RxConfig, ConfigError> {
    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Loads the configuration from the first config file that exists.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists, or the
/// error from [`load_config_from_path`] for the first file found.
pub fn load_config() -> Result<(RxConfig, PathBuf), ConfigError> {
    for path in config_paths() {
        if path.exists() {
            let config = load_config_from_path(&path)?;
            return Ok((config, path));
        }
    }
    Err(ConfigError::NotFound)
}

/// Sets a custom configuration file path to use instead of the search paths.
///
/// Must be called before the first [`get_config`] to take effect. Returns
/// `false` if a path was already set.
pub fn set_custom_config_path(path: PathBuf) -> bool { CUSTOM_CONFIG_PATH.set(path).is_ok() }

/// The path of the custom configuration file, if one was set.
#[must_use]
pub fn custom_config_path() -> Option<&'static Path> {
    CUSTOM_CONFIG_PATH.get().map(PathBuf::as_path)
}

fn load_or_default() -> RxConfig {
    let result = CUSTOM_CONFIG_PATH.get().map_or_else(
        || load_config().map(|(config, _)| config),
        |path| load_config_from_path(path),
    );

    match result {
        Ok(config) => config,
        Err(ConfigError::NotFound) => RxConfig::default(),
        Err(err) => {
            // Logging may not be initialised yet; the CLI re-reports this.
            eprintln!("maps-rx: warning: {err}; using default configuration");
            RxConfig::default()
        }
    }
}

/// The process-wide configuration, loaded on first call.
pub fn get_config() -> &'static RxConfig { CONFIG.get_or_init(load_or_default) }
