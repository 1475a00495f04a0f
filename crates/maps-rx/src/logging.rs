//! Tracing setup.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! binary's job. `RUST_LOG` takes precedence over the configured filter.

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Builds the filter: `RUST_LOG` if set and valid, else `config.filter`,
/// else `info`.
#[must_use]
pub fn filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a stderr fmt subscriber. Does nothing if one is already set.
pub fn init(config: &LogConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(config))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
