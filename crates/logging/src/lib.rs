//! Logging for SaveKit
//!
//! This crate installs the global `tracing` subscriber used by the SaveKit
//! binary and by applications embedding the library.

use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use savekit_common::{Error, Result};
use savekit_config::LoggingConfig;

/// Builds the level filter, letting `RUST_LOG` override the configured level
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            Error::Configuration(format!("invalid log level '{}': {}", config.level, e))
        }),
    }
}

/// Initializes logging
///
/// Returns `Ok(false)` when a global subscriber was already installed, in
/// which case the existing one is kept.
pub fn init_logging(config: &LoggingConfig) -> Result<bool> {
    let filter = build_filter(config)?;

    let installed = if config.json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(config.with_target)
            .try_init()
            .is_ok()
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(config.with_target)
            .try_init()
            .is_ok()
    };

    if installed {
        debug!(level = %config.level, json = config.json, "Logging initialized");
    }

    Ok(installed)
}
