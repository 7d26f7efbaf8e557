//! Logging initialization.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install a stderr `fmt` subscriber filtered by `settings.filter`.
///
/// Returns `Ok(false)` when a global subscriber is already installed, leaving
/// it in place.
///
/// # Errors
/// Returns an error if the filter directives do not parse or the subscriber
/// cannot be installed.
pub fn init_tracing(settings: &LoggingSettings) -> Result<bool> {
    let filter = EnvFilter::try_new(&settings.filter)
        .with_context(|| format!("Invalid log filter {:?}", settings.filter))?;

    if tracing::dispatcher::has_been_set() {
        return Ok(false);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))?;
    Ok(true)
}
