//! Tracing subscriber setup for node processes.
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::LogFormat;
use crate::error::NodeError;

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// # Errors
///
/// [`NodeError::Logging`] if a global subscriber is already installed.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), NodeError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true).with_level(true)).try_init(),
    };
    installed.map_err(|e| NodeError::Logging(e.to_string()))
}
