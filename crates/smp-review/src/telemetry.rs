//! Log pipeline setup for the portal processes.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("'{directive}' is not a valid tracing filter directive")]
    BadDirective {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Install the process-wide subscriber.
///
/// A `RUST_LOG` filter wins when one is set; otherwise the configured
/// `APP_LOG_LEVEL` directive applies. Output is compact single-line text
/// without ANSI color so it stays greppable under journald capture.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => configured_filter(config)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .try_init()
        .map_err(|_| TelemetryError::AlreadyInitialized)
}

fn configured_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::BadDirective {
        directive: config.log_level.clone(),
        source,
    })
}
