//! Observability (AU-2, AU-3, AU-12)
//!
//! The library only emits `tracing` events; the host decides where they go.
//! [`init`] is a convenience for hosts that just want stdout logging.
//!
//! # Usage
//!
//! ```no_run
//! use review_auth::observability::{init, ObservabilityConfig};
//!
//! init(ObservabilityConfig::from_env()).expect("logging");
//! ```

mod config;
mod events;
mod providers;

pub use config::{LogFormat, ObservabilityConfig, ObservabilityConfigBuilder};
pub use events::{security_event, SecurityEvent, Severity};

use tracing::info;

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the log filter does not parse or a global subscriber
/// is already installed.
pub fn init(config: ObservabilityConfig) -> Result<(), ObservabilityError> {
    providers::init_tracing(&config)?;

    info!(log_format = ?config.log_format, "Observability initialized");

    Ok(())
}

/// Observability initialization errors
#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    /// Invalid configuration
    #[error("Observability config error: {0}")]
    Config(String),
    /// Subscriber installation failed
    #[error("Provider error: {0}")]
    Provider(String),
}
