//! Service configuration
//!
//! Everything in this module is resolved once at startup from the environment
//! and then passed around by value. Nothing here is global.

use thiserror::Error;

pub mod capabilities;
pub mod env_names;
pub mod settings;

pub use capabilities::{EnabledEndpoints, Endpoint};
pub use settings::{AppSettings, RunnerConfig, ServerSettings, DEFAULT_TIMEOUT_SECS};

/// Configuration errors, all fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Extract(#[from] figment::Error),
    #[error("Unknown endpoint '{0}' in ENABLED_ENDPOINTS")]
    UnknownEndpoint(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
