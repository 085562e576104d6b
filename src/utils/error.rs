// src/utils/error.rs
use serde_json;
use std::io;
use thiserror::Error;
use url;

/// Main error type for the pool chooser
///
/// Covers every failure the control loop can meet: data feeds, the rig's
/// command interface, numeric validation and configuration. Whether an error
/// aborts a cycle depends on where it is raised, not on the variant alone.
#[derive(Error, Debug)]
pub enum SwitchError {
    /// A market or difficulty feed could not be reached or reported failure
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// The difficulty feed carried no BTC entry to price coins in USD
    #[error("Missing reference price: {0}")]
    MissingReferencePrice(String),

    /// The rig's API could not be reached or did not answer
    #[error("Rig unreachable: {0}")]
    RigUnreachable(String),

    /// The rig refused a pool priority change
    #[error("Pool priority rejected: {0}")]
    PriorityRejected(String),

    /// Malformed numeric input (zero difficulty, negative hash rate, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The rig did not come back within the restart timeout (seconds)
    #[error("Rig did not respond within {0}s after restart")]
    RestartTimeout(u64),

    /// Configuration file or parameter errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Unexpected shape of a rig or feed response
    #[error("Protocol violation: {0}")]
    ProtocolError(String),

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Converts TOML parse failures into SwitchError
///
/// Only raised while loading the configuration, before the loop starts.
impl From<toml::de::Error> for SwitchError {
    fn from(e: toml::de::Error) -> Self {
        SwitchError::ConfigError(format!("Invalid config format: {}", e))
    }
}

/// Converts elapsed tokio timeouts into SwitchError
///
/// Timeouts only wrap rig socket operations, so they surface as an
/// unreachable rig.
impl From<tokio::time::error::Elapsed> for SwitchError {
    fn from(e: tokio::time::error::Elapsed) -> Self {
        SwitchError::RigUnreachable(format!("Timed out: {}", e))
    }
}
