//! Error types for the flea price updater

use thiserror::Error;

/// Result type alias for updater operations
pub type Result<T> = std::result::Result<T, UpdaterError>;

/// Errors that can occur while fetching or applying prices
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// File operations on the config or price cache
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON on disk or in a response body
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failure or non-success status from the price endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The updater config file is shipped with the host and must exist
    #[error("Updater config not found at {0:?}")]
    MissingConfig(std::path::PathBuf),

    /// Invalid process settings or persisted config values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every fetch attempt failed; the recurring schedule has been cancelled
    #[error("Price fetch failed after {attempts} attempts: {last_error}")]
    FetchExhausted { attempts: u32, last_error: Box<UpdaterError> },
}

impl UpdaterError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<config::ConfigError> for UpdaterError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
