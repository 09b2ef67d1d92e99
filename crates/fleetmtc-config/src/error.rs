//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to merge configuration sources: {0}")]
    MergeError(String),

    #[error("failed to deserialize configuration: {0}")]
    DeserializeError(String),

    #[error("missing required configuration key(s): {0}")]
    MissingRequiredKeys(String),
}
