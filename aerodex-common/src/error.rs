//! Common error types for Aerodex

use thiserror::Error;

/// Common result type for Aerodex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Aerodex crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding error (content tables, catalog payloads)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed TOML config file
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
