//! Error types for prop_bets

use crate::store::StoreError;
use thiserror::Error;

/// Unified error type for sync, betting and admin operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP error status code
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
    /// Failed to parse JSON response
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Feed JSON was well-formed but carried an unusable value
    #[error("Invalid feed data: {0}")]
    InvalidFeed(String),
    /// Storage operation failed
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Bet submitted without a user
    #[error("no user selected")]
    MissingUser,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for prop_bets operations
pub type Result<T> = std::result::Result<T, Error>;
