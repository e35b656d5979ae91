//! Error types for gait-flux

use thiserror::Error;

/// Errors that can occur while filtering samples or handling transport messages
#[derive(Debug, Error)]
pub enum GaitError {
    #[error("Sample timestamp {current} does not follow previous timestamp {previous}")]
    NonIncreasingTimestamp { previous: f64, current: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse message: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported message type: {0}")]
    UnsupportedMessage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
