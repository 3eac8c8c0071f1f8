//! # Error Types
//!
//! Custom error types for RNBO Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for RNBO Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Input device errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// OSC encode/decode or transport errors
    #[error("OSC error: {0}")]
    Osc(String),

    /// A route or event mapping that cannot be served
    #[error("Invalid route: {0}")]
    InvalidRoute(String),
}

/// Result type alias for RNBO Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
