//! Error types for Tenderwatch

use thiserror::Error;

/// Result type alias for Tenderwatch operations
pub type Result<T> = std::result::Result<T, TenderwatchError>;

/// Main error type for Tenderwatch
#[derive(Error, Debug)]
pub enum TenderwatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid fingerprint '{value}': {reason}")]
    InvalidFingerprint { value: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl TenderwatchError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid fingerprint error
    pub fn invalid_fingerprint(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFingerprint {
            value: value.into(),
            reason: reason.into(),
        }
    }
}
