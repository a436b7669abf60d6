//! Shared error types for the engine

use thiserror::Error;

/// Main error type for finmetrics operations
#[derive(Debug, Error)]
pub enum Error {
    /// A base record violated an input contract (e.g. blank UserID)
    #[error("malformed record at row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },

    /// Configuration rejected at load/construction time
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// IO errors (config file loading)
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML parse errors (config file loading)
    #[error(transparent)]
    TomlParse(#[from] toml::de::Error),

    /// Wrapped external errors
    #[error(transparent)]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Create a malformed-record error identifying the offending row
    pub fn malformed_record(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            row,
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;
