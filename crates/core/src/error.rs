//! Error types for the trade-tape system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the trade-tape system.
#[derive(Error, Debug)]
pub enum Error {
    /// A raw trade record is missing a field, is non-numeric, or violates
    /// non-negativity. Aborts the whole batch.
    #[error("Malformed record at index {index}: {reason}")]
    MalformedRecord {
        /// 0-based position of the record in its input sequence.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Internal logic defect (never caused by bad input).
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (bad header, values out of representable range).
    #[error("Data error: {0}")]
    Data(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading/writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a malformed record error.
    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            index,
            reason: reason.into(),
        }
    }

    /// Create an invariant violation error.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Error::InvariantViolation(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }
}
