//! Custom error types for rustnbdt.
//!
//! All library functions return `Result<T, NbdtError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for rustnbdt operations.
#[derive(Debug, Error)]
pub enum NbdtError {
    /// Dataset or update source name outside the supported set
    #[error("Dataset \"{0}\" is not available")]
    UnknownDataset(String),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote host answered with a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message
        message: String,
    },

    /// Payload or cell parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using `NbdtError`
pub type Result<T> = std::result::Result<T, NbdtError>;
