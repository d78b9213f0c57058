//! Error types for gscp-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for gscp-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for gscp-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid or malformed path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication or permission failure
    #[error("Access denied: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// The operation deadline expired
    #[error("Operation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The operation was interrupted by the user
    #[error("Operation interrupted")]
    Interrupted,

    /// I/O failure while moving bytes from source to destination
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// Destination could not be closed or finalized
    #[error("Failed to finalize destination: {0}")]
    Commit(String),

    /// Object enumeration failed
    #[error("Listing failed: {0}")]
    Listing(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) => 2,                   // UsageError
            Error::Config(_) | Error::InvalidUrl(_) => 2, // UsageError
            Error::Network(_) | Error::Timeout(_) => 3,   // NetworkError
            Error::Listing(_) => 3,                       // NetworkError
            Error::Auth(_) => 4,                          // AuthError
            Error::NotFound(_) => 5,                      // NotFound
            Error::Interrupted => 130,                    // Interrupted
            _ => 1,                                       // GeneralError
        }
    }

    /// Classify an I/O error raised while opening `target`
    pub fn from_open(err: std::io::Error, target: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(target.to_string()),
            std::io::ErrorKind::PermissionDenied => Error::Auth(format!("{target}: {err}")),
            _ => Error::Io(err),
        }
    }
}
