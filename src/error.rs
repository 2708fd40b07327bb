// src/error.rs

//! Unified error handling for the sync application.

use std::fmt;

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// State store (SQLite) failure
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed before a response was received
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid word pattern in the blocklist
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A single remote call failed
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The run was halted by a critical remote error
    #[error("Run aborted: {0}")]
    Aborted(RemoteError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error must stop the whole run.
    pub fn is_critical(&self) -> bool {
        match self {
            AppError::Remote(err) => err.class == ErrorClass::Critical,
            AppError::Aborted(_) | AppError::Store(_) => true,
            _ => false,
        }
    }
}

/// How a failed remote call affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Count it, skip the affected work, continue with the next feed.
    Transient,
    /// Abort the run immediately.
    Critical,
}

/// Failure of one remote operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub operation: String,
    pub status: Option<u16>,
    pub message: String,
    pub class: ErrorClass,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "{} failed with status {}: {}",
                self.operation, status, self.message
            ),
            None => write!(f, "{} failed: {}", self.operation, self.message),
        }
    }
}

impl RemoteError {
    /// Create a remote error classified against a set of critical status codes.
    ///
    /// Failures without a status (connection resets, timeouts) are transient.
    pub fn classify(
        operation: impl Into<String>,
        status: Option<u16>,
        message: impl fmt::Display,
        critical_statuses: &[u16],
    ) -> Self {
        let class = match status {
            Some(code) if critical_statuses.contains(&code) => ErrorClass::Critical,
            _ => ErrorClass::Transient,
        };
        Self {
            operation: operation.into(),
            status,
            message: message.to_string(),
            class,
        }
    }

    /// Create a transient error.
    pub fn transient(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            operation: operation.into(),
            status: None,
            message: message.to_string(),
            class: ErrorClass::Transient,
        }
    }

    /// Create a critical error.
    pub fn critical(
        operation: impl Into<String>,
        status: Option<u16>,
        message: impl fmt::Display,
    ) -> Self {
        Self {
            operation: operation.into(),
            status,
            message: message.to_string(),
            class: ErrorClass::Critical,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.class == ErrorClass::Critical
    }
}
