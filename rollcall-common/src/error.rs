//! Common error types for Rollcall

use thiserror::Error;

/// Common result type for Rollcall operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of every failure the service can report
///
/// Request boundaries map a kind to an HTTP status; see rollcall-server `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input (size, range, type)
    Validation,
    /// Missing/invalid/expired token or credential mismatch
    Auth,
    /// Well-formed request refused by a business rule
    BusinessRule,
    /// Referenced entity absent
    NotFound,
    /// Duplicate registration key
    Conflict,
    /// Anything unexpected
    Internal,
}

/// Common error types across Rollcall crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("{0}")]
    Validation(String),

    /// Authentication or authorization failure
    #[error("{0}")]
    Auth(String),

    /// Requested resource not found
    #[error("{0}")]
    NotFound(String),

    /// Unique key already taken
    #[error("{0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Taxonomy bucket for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Auth(_) => ErrorKind::Auth,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}
