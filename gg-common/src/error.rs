//! Common error types for gamegen

use thiserror::Error;

/// Common result type for gamegen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the gamegen crates
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

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected input. The message is shown to API clients verbatim.
    #[error("{0}")]
    InvalidInput(String),

    /// Unique constraint or state conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Signed token could not be verified
    #[error("Invalid token: {0}")]
    Token(String),

    /// Object storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when a database error was caused by a UNIQUE constraint
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }

    /// Convert unique-constraint failures into [`Error::Conflict`]
    pub fn or_conflict(self, what: &str) -> Self {
        if self.is_unique_violation() {
            Error::Conflict(format!("{} already in use", what))
        } else {
            self
        }
    }
}
