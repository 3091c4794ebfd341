//! Error types for the outbox store.

use thiserror::Error;

/// Database error type.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection error (executor closed, connection lost)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error (database file, parent directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
