//! Error types for the relay.

use thiserror::Error;

/// Relay error type.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Redis connection or operation error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Outbox store error
    #[error("Store error: {0}")]
    Store(#[from] outbox_store::DatabaseError),

    /// Message or state serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (state file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Publish attempted after the broker connection was closed
    #[error("Broker connection is closed")]
    BrokerClosed,

    /// Timeout waiting for a broker operation
    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
