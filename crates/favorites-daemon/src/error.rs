//! Error types for the event consumer.

use favorites_sync_engine::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsumerError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// An event could not be applied
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Unexpected reply shape
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type for consumer operations.
pub type ConsumerResult<T> = Result<T, ConsumerError>;
