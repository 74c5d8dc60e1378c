//! Sync error types.

use directory_client::DirectoryError;
use favorites_database::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
}

/// Result type alias using SyncError.
pub type SyncResult<T> = Result<T, SyncError>;
