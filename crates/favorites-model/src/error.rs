//! Errors raised by positional document operations.

use thiserror::Error;

/// A document operation was rejected. The document is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("The maximum number of visible entries ({0}) has been reached")]
    MaximumEntriesExceeded(usize),

    #[error("Entry {0} already exists")]
    Duplicate(String),

    #[error("Entry {0} was not found")]
    NotFound(String),

    #[error("Target entry {0} was not found")]
    TargetNotFound(String),

    #[error("Target id {0} must differ from the source id")]
    SameSourceAndTarget(String),
}

pub type DocumentResult<T> = Result<T, DocumentError>;
