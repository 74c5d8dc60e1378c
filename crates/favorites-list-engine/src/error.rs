//! Error types surfaced to callers of the list operations.

use directory_client::DirectoryError;
use favorites_database::DatabaseError;
use favorites_model::{DocumentError, ValidationFailures};
use std::fmt;
use thiserror::Error;

/// Sub-code carried by positional validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCode {
    TargetIdNotFound,
    MaximumEntriesExceeds,
    TargetIdSameAsSourceId,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TargetIdNotFound => "target_id_not_found",
            Self::MaximumEntriesExceeds => "maximum_entries_exceeds",
            Self::TargetIdSameAsSourceId => "target_id_same_as_sourceId",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("{message}")]
    Validation {
        message: String,
        code: Option<ValidationCode>,
    },

    #[error("Entry {0} was not found")]
    NotFound(String),

    #[error("Entry {0} already exists")]
    Duplicate(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    /// People id resolution failed while adding an entry.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
}

impl EntryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: None,
        }
    }

    /// HTTP status class for the binding layer.
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 422,
            Self::NotFound(_) => 404,
            Self::Duplicate(_) => 409,
            Self::Storage(_) | Self::Directory(_) => 500,
        }
    }

    pub fn code(&self) -> Option<ValidationCode> {
        match self {
            Self::Validation { code, .. } => *code,
            _ => None,
        }
    }
}

impl From<DocumentError> for EntryError {
    fn from(err: DocumentError) -> Self {
        let message = err.to_string();
        match err {
            DocumentError::MaximumEntriesExceeded(_) => Self::Validation {
                message,
                code: Some(ValidationCode::MaximumEntriesExceeds),
            },
            DocumentError::TargetNotFound(_) => Self::Validation {
                message,
                code: Some(ValidationCode::TargetIdNotFound),
            },
            DocumentError::SameSourceAndTarget(_) => Self::Validation {
                message,
                code: Some(ValidationCode::TargetIdSameAsSourceId),
            },
            DocumentError::Duplicate(id) => Self::Duplicate(id),
            DocumentError::NotFound(id) => Self::NotFound(id),
        }
    }
}

impl From<ValidationFailures> for EntryError {
    fn from(failures: ValidationFailures) -> Self {
        Self::validation(failures.to_string())
    }
}

/// Result type alias using EntryError.
pub type EntryResult<T> = Result<T, EntryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert_eq!(EntryError::validation("bad").status(), 422);
        assert_eq!(EntryError::NotFound("a".into()).status(), 404);
        assert_eq!(EntryError::Duplicate("a".into()).status(), 409);
        assert_eq!(
            EntryError::Storage(DatabaseError::Connection("down".into())).status(),
            500
        );
    }

    #[test]
    fn test_document_errors_keep_codes() {
        let err = EntryError::from(DocumentError::TargetNotFound("x".into()));
        assert_eq!(err.code(), Some(ValidationCode::TargetIdNotFound));
        assert_eq!(err.code().unwrap().as_str(), "target_id_not_found");

        let err = EntryError::from(DocumentError::SameSourceAndTarget("x".into()));
        assert_eq!(err.code().unwrap().as_str(), "target_id_same_as_sourceId");

        assert!(matches!(
            EntryError::from(DocumentError::Duplicate("x".into())),
            EntryError::Duplicate(id) if id == "x"
        ));
    }
}
