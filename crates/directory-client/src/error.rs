//! Directory client error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("Request failed: HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response was well-formed but lacked a required field.
    #[error("Incomplete response: {0}")]
    Incomplete(String),
}

/// Result type alias using DirectoryError.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
