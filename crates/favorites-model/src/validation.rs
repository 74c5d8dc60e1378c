//! Entry property validation.
//!
//! Bounds are in characters for strings and in bytes of compact JSON for
//! `metadata` and `tags`.

use crate::entry::Entry;
use std::fmt;

pub const ID_MIN_LENGTH: usize = 1;
pub const ID_MAX_LENGTH: usize = 64;
pub const NAME_MIN_LENGTH: usize = 1;
pub const NAME_MAX_LENGTH: usize = 256;
pub const TYPE_MIN_LENGTH: usize = 1;
pub const TYPE_MAX_LENGTH: usize = 32;
pub const URL_MIN_LENGTH: usize = 1;
pub const URL_MAX_LENGTH: usize = 2048;
pub const METADATA_MAX_LENGTH: usize = 2048;
pub const TAGS_MAX_LENGTH: usize = 1024;

/// One property that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub property: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.property, self.message)
    }
}

/// All failures found for one value, joined with `"; "` when displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailures(pub Vec<ValidationFailure>);

impl ValidationFailures {
    pub fn properties(&self) -> Vec<&'static str> {
        self.0.iter().map(|f| f.property).collect()
    }
}

impl fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "The Entry instance is not valid. Details: {}.", parts.join("; "))
    }
}

impl std::error::Error for ValidationFailures {}

fn check_length(
    failures: &mut Vec<ValidationFailure>,
    property: &'static str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.chars().count();
    let message = if value.trim().is_empty() {
        Some("can't be blank".to_string())
    } else if len < min {
        Some(format!("is too short (minimum is {} characters)", min))
    } else if len > max {
        Some(format!("is too long (maximum is {} characters)", max))
    } else {
        None
    };
    if let Some(message) = message {
        failures.push(ValidationFailure { property, message });
    }
}

fn check_json_size<T: serde::Serialize>(
    failures: &mut Vec<ValidationFailure>,
    property: &'static str,
    value: &T,
    max: usize,
) {
    let size = serde_json::to_string(value).map(|s| s.len()).unwrap_or(usize::MAX);
    if size > max {
        failures.push(ValidationFailure {
            property,
            message: format!("is too long (maximum is {} bytes)", max),
        });
    }
}

/// Validate an id used as an entry id or a target id.
pub fn validate_id(id: &str) -> Result<(), ValidationFailures> {
    let mut failures = Vec::new();
    check_length(&mut failures, "id", id, ID_MIN_LENGTH, ID_MAX_LENGTH);
    if failures.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailures(failures))
    }
}

/// Validate every property of an entry before it is written.
pub fn validate_entry(entry: &Entry) -> Result<(), ValidationFailures> {
    let mut failures = Vec::new();
    check_length(&mut failures, "id", &entry.id, ID_MIN_LENGTH, ID_MAX_LENGTH);
    check_length(&mut failures, "name", &entry.name, NAME_MIN_LENGTH, NAME_MAX_LENGTH);
    check_length(
        &mut failures,
        "type",
        entry.entry_type.as_str(),
        TYPE_MIN_LENGTH,
        TYPE_MAX_LENGTH,
    );
    check_length(
        &mut failures,
        "url",
        &entry.image.url,
        URL_MIN_LENGTH,
        URL_MAX_LENGTH,
    );
    check_json_size(&mut failures, "metadata", &entry.metadata, METADATA_MAX_LENGTH);
    if let Some(tags) = &entry.tags {
        check_json_size(&mut failures, "tags", tags, TAGS_MAX_LENGTH);
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailures(failures))
    }
}
