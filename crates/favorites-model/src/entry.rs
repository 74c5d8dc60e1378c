//! Favorite entries.

use crate::state::StateSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kind of object an entry points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntryType {
    People,
    Community,
    Other(String),
}

impl EntryType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::People => "people",
            Self::Community => "community",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for EntryType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "people" => Self::People,
            "community" => Self::Community,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for EntryType {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<EntryType> for String {
    fn from(value: EntryType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub url: String,
}

/// Free-form entry metadata with a few recognised keys.
///
/// Unrecognised keys are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub hidden: bool,
    #[serde(rename = "exId", default, skip_serializing_if = "Option::is_none")]
    pub ex_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tel: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Metadata {
    /// True when `tel` is absent, null, or an empty string/object/array.
    pub fn tel_is_empty(&self) -> bool {
        match &self.tel {
            None | Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::String(s)) => s.is_empty(),
            Some(serde_json::Value::Object(map)) => map.is_empty(),
            Some(serde_json::Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        }
    }

    /// Copy keys present in `older` but missing here.
    pub fn fill_missing_from(&mut self, older: &Metadata) {
        if self.ex_id.is_none() {
            self.ex_id = older.ex_id.clone();
        }
        if self.tel.is_none() {
            self.tel = older.tel.clone();
        }
        if self.email.is_none() {
            self.email = older.email.clone();
        }
        for (key, value) in &older.extra {
            self.extra.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

/// A favorite reference in a user's list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "lname", default)]
    pub lowercased_name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default)]
    pub image: Image,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub states: StateSet,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub modified: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub synced: DateTime<Utc>,
}

impl Entry {
    /// Create a visible entry with no states, timestamped now.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        entry_type: impl Into<EntryType>,
        image_url: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let mut entry = Self {
            id: id.into(),
            name: name.into(),
            lowercased_name: String::new(),
            entry_type: entry_type.into(),
            image: Image {
                url: image_url.into(),
            },
            metadata: Metadata::default(),
            tags: None,
            states: StateSet::new(),
            created: now,
            modified: now,
            synced: now,
        };
        entry.refresh_lowercased_name();
        entry
    }

    /// Recompute `lname` from `name`.
    pub fn refresh_lowercased_name(&mut self) {
        self.lowercased_name = self.name.to_lowercase();
    }

    /// Set the display name and keep `lname` in step.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.refresh_lowercased_name();
    }

    pub fn is_hidden(&self) -> bool {
        self.metadata.hidden
    }

    pub fn is_visible(&self) -> bool {
        !self.metadata.hidden
    }

    pub fn is_community(&self) -> bool {
        self.entry_type == EntryType::Community
    }

    pub fn is_people(&self) -> bool {
        self.entry_type == EntryType::People
    }

    /// `synced + ttl < now`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => self.synced + ttl < now,
            Err(_) => false,
        }
    }
}
