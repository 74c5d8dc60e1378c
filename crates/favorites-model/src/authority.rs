//! Authority cache records.

use crate::entry::Entry;
use crate::state::StateFlag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest known name and delete state of a community.
///
/// Keyed by the community id. The state is a single slot: either
/// `DELETED` or none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<StateFlag>,
    #[serde(default = "Utc::now")]
    pub modified: DateTime<Utc>,
}

impl AuthorityRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            state: None,
            modified: Utc::now(),
        }
    }

    /// Seed a record from an entry's current values.
    pub fn seeded_from(entry: &Entry) -> Self {
        let state = entry
            .states
            .contains(StateFlag::Deleted)
            .then_some(StateFlag::Deleted);
        Self {
            id: entry.id.clone(),
            name: (!entry.name.is_empty()).then(|| entry.name.clone()),
            state,
            modified: entry.modified,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.state == Some(StateFlag::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_from_entry() {
        let mut entry = Entry::new("c-1", "Guild", "community", "https://img/1");
        entry.states.insert(StateFlag::NoAccess);
        let record = AuthorityRecord::seeded_from(&entry);
        assert_eq!(record.id, "c-1");
        assert_eq!(record.name.as_deref(), Some("Guild"));
        assert!(!record.is_deleted());

        entry.states.insert(StateFlag::Deleted);
        assert!(AuthorityRecord::seeded_from(&entry).is_deleted());
    }

    #[test]
    fn test_record_json() {
        let record: AuthorityRecord =
            serde_json::from_str(r#"{"id":"c-1","state":"DELETED"}"#).unwrap();
        assert!(record.is_deleted());
        assert!(record.name.is_none());
        assert!(serde_json::from_str::<AuthorityRecord>(r#"{"id":"c","state":"BOGUS"}"#).is_err());
    }
}
