//! Merges between authority cache records and community entries.
//!
//! Both directions only ever touch the name and the `DELETED` flag, and both
//! are idempotent: applying the same change twice reports no change the
//! second time.

use favorites_model::{AuthorityRecord, Entry, StateFlag};
use tracing::debug;

/// A change reported by a community lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommunityChange {
    Renamed(Option<String>),
    Deleted,
    Restored,
}

/// Copy the record's name and delete state onto an entry.
///
/// Returns whether the entry changed.
pub fn merge_into_entry(record: &AuthorityRecord, entry: &mut Entry) -> bool {
    let mut changed = false;
    if let Some(name) = record.name.as_deref().filter(|n| !n.is_empty()) {
        if name != entry.name {
            entry.set_name(name);
            changed = true;
        }
    }

    if record.state != entry.states.first() {
        let deleted = entry.states.contains(StateFlag::Deleted);
        if record.is_deleted() && !deleted {
            entry.states.insert(StateFlag::Deleted);
            changed = true;
        } else if !record.is_deleted() && deleted {
            entry.states.remove(StateFlag::Deleted);
            changed = true;
        } else {
            debug!(
                id = %entry.id,
                states = %entry.states,
                record_state = ?record.state,
                "state inconsistency"
            );
        }
    }
    changed
}

/// Apply a lifecycle change to a cache record.
///
/// Returns whether the record changed. A rename leaves the delete state
/// alone.
pub fn apply_change(record: &mut AuthorityRecord, change: &CommunityChange) -> bool {
    match change {
        CommunityChange::Renamed(name) => match name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) if record.name.as_deref() != Some(name) => {
                record.name = Some(name.to_string());
                true
            }
            _ => false,
        },
        CommunityChange::Deleted => {
            if record.is_deleted() {
                debug!(id = %record.id, "state inconsistency: community already deleted");
                return false;
            }
            record.state = Some(StateFlag::Deleted);
            true
        }
        CommunityChange::Restored => {
            if !record.is_deleted() {
                debug!(id = %record.id, "state inconsistency: community not deleted");
                return false;
            }
            record.state = None;
            true
        }
    }
}
