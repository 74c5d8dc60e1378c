//! Audit records emitted after committed writes.
//!
//! The engine emits; the sink decides what a record means. Emission happens
//! only after the document has been persisted, and never for hidden entries.

use favorites_model::{Entry, ProfileKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    /// Event name on the audit channel.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Create => "itm.entry.create",
            Self::Update => "itm.entry.update",
            Self::Delete => "itm.entry.delete",
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// The user a write is performed for. Name and email only decorate audit
/// records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub key: ProfileKey,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Actor {
    pub fn new(key: ProfileKey) -> Self {
        Self {
            key,
            name: None,
            email: None,
        }
    }

    pub fn with_profile(mut self, name: Option<String>, email: Option<String>) -> Self {
        self.name = name.filter(|n| !n.is_empty());
        self.email = email.filter(|e| !e.is_empty());
        self
    }
}

impl From<ProfileKey> for Actor {
    fn from(key: ProfileKey) -> Self {
        Self::new(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub action: AuditAction,
    /// Owner of the document.
    pub actor: Actor,
    pub entry_id: String,
    pub entry_name: String,
    pub entry_type: String,
}

impl AuditRecord {
    pub fn new(action: AuditAction, actor: &Actor, entry: &Entry) -> Self {
        Self {
            action,
            actor: actor.clone(),
            entry_id: entry.id.clone(),
            entry_name: entry.name.clone(),
            entry_type: entry.entry_type.as_str().to_string(),
        }
    }
}

/// Receives audit records. Implementations must not block.
pub trait AuditSink: Send + Sync {
    fn emit(&self, record: AuditRecord);
}

/// Discards every record.
#[derive(Debug, Default)]
pub struct NullSink;

impl AuditSink for NullSink {
    fn emit(&self, _record: AuditRecord) {}
}

/// Keeps every record for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: std::sync::Mutex<Vec<AuditRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AuditRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.lock().clone()
    }

    pub fn actions(&self) -> Vec<AuditAction> {
        self.records().iter().map(|r| r.action).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for RecordingSink {
    fn emit(&self, record: AuditRecord) {
        self.lock().push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_records() {
        let sink = RecordingSink::new();
        let actor = Actor::new(ProfileKey::new("u-1", "org-1"))
            .with_profile(Some("Ada".into()), Some(String::new()));
        let entry = Entry::new("c-1", "Guild", "community", "https://img/1");

        sink.emit(AuditRecord::new(AuditAction::Create, &actor, &entry));
        sink.emit(AuditRecord::new(AuditAction::Delete, &actor, &entry));

        assert_eq!(sink.actions(), vec![AuditAction::Create, AuditAction::Delete]);
        assert_eq!(sink.records()[0].entry_type, "community");
        assert_eq!(sink.records()[0].actor.name.as_deref(), Some("Ada"));
        assert_eq!(sink.records()[0].actor.email, None);
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn action_names() {
        assert_eq!(AuditAction::Update.event_name(), "itm.entry.update");
        assert_eq!(AuditAction::Update.event_type(), "UPDATE");
    }
}
