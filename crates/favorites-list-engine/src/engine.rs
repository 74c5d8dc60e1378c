//! The list engine: validated positional writes against whole documents.

use crate::audit::{Actor, AuditAction, AuditRecord, AuditSink};
use crate::{EntryError, EntryResult};
use chrono::Utc;
use favorites_database::ProfileStore;
use favorites_model::validation::{validate_entry, validate_id};
use favorites_model::{Entry, MoveOutcome, ProfileDocument, ProfileKey, Target};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a bulk delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    #[serde(rename = "deletedIDs")]
    pub deleted_ids: Vec<String>,
    #[serde(rename = "invalidIDs")]
    pub invalid_ids: Vec<String>,
}

/// Which branch `add_or_update` took.
#[derive(Debug, Clone, PartialEq)]
pub enum Written {
    Created(Entry),
    Updated(Entry),
}

impl Written {
    pub fn entry(&self) -> &Entry {
        match self {
            Self::Created(entry) | Self::Updated(entry) => entry,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

pub struct ListEngine {
    store: Arc<dyn ProfileStore>,
    audit: Arc<dyn AuditSink>,
    max_visible: usize,
}

impl ListEngine {
    pub fn new(store: Arc<dyn ProfileStore>, audit: Arc<dyn AuditSink>, max_visible: usize) -> Self {
        Self {
            store,
            audit,
            max_visible,
        }
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    pub fn max_visible(&self) -> usize {
        self.max_visible
    }

    /// Load a user's document, creating an empty one on first access.
    pub async fn load(&self, key: &ProfileKey) -> EntryResult<ProfileDocument> {
        Ok(self.store.find_or_create(key).await?)
    }

    /// Insert a new entry before `target` (the tail when absent).
    pub async fn add(&self, actor: &Actor, mut entry: Entry, target: Option<&str>) -> EntryResult<Entry> {
        let key = &actor.key;
        let target = parse_target(target)?.unwrap_or(Target::Tail);
        prepare(&mut entry)?;
        let now = Utc::now();
        entry.created = now;
        entry.modified = now;
        entry.synced = now;

        let mut document = self.store.find_or_create(key).await?;
        document.add(entry.clone(), &target, self.max_visible)?;
        self.store.upsert(document).await?;

        info!(key = %key, id = %entry.id, target = %target, "Entry added");
        self.emit(AuditAction::Create, actor, &entry);
        Ok(entry)
    }

    /// Replace an existing entry, relocating it before `target` when given.
    pub async fn update(&self, actor: &Actor, mut entry: Entry, target: Option<&str>) -> EntryResult<Entry> {
        let key = &actor.key;
        let target = parse_target(target)?;
        prepare(&mut entry)?;
        entry.modified = Utc::now();

        let mut document = self
            .store
            .find_one(key)
            .await?
            .ok_or_else(|| EntryError::NotFound(entry.id.clone()))?;
        let stored = document.update(entry, target.as_ref())?;
        self.store.upsert(document).await?;

        info!(key = %key, id = %stored.id, "Entry updated");
        self.emit(AuditAction::Update, actor, &stored);
        Ok(stored)
    }

    /// Update when the id is already listed, add otherwise.
    pub async fn add_or_update(&self, actor: &Actor, entry: Entry, target: Option<&str>) -> EntryResult<Written> {
        let key = &actor.key;
        let exists = self
            .store
            .find_one(key)
            .await?
            .is_some_and(|doc| doc.position_of(&entry.id).is_some());
        if exists {
            self.update(actor, entry, target).await.map(Written::Updated)
        } else {
            self.add(actor, entry, target).await.map(Written::Created)
        }
    }

    pub async fn delete(&self, actor: &Actor, id: &str) -> EntryResult<Entry> {
        let key = &actor.key;
        validate_id(id)?;
        let mut document = self
            .store
            .find_one(key)
            .await?
            .ok_or_else(|| EntryError::NotFound(id.to_string()))?;
        let removed = document.remove(id)?;
        self.store.upsert(document).await?;

        info!(key = %key, id, "Entry deleted");
        self.emit(AuditAction::Delete, actor, &removed);
        Ok(removed)
    }

    /// Delete a comma-separated list of ids. Unknown ids are reported, not
    /// rejected, and the document is persisted at most once.
    pub async fn delete_many(&self, actor: &Actor, raw_ids: &str) -> EntryResult<DeleteSummary> {
        let key = &actor.key;
        let ids = split_ids(raw_ids);
        for id in &ids {
            validate_id(id)?;
        }
        let Some(mut document) = self.store.find_one(key).await? else {
            return Ok(DeleteSummary {
                deleted_ids: Vec::new(),
                invalid_ids: ids,
            });
        };

        let report = document.remove_many(&ids);
        if !report.deleted.is_empty() {
            self.store.upsert(document).await?;
            for entry in &report.deleted {
                self.emit(AuditAction::Delete, actor, entry);
            }
        }

        let summary = DeleteSummary {
            deleted_ids: report.deleted_ids(),
            invalid_ids: report.invalid_ids,
        };
        info!(
            key = %key,
            deleted = summary.deleted_ids.len(),
            invalid = summary.invalid_ids.len(),
            "Entries deleted"
        );
        Ok(summary)
    }

    /// Move `source_id` before `target`.
    pub async fn move_entry(&self, actor: &Actor, source_id: &str, target: Option<&str>) -> EntryResult<MoveOutcome> {
        let key = &actor.key;
        validate_id(source_id)?;
        let target = parse_target(target)?.ok_or_else(|| EntryError::validation("targetId is required"))?;

        let mut document = self
            .store
            .find_one(key)
            .await?
            .ok_or_else(|| EntryError::NotFound(source_id.to_string()))?;
        let outcome = document.move_entry(source_id, &target)?;
        match outcome {
            MoveOutcome::Moved => {
                self.store.upsert(document).await?;
                info!(key = %key, source = source_id, target = %target, "Entry moved");
            }
            MoveOutcome::Unchanged => {
                debug!(key = %key, source = source_id, target = %target, "Entry already in place");
            }
        }
        Ok(outcome)
    }

    fn emit(&self, action: AuditAction, actor: &Actor, entry: &Entry) {
        if entry.is_hidden() {
            debug!(id = %entry.id, action = action.event_type(), "Hidden entry, skipping audit");
            return;
        }
        self.audit.emit(AuditRecord::new(action, actor, entry));
    }
}

fn prepare(entry: &mut Entry) -> EntryResult<()> {
    validate_entry(entry)?;
    entry.refresh_lowercased_name();
    Ok(())
}

/// Blank targets count as absent; others must be valid ids.
fn parse_target(raw: Option<&str>) -> EntryResult<Option<Target>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => {
            validate_id(raw)?;
            Ok(Some(Target::parse(raw)))
        }
    }
}

fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
