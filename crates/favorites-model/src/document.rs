//! Per-user profile documents and positional list operations.

use crate::entry::Entry;
use crate::error::{DocumentError, DocumentResult};
use crate::target::Target;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identity of a profile document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileKey {
    pub user_id: String,
    pub org_id: String,
}

impl ProfileKey {
    pub fn new(user_id: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            org_id: org_id.into(),
        }
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org_id, self.user_id)
    }
}

/// What to place at a target index.
#[derive(Debug, Clone)]
pub enum MoveSource {
    /// Insert a new value.
    Value(Entry),
    /// Relocate the entry currently at this index.
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// The source already sat immediately before the target.
    Unchanged,
}

/// Result of removing several ids at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteReport {
    pub deleted: Vec<Entry>,
    pub invalid_ids: Vec<String>,
}

impl DeleteReport {
    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.iter().map(|e| e.id.clone()).collect()
    }
}

/// A user's ordered favorites list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(flatten)]
    pub key: ProfileKey,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default = "Utc::now")]
    pub modified: DateTime<Utc>,
}

impl ProfileDocument {
    pub fn new(key: ProfileKey) -> Self {
        Self {
            key,
            entries: Vec::new(),
            modified: Utc::now(),
        }
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Index a target resolves to: `len` for the tail.
    pub fn find_position(&self, target: &Target) -> Option<usize> {
        match target {
            Target::Tail => Some(self.entries.len()),
            Target::Before(id) => self.position_of(id),
        }
    }

    pub fn entry(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn visible_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_visible()).count()
    }

    /// Place `source` before the entry currently at `target`.
    ///
    /// For an index source the target is adjusted by one when it lies after
    /// the source, since removing the source shifts it left.
    pub fn insert_before(&mut self, source: MoveSource, target: usize) {
        match source {
            MoveSource::Value(entry) => {
                let at = target.min(self.entries.len());
                self.entries.insert(at, entry);
            }
            MoveSource::Index(source) => {
                if source >= self.entries.len() {
                    return;
                }
                let adjusted = if target > source { target - 1 } else { target };
                let entry = self.entries.remove(source);
                let at = adjusted.min(self.entries.len());
                self.entries.insert(at, entry);
            }
        }
    }

    /// Insert a new entry before `target`.
    ///
    /// Checks run in order: visible cap, duplicate id, target resolution.
    pub fn add(&mut self, entry: Entry, target: &Target, max_visible: usize) -> DocumentResult<()> {
        let visible = self.visible_count();
        if !self.entries.is_empty() && visible >= max_visible {
            tracing::debug!(visible, max_visible, "maximum visible entries reached");
            return Err(DocumentError::MaximumEntriesExceeded(max_visible));
        }
        if self.position_of(&entry.id).is_some() {
            return Err(DocumentError::Duplicate(entry.id));
        }
        let position = self
            .find_position(target)
            .ok_or_else(|| DocumentError::TargetNotFound(target.to_string()))?;

        self.insert_before(MoveSource::Value(entry), position);
        Ok(())
    }

    /// Replace an existing entry, optionally relocating it before `target`.
    ///
    /// The stored `created` timestamp is kept. Returns the stored entry.
    pub fn update(&mut self, mut entry: Entry, target: Option<&Target>) -> DocumentResult<Entry> {
        let source = self
            .position_of(&entry.id)
            .ok_or_else(|| DocumentError::NotFound(entry.id.clone()))?;
        let destination = match target {
            Some(target) => self
                .find_position(target)
                .ok_or_else(|| DocumentError::TargetNotFound(target.to_string()))?,
            None => source,
        };

        entry.created = self.entries[source].created;
        self.entries[source] = entry.clone();
        if destination != source && source + 1 != destination {
            self.insert_before(MoveSource::Index(source), destination);
        }
        Ok(entry)
    }

    pub fn remove(&mut self, id: &str) -> DocumentResult<Entry> {
        let position = self
            .position_of(id)
            .ok_or_else(|| DocumentError::NotFound(id.to_string()))?;
        Ok(self.entries.remove(position))
    }

    /// Remove every id that exists; report the rest as invalid.
    pub fn remove_many(&mut self, ids: &[String]) -> DeleteReport {
        let mut report = DeleteReport::default();
        for id in ids {
            match self.position_of(id) {
                Some(position) => report.deleted.push(self.entries.remove(position)),
                None => report.invalid_ids.push(id.clone()),
            }
        }
        report
    }

    /// Move `source_id` before `target`.
    pub fn move_entry(&mut self, source_id: &str, target: &Target) -> DocumentResult<MoveOutcome> {
        if target.id() == Some(source_id) {
            return Err(DocumentError::SameSourceAndTarget(source_id.to_string()));
        }
        let source = self
            .position_of(source_id)
            .ok_or_else(|| DocumentError::NotFound(source_id.to_string()))?;
        let destination = self
            .find_position(target)
            .ok_or_else(|| DocumentError::TargetNotFound(target.to_string()))?;

        if source + 1 == destination {
            return Ok(MoveOutcome::Unchanged);
        }
        self.insert_before(MoveSource::Index(source), destination);
        Ok(MoveOutcome::Moved)
    }

    /// Fold a refreshed subset of entries back into the full list.
    ///
    /// Entries are matched by id and the refreshed values win; missing
    /// metadata keys are filled from the stored entry. Entries not in
    /// `refreshed` keep their stored values, and refreshed entries no longer
    /// in the list are not re-added. Ids in `deleted_ids` are dropped.
    pub fn merge_refreshed(&mut self, refreshed: &[Entry], deleted_ids: &[String]) {
        let by_id: HashMap<&str, &Entry> = refreshed.iter().map(|e| (e.id.as_str(), e)).collect();
        for stored in self.entries.iter_mut() {
            if let Some(fresh) = by_id.get(stored.id.as_str()) {
                let mut merged = (*fresh).clone();
                merged.metadata.fill_missing_from(&stored.metadata);
                *stored = merged;
            }
        }
        if !deleted_ids.is_empty() {
            self.entries.retain(|e| !deleted_ids.contains(&e.id));
        }
    }

    /// Weak validator: `"{modified-millis}-{userId}"`.
    pub fn etag(&self) -> String {
        format!("{}-{}", self.modified.timestamp_millis(), self.key.user_id)
    }

    /// `modified` as an HTTP date.
    pub fn last_modified(&self) -> String {
        self.modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Metadata;
    use crate::state::StateFlag;

    fn visible(id: &str) -> Entry {
        Entry::new(id, format!("Entry {}", id), "community", "https://img.example.com/x.png")
    }

    fn hidden(id: &str) -> Entry {
        let mut entry = visible(id);
        entry.metadata = Metadata {
            hidden: true,
            ..Metadata::default()
        };
        entry
    }

    fn doc(ids: &[&str]) -> ProfileDocument {
        let mut doc = ProfileDocument::new(ProfileKey::new("u-1", "org-1"));
        doc.entries = ids.iter().map(|id| visible(id)).collect();
        doc
    }

    fn ids(doc: &ProfileDocument) -> Vec<String> {
        doc.entries.iter().map(|e| e.id.clone()).collect()
    }

    /// Reference: remove the source, then insert it before the target in the
    /// remaining list (or at the end for the tail).
    fn reference_move(list: &[String], source: &str, target: &Target) -> Vec<String> {
        let mut rest: Vec<String> = list.iter().filter(|id| *id != source).cloned().collect();
        let at = match target {
            Target::Tail => rest.len(),
            Target::Before(id) => rest.iter().position(|x| x == id).unwrap(),
        };
        rest.insert(at, source.to_string());
        rest
    }

    #[test]
    fn test_find_position() {
        let doc = doc(&["a", "b", "c"]);
        assert_eq!(doc.find_position(&Target::Tail), Some(3));
        assert_eq!(doc.find_position(&Target::parse("b")), Some(1));
        assert_eq!(doc.find_position(&Target::parse("zz")), None);
    }

    #[test]
    fn test_insert_before_index_adjusts_forward_moves() {
        let mut d = doc(&["a", "b", "c", "d"]);
        d.insert_before(MoveSource::Index(0), 3);
        assert_eq!(ids(&d), vec!["b", "c", "a", "d"]);

        let mut d = doc(&["a", "b", "c", "d"]);
        d.insert_before(MoveSource::Index(3), 1);
        assert_eq!(ids(&d), vec!["a", "d", "b", "c"]);

        let mut d = doc(&["a", "b", "c", "d"]);
        d.insert_before(MoveSource::Index(1), 4);
        assert_eq!(ids(&d), vec!["a", "c", "d", "b"]);
    }

    #[test]
    fn test_move_matches_reference_for_every_pair() {
        let names = ["a", "b", "c", "d", "e", "f"];
        let base: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let mut targets: Vec<Target> = names.iter().map(|s| Target::parse(s)).collect();
        targets.push(Target::Tail);

        for source in names {
            for target in &targets {
                if target.id() == Some(source) {
                    continue;
                }
                let mut d = doc(&names);
                d.move_entry(source, target).unwrap();
                assert_eq!(
                    ids(&d),
                    reference_move(&base, source, target),
                    "move {} before {}",
                    source,
                    target
                );
            }
        }
    }

    #[test]
    fn test_add_appends_and_inserts() {
        let mut d = doc(&["a", "b"]);
        d.add(visible("c"), &Target::Tail, 35).unwrap();
        d.add(visible("x"), &Target::parse("b"), 35).unwrap();
        assert_eq!(ids(&d), vec!["a", "x", "b", "c"]);
    }

    #[test]
    fn test_add_duplicate_leaves_document_unchanged() {
        let mut d = doc(&["a", "b"]);
        let before = d.clone();
        let err = d.add(visible("a"), &Target::Tail, 35).unwrap_err();
        assert_eq!(err, DocumentError::Duplicate("a".to_string()));
        assert_eq!(d, before);
    }

    #[test]
    fn test_add_unknown_target() {
        let mut d = doc(&["a"]);
        let err = d.add(visible("b"), &Target::parse("nope"), 35).unwrap_err();
        assert_eq!(err, DocumentError::TargetNotFound("nope".to_string()));
        assert_eq!(ids(&d), vec!["a"]);
    }

    #[test]
    fn test_visible_cap_ignores_hidden_entries() {
        let mut d = doc(&["a", "b"]);
        d.entries.push(hidden("h1"));
        d.entries.push(hidden("h2"));

        let err = d.add(visible("c"), &Target::Tail, 2).unwrap_err();
        assert_eq!(err, DocumentError::MaximumEntriesExceeded(2));

        // the cap is checked before the entry's own visibility
        let err = d.add(hidden("h3"), &Target::Tail, 2).unwrap_err();
        assert_eq!(err, DocumentError::MaximumEntriesExceeded(2));

        let mut d = doc(&["a"]);
        d.entries.push(hidden("h1"));
        d.add(visible("b"), &Target::Tail, 2).unwrap();
        assert_eq!(d.visible_count(), 2);
    }

    #[test]
    fn test_update_preserves_created_and_position() {
        let mut d = doc(&["a", "b", "c"]);
        let created = d.entries[1].created - chrono::Duration::days(3);
        d.entries[1].created = created;

        let mut replacement = visible("b");
        replacement.set_name("Renamed");
        let stored = d.update(replacement, None).unwrap();
        assert_eq!(stored.created, created);
        assert_eq!(ids(&d), vec!["a", "b", "c"]);
        assert_eq!(d.entries[1].name, "Renamed");
    }

    #[test]
    fn test_update_relocates() {
        let mut d = doc(&["a", "b", "c"]);
        d.update(visible("a"), Some(&Target::Tail)).unwrap();
        assert_eq!(ids(&d), vec!["b", "c", "a"]);

        // already before the target: stays put
        let mut d = doc(&["a", "b", "c"]);
        d.update(visible("a"), Some(&Target::parse("b"))).unwrap();
        assert_eq!(ids(&d), vec!["a", "b", "c"]);

        let mut d = doc(&["a", "b", "c"]);
        let err = d.update(visible("a"), Some(&Target::parse("zz"))).unwrap_err();
        assert_eq!(err, DocumentError::TargetNotFound("zz".to_string()));
        assert_eq!(ids(&d), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_update_missing_entry() {
        let mut d = doc(&["a"]);
        assert_eq!(
            d.update(visible("q"), None).unwrap_err(),
            DocumentError::NotFound("q".to_string())
        );
    }

    #[test]
    fn test_move_errors_and_adjacent_noop() {
        let mut d = doc(&["a", "b", "c"]);
        assert_eq!(
            d.move_entry("a", &Target::parse("a")).unwrap_err(),
            DocumentError::SameSourceAndTarget("a".to_string())
        );
        assert_eq!(
            d.move_entry("zz", &Target::parse("a")).unwrap_err(),
            DocumentError::NotFound("zz".to_string())
        );
        assert_eq!(
            d.move_entry("a", &Target::parse("zz")).unwrap_err(),
            DocumentError::TargetNotFound("zz".to_string())
        );
        assert_eq!(
            d.move_entry("a", &Target::parse("b")).unwrap(),
            MoveOutcome::Unchanged
        );
        assert_eq!(d.move_entry("c", &Target::Tail).unwrap(), MoveOutcome::Unchanged);
        assert_eq!(ids(&d), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_many_reports_found_and_missing() {
        let mut d = doc(&["a", "b", "c"]);
        let report = d.remove_many(&["a".to_string(), "x".to_string(), "c".to_string()]);
        assert_eq!(report.deleted_ids(), vec!["a", "c"]);
        assert_eq!(report.invalid_ids, vec!["x"]);
        assert_eq!(ids(&d), vec!["b"]);
    }

    #[test]
    fn test_merge_refreshed_keeps_untouched_entries() {
        let mut d = doc(&["a", "b", "c", "d", "e", "f"]);
        d.entries[1].metadata.extra.insert("pinned".into(), true.into());

        let mut b = d.entries[1].clone();
        b.metadata.extra.clear();
        b.set_name("Fresh B");
        let mut e = d.entries[4].clone();
        e.states.insert(StateFlag::Deleted);

        d.merge_refreshed(&[b, e, visible("ghost")], &["f".to_string()]);
        assert_eq!(ids(&d), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(d.entries[1].name, "Fresh B");
        assert_eq!(d.entries[1].metadata.extra["pinned"], true);
        assert!(d.entries[4].states.contains(StateFlag::Deleted));
        assert_eq!(d.entries[0].name, "Entry a");
    }

    #[test]
    fn test_validators() {
        let mut d = doc(&[]);
        d.modified = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(d.etag(), "1709294400000-u-1");
        assert_eq!(d.last_modified(), "Fri, 01 Mar 2024 12:00:00 GMT");
    }

    #[test]
    fn test_document_json_shape() {
        let d = doc(&["a"]);
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value["userId"], "u-1");
        assert_eq!(value["orgId"], "org-1");
        assert_eq!(value["entries"][0]["id"], "a");

        let back: ProfileDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back.key, d.key);
    }
}
