//! In-process store for tests and local experiments.

use crate::store::{AuthorityStore, ProfileStore};
use crate::{DatabaseError, DatabaseResult};
use async_trait::async_trait;
use chrono::Utc;
use favorites_model::{AuthorityRecord, ProfileDocument, ProfileKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// HashMap-backed implementation of both store traits.
///
/// Counts profile upserts and can be told to fail them, which lets engine
/// tests assert on persistence behaviour.
#[derive(Default)]
pub struct MemoryStore {
    profiles: Mutex<HashMap<ProfileKey, ProfileDocument>>,
    authority: Mutex<HashMap<String, AuthorityRecord>>,
    profile_upserts: AtomicUsize,
    authority_upserts: AtomicUsize,
    fail_profile_upserts: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document without counting it as an upsert.
    pub fn insert_profile(&self, document: ProfileDocument) {
        lock(&self.profiles).insert(document.key.clone(), document);
    }

    /// Seed an authority record without counting it as an upsert.
    pub fn insert_authority(&self, record: AuthorityRecord) {
        lock(&self.authority).insert(record.id.clone(), record);
    }

    pub fn profile(&self, key: &ProfileKey) -> Option<ProfileDocument> {
        lock(&self.profiles).get(key).cloned()
    }

    pub fn authority_record(&self, id: &str) -> Option<AuthorityRecord> {
        lock(&self.authority).get(id).cloned()
    }

    pub fn profile_upserts(&self) -> usize {
        self.profile_upserts.load(Ordering::SeqCst)
    }

    pub fn authority_upserts(&self) -> usize {
        self.authority_upserts.load(Ordering::SeqCst)
    }

    /// Make every following profile upsert fail with a connection error.
    pub fn fail_profile_upserts(&self, fail: bool) {
        self.fail_profile_upserts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_one(&self, key: &ProfileKey) -> DatabaseResult<Option<ProfileDocument>> {
        Ok(self.profile(key))
    }

    async fn find_or_create(&self, key: &ProfileKey) -> DatabaseResult<ProfileDocument> {
        let mut profiles = lock(&self.profiles);
        Ok(profiles
            .entry(key.clone())
            .or_insert_with(|| ProfileDocument::new(key.clone()))
            .clone())
    }

    async fn upsert(&self, mut document: ProfileDocument) -> DatabaseResult<ProfileDocument> {
        if self.fail_profile_upserts.load(Ordering::SeqCst) {
            return Err(DatabaseError::Connection("upsert rejected".to_string()));
        }
        document.modified = Utc::now();
        lock(&self.profiles).insert(document.key.clone(), document.clone());
        self.profile_upserts.fetch_add(1, Ordering::SeqCst);
        Ok(document)
    }
}

#[async_trait]
impl AuthorityStore for MemoryStore {
    async fn find(&self, id: &str) -> DatabaseResult<Option<AuthorityRecord>> {
        Ok(self.authority_record(id))
    }

    async fn find_or_create(&self, seed: AuthorityRecord) -> DatabaseResult<AuthorityRecord> {
        let mut authority = lock(&self.authority);
        Ok(authority.entry(seed.id.clone()).or_insert(seed).clone())
    }

    async fn upsert(&self, mut record: AuthorityRecord) -> DatabaseResult<AuthorityRecord> {
        record.modified = Utc::now();
        lock(&self.authority).insert(record.id.clone(), record.clone());
        self.authority_upserts.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use favorites_model::Entry;

    #[tokio::test]
    async fn test_upsert_counts_and_stamps() {
        let store = MemoryStore::new();
        let key = ProfileKey::new("u-1", "org-1");
        let mut doc = ProfileStore::find_or_create(&store, &key).await.unwrap();
        assert_eq!(store.profile_upserts(), 0);

        doc.entries.push(Entry::new("c-1", "Guild", "community", "https://img/1"));
        ProfileStore::upsert(&store, doc).await.unwrap();
        assert_eq!(store.profile_upserts(), 1);
        assert_eq!(store.profile(&key).unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_upserts() {
        let store = MemoryStore::new();
        store.fail_profile_upserts(true);
        let doc = ProfileDocument::new(ProfileKey::new("u-1", "org-1"));
        assert!(ProfileStore::upsert(&store, doc).await.is_err());
        assert_eq!(store.profile_upserts(), 0);
    }
}
