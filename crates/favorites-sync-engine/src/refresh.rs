//! Lazy refresh of expired entries on read.

use crate::cache::merge_into_entry;
use crate::SyncEngine;
use chrono::{DateTime, Utc};
use directory_client::{AuthHeaders, BulkProfile, BulkProfiles};
use favorites_database::ProfileStore;
use favorites_model::{AuthorityRecord, Entry, ProfileKey, StateFlag};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What a refresh did to the view.
#[derive(Debug, Default)]
pub struct RefreshOutcome {
    /// Entries whose sync timestamp was renewed.
    pub refreshed: usize,
    /// Ids removed from the view because the directory no longer knows them.
    pub deleted_ids: Vec<String>,
    /// Background task folding the view into the stored document.
    pub persist: Option<JoinHandle<()>>,
}

impl RefreshOutcome {
    pub fn is_noop(&self) -> bool {
        self.refreshed == 0 && self.deleted_ids.is_empty()
    }
}

impl SyncEngine {
    /// Refresh expired entries of `view` in place.
    ///
    /// `view` is the filtered, paginated subset of the user's document. When
    /// anything was refreshed, a detached task merges it into the full
    /// document and persists it; persistence failures are only logged.
    /// Directory failures leave people entries stale.
    pub async fn refresh_view(&self, key: &ProfileKey, view: &mut Vec<Entry>, auth: &AuthHeaders) -> RefreshOutcome {
        let now = Utc::now();
        let mut outcome = RefreshOutcome {
            refreshed: self.refresh_communities(view, now).await,
            ..RefreshOutcome::default()
        };

        if self.settings.sync_people_changes {
            let (refreshed, deleted_ids) = self.refresh_people(view, auth, now).await;
            outcome.refreshed += refreshed;
            outcome.deleted_ids = deleted_ids;
        } else {
            debug!("People sync disabled");
        }

        if outcome.is_noop() {
            return outcome;
        }
        debug!(
            key = %key,
            refreshed = outcome.refreshed,
            deleted = outcome.deleted_ids.len(),
            "Merging refreshed entries"
        );
        outcome.persist = Some(spawn_merge(
            self.profiles.clone(),
            key.clone(),
            view.clone(),
            outcome.deleted_ids.clone(),
        ));
        outcome
    }

    async fn refresh_communities(&self, view: &mut [Entry], now: DateTime<Utc>) -> usize {
        let mut refreshed = 0;
        for entry in view
            .iter_mut()
            .filter(|e| e.is_community() && e.is_expired(now, self.settings.ttl))
        {
            let record = match self
                .authority
                .find_or_create(AuthorityRecord::seeded_from(entry))
                .await
            {
                Ok(record) => record,
                Err(e) => {
                    warn!(id = %entry.id, error = %e, "Failed to load authority record");
                    continue;
                }
            };
            entry.synced = now;
            if merge_into_entry(&record, entry) {
                debug!(id = %entry.id, "Community entry updated from authority cache");
            }
            refreshed += 1;
        }
        refreshed
    }

    async fn refresh_people(&self, view: &mut Vec<Entry>, auth: &AuthHeaders, now: DateTime<Utc>) -> (usize, Vec<String>) {
        let keys: Vec<String> = view
            .iter()
            .filter(|e| e.is_people() && e.is_expired(now, self.settings.ttl))
            .map(|e| e.id.clone())
            .collect();
        if keys.is_empty() {
            return (0, Vec::new());
        }
        debug!(count = keys.len(), "Expired people entries");

        let bulk = match self.directory.bulk_profiles(&keys, auth).await {
            Ok(bulk) => bulk,
            Err(e) => {
                error!(count = keys.len(), error = %e, "Failed to load profiles in bulk");
                return (0, Vec::new());
            }
        };
        apply_bulk_profiles(view, &keys, bulk, now)
    }
}

/// Apply a bulk answer to the expired people entries named in `keys`.
fn apply_bulk_profiles(view: &mut Vec<Entry>, keys: &[String], bulk: BulkProfiles, now: DateTime<Utc>) -> (usize, Vec<String>) {
    let mut refreshed = 0;
    for entry in view.iter_mut().filter(|e| keys.contains(&e.id)) {
        if let Some(profile) = bulk.profiles.get(&entry.id) {
            apply_profile(entry, profile, now);
            refreshed += 1;
        }
    }

    let mut deleted_ids = Vec::new();
    for id in &bulk.invalid_keys {
        if let Some(position) = view.iter().position(|e| &e.id == id) {
            view.remove(position);
            info!(id = %id, "Removing entry for unknown profile key");
            deleted_ids.push(id.clone());
        }
    }
    (refreshed, deleted_ids)
}

fn apply_profile(entry: &mut Entry, profile: &BulkProfile, now: DateTime<Utc>) {
    entry.synced = now;
    entry.set_name(profile.display_name.clone().unwrap_or_default());

    match profile.email.as_deref().filter(|e| !e.is_empty()) {
        Some(email) => entry.metadata.email = Some(email.to_string()),
        None => {
            if entry.metadata.email.as_deref().is_some_and(|e| !e.is_empty()) {
                entry.metadata.email = Some(String::new());
            }
        }
    }

    // People entries carry a single state: active (empty), INACTIVE or DELETED.
    if let Some(token) = profile.state.as_deref().filter(|s| !s.is_empty()) {
        let flag = StateFlag::from_token(token);
        if flag.is_none() && !is_active_token(token) {
            warn!(id = %entry.id, state = token, "Unknown profile state, treating as active");
        }
        entry.states.set_single(flag);
    }
}

fn is_active_token(token: &str) -> bool {
    token.eq_ignore_ascii_case("active") || token.eq_ignore_ascii_case("normal")
}

fn spawn_merge(store: Arc<dyn ProfileStore>, key: ProfileKey, refreshed: Vec<Entry>, deleted_ids: Vec<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut document = match store.find_one(&key).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                warn!(key = %key, "Document vanished before refresh could be merged");
                return;
            }
            Err(e) => {
                error!(key = %key, error = %e, "Failed to load document for refresh merge");
                return;
            }
        };
        document.merge_refreshed(&refreshed, &deleted_ids);
        match store.upsert(document).await {
            Ok(stored) => debug!(key = %key, entries = stored.entries.len(), "Refreshed entries persisted"),
            Err(e) => error!(key = %key, error = %e, "Failed to persist refreshed entries"),
        }
    })
}
