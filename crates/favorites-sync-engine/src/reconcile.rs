//! Event reconciliation: lifecycle events into cache records and ACL flags.

use crate::cache::{apply_change, CommunityChange};
use crate::events::{LifecycleEvent, MembershipChange};
use crate::{SyncEngine, SyncResult};
use favorites_model::{AuthorityRecord, ProfileKey, StateFlag};
use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Something was written; for membership events, the number of
    /// documents that changed.
    Applied(usize),
    /// The event was valid but already reflected in stored state.
    Unchanged,
    /// Not an event this service acts on.
    Ignored,
    /// Membership sync is switched off.
    Disabled,
}

impl SyncEngine {
    /// Apply one event to completion.
    pub async fn handle_event(&self, event: LifecycleEvent) -> SyncResult<EventOutcome> {
        debug!(kind = event.kind(), "Handling lifecycle event");
        match event {
            LifecycleEvent::CommunityUpdated { community_id, name } => {
                self.apply_community(&community_id, CommunityChange::Renamed(name))
                    .await
            }
            LifecycleEvent::CommunityDeleted { community_id } => {
                self.apply_community(&community_id, CommunityChange::Deleted)
                    .await
            }
            LifecycleEvent::CommunityRestored { community_id } => {
                self.apply_community(&community_id, CommunityChange::Restored)
                    .await
            }
            event @ LifecycleEvent::Membership { .. } => self.apply_membership(event).await,
            LifecycleEvent::Ignored { reason } => {
                debug!(reason = %reason, "Event ignored");
                Ok(EventOutcome::Ignored)
            }
        }
    }

    async fn apply_community(&self, community_id: &str, change: CommunityChange) -> SyncResult<EventOutcome> {
        let mut record = self
            .authority
            .find_or_create(AuthorityRecord::new(community_id))
            .await?;
        if !apply_change(&mut record, &change) {
            return Ok(EventOutcome::Unchanged);
        }
        self.authority.upsert(record).await?;
        info!(id = community_id, change = ?change, "Authority record updated");
        Ok(EventOutcome::Applied(1))
    }

    async fn apply_membership(&self, event: LifecycleEvent) -> SyncResult<EventOutcome> {
        if !self.settings.communities_acl_sync {
            debug!("Communities ACL sync disabled");
            return Ok(EventOutcome::Disabled);
        }
        if event.is_public_removal() {
            debug!("Member removed from a public community, access unchanged");
            return Ok(EventOutcome::Ignored);
        }
        let LifecycleEvent::Membership {
            change,
            community_id,
            target_people,
            ..
        } = event
        else {
            return Ok(EventOutcome::Ignored);
        };
        if target_people.is_empty() {
            debug!(community = %community_id, "Membership event has no target people");
            return Ok(EventOutcome::Ignored);
        }

        let mapping = self.directory.resolve_external_ids(&target_people).await?;
        for unmapped in &mapping.error {
            error!(ex_id = %unmapped.external_id, "Failed to map external id to profile key");
        }
        if mapping.success.is_empty() {
            error!(community = %community_id, people = ?target_people, "No profile keys for membership event");
            return Ok(EventOutcome::Unchanged);
        }

        let added = change == MembershipChange::Added;
        let toggles = mapping.success.iter().map(|mapped| {
            let key = ProfileKey::new(mapped.internal_id.clone(), mapped.org_id.clone());
            let community_id = community_id.as_str();
            async move {
                let result = self.set_access(&key, community_id, added).await;
                if let Err(e) = &result {
                    warn!(key = %key, community = community_id, error = %e, "Failed to update entry access");
                }
                result
            }
        });
        let changed = join_all(toggles)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(true)))
            .count();

        info!(community = %community_id, added, changed, "Membership change applied");
        if changed == 0 {
            Ok(EventOutcome::Unchanged)
        } else {
            Ok(EventOutcome::Applied(changed))
        }
    }

    /// Clear (`has_access`) or set `NOACCESS` on the user's entry for a
    /// community. Returns whether the document changed.
    async fn set_access(&self, key: &ProfileKey, community_id: &str, has_access: bool) -> SyncResult<bool> {
        let Some(mut document) = self.profiles.find_one(key).await? else {
            debug!(key = %key, "No document for member");
            return Ok(false);
        };
        let Some(entry) = document
            .entries
            .iter_mut()
            .find(|e| e.id == community_id && e.is_community())
        else {
            debug!(key = %key, community = community_id, "No community entry for member");
            return Ok(false);
        };

        let changed = if has_access {
            entry.states.remove(StateFlag::NoAccess)
        } else {
            entry.states.insert(StateFlag::NoAccess)
        };
        if !changed {
            debug!(key = %key, community = community_id, states = %entry.states, "Access already up to date");
            return Ok(false);
        }
        self.profiles.upsert(document).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncSettings;
    use directory_client::StaticDirectory;
    use favorites_database::MemoryStore;
    use favorites_model::{Entry, ProfileDocument};
    use std::sync::Arc;
    use std::time::Duration;

    fn engine(store: &Arc<MemoryStore>, directory: StaticDirectory, acl_sync: bool) -> SyncEngine {
        SyncEngine::new(
            store.clone(),
            store.clone(),
            Arc::new(directory),
            SyncSettings {
                ttl: Duration::from_secs(3600),
                sync_people_changes: false,
                communities_acl_sync: acl_sync,
            },
        )
    }

    fn seed_member(store: &MemoryStore, user: &str, states: &[StateFlag]) -> ProfileKey {
        let key = ProfileKey::new(user, "org-1");
        let mut entry = Entry::new("c-1", "Guild", "community", "https://img/c");
        for flag in states {
            entry.states.insert(*flag);
        }
        let mut document = ProfileDocument::new(key.clone());
        document.entries.push(entry);
        store.insert_profile(document);
        key
    }

    fn states(store: &MemoryStore, key: &ProfileKey) -> Vec<StateFlag> {
        store.profile(key).unwrap().entries[0].states.iter().collect()
    }

    fn membership(name: &str, scope: &str, people: &[&str]) -> LifecycleEvent {
        let raw = serde_json::json!({
            "name": name,
            "object": { "id": "c-1", "name": "Guild" },
            "scope": scope,
            "targetingData": { "targetPeople": people },
        });
        LifecycleEvent::parse(&raw.to_string())
    }

    #[tokio::test]
    async fn deleted_event_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let sync = engine(&store, StaticDirectory::new(), true);
        let event = LifecycleEvent::CommunityDeleted {
            community_id: "c-1".into(),
        };

        assert_eq!(sync.handle_event(event.clone()).await.unwrap(), EventOutcome::Applied(1));
        let first = store.authority_record("c-1").unwrap();
        assert_eq!(sync.handle_event(event).await.unwrap(), EventOutcome::Unchanged);
        let second = store.authority_record("c-1").unwrap();

        assert_eq!(first.state, Some(StateFlag::Deleted));
        assert_eq!(first, second);
        assert_eq!(store.authority_upserts(), 1);
    }

    #[tokio::test]
    async fn updated_event_creates_record_and_keeps_delete_state() {
        let store = Arc::new(MemoryStore::new());
        let mut record = AuthorityRecord::new("c-2");
        record.state = Some(StateFlag::Deleted);
        store.insert_authority(record);
        let sync = engine(&store, StaticDirectory::new(), true);

        let renamed = LifecycleEvent::CommunityUpdated {
            community_id: "c-1".into(),
            name: Some("Fresh".into()),
        };
        sync.handle_event(renamed).await.unwrap();
        assert_eq!(store.authority_record("c-1").unwrap().name.as_deref(), Some("Fresh"));

        let renamed = LifecycleEvent::CommunityUpdated {
            community_id: "c-2".into(),
            name: Some("Renamed".into()),
        };
        sync.handle_event(renamed).await.unwrap();
        assert!(store.authority_record("c-2").unwrap().is_deleted());
    }

    #[tokio::test]
    async fn public_removal_never_sets_noaccess() {
        let store = Arc::new(MemoryStore::new());
        let key = seed_member(&store, "u-1", &[]);
        let directory = StaticDirectory::new().with_mapping("e1", "u-1", "org-1");
        let sync = engine(&store, directory, true);

        for name in ["community.membership.removed", "communities.notification.memberremove"] {
            let outcome = sync.handle_event(membership(name, "PUBLIC", &["e1"])).await.unwrap();
            assert_eq!(outcome, EventOutcome::Ignored);
        }
        assert!(states(&store, &key).is_empty());
        assert_eq!(store.profile_upserts(), 0);
    }

    #[tokio::test]
    async fn private_removal_sets_and_add_clears_noaccess() {
        let store = Arc::new(MemoryStore::new());
        let removed = seed_member(&store, "u-1", &[StateFlag::Deleted]);
        let other = seed_member(&store, "u-2", &[]);
        let directory = StaticDirectory::new()
            .with_mapping("e1", "u-1", "org-1")
            .with_mapping("e2", "u-2", "org-1");
        let sync = engine(&store, directory, true);

        let outcome = sync
            .handle_event(membership("community.membership.removed", "PRIVATE", &["e1", "e2", "e3"]))
            .await
            .unwrap();
        assert_eq!(outcome, EventOutcome::Applied(2));
        assert_eq!(states(&store, &removed), vec![StateFlag::Deleted, StateFlag::NoAccess]);
        assert_eq!(states(&store, &other), vec![StateFlag::NoAccess]);

        let outcome = sync
            .handle_event(membership("communities.notification.memberadd", "PRIVATE", &["e1"]))
            .await
            .unwrap();
        assert_eq!(outcome, EventOutcome::Applied(1));
        assert_eq!(states(&store, &removed), vec![StateFlag::Deleted]);

        let outcome = sync
            .handle_event(membership("community.membership.added", "PRIVATE", &["e1"]))
            .await
            .unwrap();
        assert_eq!(outcome, EventOutcome::Unchanged);
    }

    #[tokio::test]
    async fn members_without_entries_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let directory = StaticDirectory::new().with_mapping("e1", "u-9", "org-1");
        let sync = engine(&store, directory, true);

        let outcome = sync
            .handle_event(membership("community.membership.removed", "PRIVATE", &["e1"]))
            .await
            .unwrap();
        assert_eq!(outcome, EventOutcome::Unchanged);
    }

    #[tokio::test]
    async fn membership_gate_and_empty_targets() {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(StaticDirectory::new().with_mapping("e1", "u-1", "org-1"));
        let key = seed_member(&store, "u-1", &[]);
        let disabled = SyncEngine::new(
            store.clone(),
            store.clone(),
            directory.clone(),
            SyncSettings {
                communities_acl_sync: false,
                ..SyncSettings::default()
            },
        );
        let outcome = disabled
            .handle_event(membership("community.membership.added", "PRIVATE", &["e1"]))
            .await
            .unwrap();
        assert_eq!(outcome, EventOutcome::Disabled);

        let enabled = SyncEngine::new(
            store.clone(),
            store.clone(),
            directory.clone(),
            SyncSettings {
                communities_acl_sync: true,
                ..SyncSettings::default()
            },
        );
        let outcome = enabled
            .handle_event(membership("community.membership.removed", "PRIVATE", &[]))
            .await
            .unwrap();
        assert_eq!(outcome, EventOutcome::Ignored);

        assert!(directory.resolve_requests().is_empty());
        assert!(states(&store, &key).is_empty());
        assert_eq!(store.profile_upserts(), 0);
        assert_eq!(store.authority_upserts(), 0);
    }

    #[tokio::test]
    async fn directory_failure_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let sync = engine(&store, StaticDirectory::new().unavailable(), true);
        let result = sync
            .handle_event(membership("community.membership.removed", "PRIVATE", &["e1"]))
            .await;
        assert!(matches!(result, Err(crate::SyncError::Directory(_))));
    }
}
