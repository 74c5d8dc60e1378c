//! The operations exposed to the binding layer.
//!
//! Wraps [`ListEngine`] with the steps that need collaborators the engine
//! does not own: people id resolution before an add, authority seeding after
//! a create, and lazy refresh of the page being read.

use crate::background::BackgroundTasks;
use directory_client::{AuthHeaders, PeopleDirectory};
use favorites_database::AuthorityStore;
use favorites_list_engine::{
    Actor, DeleteSummary, EntryResult, ListEngine, ListQuery, Page, PagingView, Written,
};
use favorites_model::{AuthorityRecord, Entry, MoveOutcome, ProfileKey};
use favorites_sync_engine::SyncEngine;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Who is calling, as resolved by the binding layer.
#[derive(Debug, Clone)]
pub struct Caller {
    pub actor: Actor,
    /// Headers forwarded to the profiles directory.
    pub auth: AuthHeaders,
}

impl Caller {
    pub fn new(key: ProfileKey, auth: AuthHeaders) -> Self {
        Self {
            actor: Actor::new(key),
            auth,
        }
    }

    /// Attach the display name and email carried on audit events.
    pub fn with_profile(mut self, name: Option<String>, email: Option<String>) -> Self {
        self.actor = self.actor.with_profile(name, email);
        self
    }

    pub fn key(&self) -> &ProfileKey {
        &self.actor.key
    }
}

/// A page plus the validators for conditional requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryList {
    #[serde(flatten)]
    pub page: Page,
    #[serde(skip)]
    pub etag: String,
    #[serde(skip)]
    pub last_modified: String,
}

pub struct FavoritesService {
    list: ListEngine,
    paging: PagingView,
    sync: Arc<SyncEngine>,
    directory: Arc<dyn PeopleDirectory>,
    authority: Arc<dyn AuthorityStore>,
    tasks: Arc<BackgroundTasks>,
}

impl FavoritesService {
    pub fn new(
        list: ListEngine,
        paging: PagingView,
        sync: Arc<SyncEngine>,
        directory: Arc<dyn PeopleDirectory>,
        authority: Arc<dyn AuthorityStore>,
        tasks: Arc<BackgroundTasks>,
    ) -> Self {
        Self {
            list,
            paging,
            sync,
            directory,
            authority,
            tasks,
        }
    }

    /// Detached work started by this service.
    pub fn background(&self) -> &Arc<BackgroundTasks> {
        &self.tasks
    }

    pub async fn add_entry(&self, caller: &Caller, mut entry: Entry, target: Option<&str>) -> EntryResult<Entry> {
        self.resolve_people_id(&mut entry, &caller.auth).await?;
        let created = self.list.add(&caller.actor, entry, target).await?;
        self.seed_authority(&created);
        Ok(created)
    }

    pub async fn add_or_update_entry(
        &self,
        caller: &Caller,
        mut entry: Entry,
        target: Option<&str>,
    ) -> EntryResult<Written> {
        self.resolve_people_id(&mut entry, &caller.auth).await?;
        let written = self.list.add_or_update(&caller.actor, entry, target).await?;
        if let Written::Created(created) = &written {
            self.seed_authority(created);
        }
        Ok(written)
    }

    pub async fn delete_entry(&self, caller: &Caller, id: &str) -> EntryResult<Entry> {
        self.list.delete(&caller.actor, id).await
    }

    pub async fn delete_entries(&self, caller: &Caller, ids: &str) -> EntryResult<DeleteSummary> {
        self.list.delete_many(&caller.actor, ids).await
    }

    pub async fn move_entry(&self, caller: &Caller, source_id: &str, target: Option<&str>) -> EntryResult<MoveOutcome> {
        self.list.move_entry(&caller.actor, source_id, target).await
    }

    /// Read one page, refreshing its expired entries first.
    ///
    /// The refreshed values are returned immediately; folding them back into
    /// the stored document happens on a tracked background task.
    pub async fn get_entry_list(&self, caller: &Caller, query: ListQuery) -> EntryResult<EntryList> {
        let key = caller.key();
        let document = self.list.load(key).await?;
        let mut page = self.paging.view(&document.entries, &query);

        let outcome = self
            .sync
            .refresh_view(key, &mut page.entries, &caller.auth)
            .await;
        if let Some(persist) = outcome.persist {
            self.tasks.track(persist);
        }
        if outcome.refreshed > 0 || !outcome.deleted_ids.is_empty() {
            debug!(
                key = %key,
                refreshed = outcome.refreshed,
                deleted = outcome.deleted_ids.len(),
                "Page refreshed"
            );
        }

        Ok(EntryList {
            page,
            etag: document.etag(),
            last_modified: document.last_modified(),
        })
    }

    /// Swap an external id for the directory's profile key and fill in
    /// missing telephone data. Only people entries are touched.
    async fn resolve_people_id(&self, entry: &mut Entry, auth: &AuthHeaders) -> EntryResult<()> {
        if !entry.is_people() {
            return Ok(());
        }
        let Some(ex_id) = entry.metadata.ex_id.clone().filter(|ex_id| !ex_id.is_empty()) else {
            return Ok(());
        };
        if entry.id.is_empty() {
            entry.id = ex_id.clone();
        }

        let needs_key = entry.id == ex_id;
        let needs_tel = entry.is_visible() && entry.metadata.tel_is_empty();
        if !needs_key && !needs_tel {
            return Ok(());
        }

        let lookup = match self.directory.lookup_profile(&ex_id, auth).await {
            Ok(lookup) => lookup,
            Err(e) if needs_key => {
                error!(ex_id = %ex_id, error = %e, "Failed to resolve profile key");
                return Err(e.into());
            }
            Err(e) => {
                warn!(ex_id = %ex_id, error = %e, "Failed to load telephone data");
                return Ok(());
            }
        };

        if let Some(key) = lookup.key.filter(|key| !key.is_empty()) {
            debug!(ex_id = %ex_id, key = %key, "Resolved profile key");
            entry.id = key;
        }
        if needs_tel {
            entry.metadata.tel = Some(lookup.tel.unwrap_or_else(|| serde_json::json!({})));
        }
        Ok(())
    }

    /// Make sure a newly created community has an authority record.
    fn seed_authority(&self, entry: &Entry) {
        if !entry.is_community() {
            return;
        }
        let authority = self.authority.clone();
        let seed = AuthorityRecord::seeded_from(entry);
        self.tasks.track(tokio::spawn(async move {
            let id = seed.id.clone();
            if let Err(e) = authority.find_or_create(seed).await {
                error!(id = %id, error = %e, "Failed to seed authority record");
            }
        }));
    }
}
