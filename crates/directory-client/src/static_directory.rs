//! Canned-answer directory.

use crate::{
    AuthHeaders, BulkProfile, BulkProfiles, DirectoryError, DirectoryResult, IdMapping, MappedId,
    PeopleDirectory, ProfileLookup, UnmappedId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    lookups: HashMap<String, ProfileLookup>,
    profiles: HashMap<String, BulkProfile>,
    invalid_keys: Vec<String>,
    mappings: HashMap<String, MappedId>,
    unavailable: bool,
    bulk_requests: Vec<Vec<String>>,
    resolve_requests: Vec<Vec<String>>,
    lookup_requests: Vec<String>,
}

/// In-memory [`PeopleDirectory`] that records every request.
///
/// Unknown external ids fail lookups and land in the mapping `error` list.
#[derive(Default)]
pub struct StaticDirectory {
    state: Mutex<State>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer `lookup_profile(ex_id)` with `key` and optional telephone data.
    pub fn with_lookup(self, ex_id: &str, key: &str, tel: Option<serde_json::Value>) -> Self {
        self.state().lookups.insert(
            ex_id.to_string(),
            ProfileLookup {
                key: Some(key.to_string()),
                tel,
            },
        );
        self
    }

    pub fn with_profile(self, key: &str, profile: BulkProfile) -> Self {
        self.state().profiles.insert(key.to_string(), profile);
        self
    }

    pub fn with_invalid_key(self, key: &str) -> Self {
        self.state().invalid_keys.push(key.to_string());
        self
    }

    pub fn with_mapping(self, ex_id: &str, internal_id: &str, org_id: &str) -> Self {
        self.state().mappings.insert(
            ex_id.to_string(),
            MappedId {
                internal_id: internal_id.to_string(),
                org_id: org_id.to_string(),
            },
        );
        self
    }

    /// Fail every call as if the directory were down.
    pub fn unavailable(self) -> Self {
        self.state().unavailable = true;
        self
    }

    pub fn bulk_requests(&self) -> Vec<Vec<String>> {
        self.state().bulk_requests.clone()
    }

    pub fn resolve_requests(&self) -> Vec<Vec<String>> {
        self.state().resolve_requests.clone()
    }

    pub fn lookup_requests(&self) -> Vec<String> {
        self.state().lookup_requests.clone()
    }

    fn down() -> DirectoryError {
        DirectoryError::Status {
            status: 503,
            body: "directory unavailable".to_string(),
        }
    }
}

#[async_trait]
impl PeopleDirectory for StaticDirectory {
    async fn lookup_profile(&self, ex_id: &str, _auth: &AuthHeaders) -> DirectoryResult<ProfileLookup> {
        let mut state = self.state();
        state.lookup_requests.push(ex_id.to_string());
        if state.unavailable {
            return Err(Self::down());
        }
        state
            .lookups
            .get(ex_id)
            .cloned()
            .ok_or_else(|| DirectoryError::Incomplete(format!("no profile key for {}", ex_id)))
    }

    async fn bulk_profiles(&self, keys: &[String], _auth: &AuthHeaders) -> DirectoryResult<BulkProfiles> {
        let mut state = self.state();
        state.bulk_requests.push(keys.to_vec());
        if state.unavailable {
            return Err(Self::down());
        }
        let profiles = keys
            .iter()
            .filter_map(|k| state.profiles.get(k).map(|p| (k.clone(), p.clone())))
            .collect();
        let invalid_keys = state
            .invalid_keys
            .iter()
            .filter(|k| keys.contains(k))
            .cloned()
            .collect();
        Ok(BulkProfiles {
            profiles,
            invalid_keys,
        })
    }

    async fn resolve_external_ids(&self, ex_ids: &[String]) -> DirectoryResult<IdMapping> {
        let mut state = self.state();
        state.resolve_requests.push(ex_ids.to_vec());
        if state.unavailable {
            return Err(Self::down());
        }
        let mut mapping = IdMapping::default();
        for ex_id in ex_ids {
            match state.mappings.get(ex_id) {
                Some(mapped) => mapping.success.push(mapped.clone()),
                None => mapping.error.push(UnmappedId {
                    external_id: ex_id.clone(),
                }),
            }
        }
        Ok(mapping)
    }
}
