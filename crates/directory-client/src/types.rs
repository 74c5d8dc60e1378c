//! Directory request/response types and the client trait.

use crate::DirectoryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Caller credentials forwarded verbatim to the profiles directory
/// (typically `cookie` and `authorization`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthHeaders(Vec<(String, String)>);

impl AuthHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((name.into(), value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Compact profile returned for a single external id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProfileLookup {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub tel: Option<serde_json::Value>,
}

/// Current values for one profile key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Answer to a bulk profile query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkProfiles {
    pub profiles: HashMap<String, BulkProfile>,
    /// Keys the directory no longer knows (the person left the organization).
    pub invalid_keys: Vec<String>,
}

/// Wire shape: `{"profiles": [{"<key>": {...}}, ...], "invalid-keys": [...]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct BulkProfilesBody {
    pub profiles: Option<Vec<HashMap<String, BulkProfile>>>,
    #[serde(rename = "invalid-keys", default)]
    pub invalid_keys: Vec<String>,
}

impl BulkProfilesBody {
    pub(crate) fn into_profiles(self) -> Option<BulkProfiles> {
        let profiles = self.profiles?.into_iter().flatten().collect();
        Some(BulkProfiles {
            profiles,
            invalid_keys: self.invalid_keys,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkProfilesRequest<'a> {
    pub keys: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IdMappingRequest<'a> {
    pub internal_id: Vec<String>,
    pub external_id: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedId {
    pub internal_id: String,
    pub org_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmappedId {
    pub external_id: String,
}

/// Answer to a batch external-id lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdMapping {
    #[serde(default)]
    pub success: Vec<MappedId>,
    #[serde(default)]
    pub error: Vec<UnmappedId>,
}

/// People directory operations used by the engines.
#[async_trait]
pub trait PeopleDirectory: Send + Sync {
    /// Look up one person by external id on behalf of the caller.
    async fn lookup_profile(&self, ex_id: &str, auth: &AuthHeaders) -> DirectoryResult<ProfileLookup>;

    /// Fetch current values for several profile keys in one request.
    async fn bulk_profiles(&self, keys: &[String], auth: &AuthHeaders) -> DirectoryResult<BulkProfiles>;

    /// Map external ids to profile keys (service-to-service).
    async fn resolve_external_ids(&self, ex_ids: &[String]) -> DirectoryResult<IdMapping>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_body_flattens_profiles() {
        let body: BulkProfilesBody = serde_json::from_str(
            r#"{
                "profiles": [
                    { "k1": { "displayName": "Ada", "email": "ada@example.com", "state": "active" } },
                    { "k2": {} }
                ],
                "invalid-keys": ["k3"]
            }"#,
        )
        .unwrap();
        let bulk = body.into_profiles().unwrap();
        assert_eq!(bulk.profiles.len(), 2);
        assert_eq!(bulk.profiles["k1"].display_name.as_deref(), Some("Ada"));
        assert!(bulk.profiles["k2"].email.is_none());
        assert_eq!(bulk.invalid_keys, vec!["k3"]);
    }

    #[test]
    fn test_bulk_body_without_profiles() {
        let body: BulkProfilesBody = serde_json::from_str(r#"{"error": "nope"}"#).unwrap();
        assert!(body.into_profiles().is_none());
    }

    #[test]
    fn test_id_mapping_request_shape() {
        let ids = vec!["e1".to_string()];
        let value = serde_json::to_value(IdMappingRequest {
            internal_id: Vec::new(),
            external_id: &ids,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({ "internalId": [], "externalId": ["e1"] }));
    }
}
