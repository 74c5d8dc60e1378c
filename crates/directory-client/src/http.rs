//! reqwest implementation of [`PeopleDirectory`].

use crate::types::{BulkProfilesBody, BulkProfilesRequest, IdMappingRequest};
use crate::{
    AuthHeaders, BulkProfiles, DirectoryError, DirectoryResult, IdMapping, PeopleDirectory,
    ProfileLookup,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Directory endpoints and credentials.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Profiles base URL; `json/profile.do` and `json/profileBulk.do` are
    /// resolved against it.
    pub profiles_url: Url,
    /// Batch id mapping endpoint.
    pub id_mapping_url: Url,
    /// Sent as `Authorization` to the id mapping endpoint.
    pub s2s_token: Option<String>,
    pub timeout: Duration,
}

pub struct HttpPeopleDirectory {
    config: DirectoryConfig,
    client: Client,
}

impl HttpPeopleDirectory {
    pub fn new(config: DirectoryConfig) -> DirectoryResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn with_auth(request: RequestBuilder, auth: &AuthHeaders) -> RequestBuilder {
        auth.iter()
            .fold(request, |request, (name, value)| request.header(name, value))
    }

    async fn check(response: Response) -> DirectoryResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DirectoryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PeopleDirectory for HttpPeopleDirectory {
    async fn lookup_profile(&self, ex_id: &str, auth: &AuthHeaders) -> DirectoryResult<ProfileLookup> {
        let mut url = self.config.profiles_url.join("json/profile.do")?;
        url.query_pairs_mut()
            .append_pair("format", "compact")
            .append_pair("userid", ex_id);
        debug!(url = %url, "Looking up profile");

        let request = Self::with_auth(self.client.get(url.clone()), auth);
        let response = Self::check(request.send().await?).await?;
        let lookup: ProfileLookup = response.json().await?;
        if lookup.key.as_deref().map_or(true, str::is_empty) {
            warn!(url = %url, ex_id, "Profile lookup returned no key");
            return Err(DirectoryError::Incomplete(format!(
                "no profile key for {}",
                ex_id
            )));
        }
        Ok(lookup)
    }

    async fn bulk_profiles(&self, keys: &[String], auth: &AuthHeaders) -> DirectoryResult<BulkProfiles> {
        let url = self.config.profiles_url.join("json/profileBulk.do")?;
        debug!(url = %url, keys = keys.len(), "Fetching profiles in bulk");

        let request = Self::with_auth(self.client.post(url), auth).json(&BulkProfilesRequest { keys });
        let response = Self::check(request.send().await?).await?;
        let body: BulkProfilesBody = response.json().await?;
        body.into_profiles()
            .ok_or_else(|| DirectoryError::Incomplete("bulk response has no profiles".to_string()))
    }

    async fn resolve_external_ids(&self, ex_ids: &[String]) -> DirectoryResult<IdMapping> {
        debug!(url = %self.config.id_mapping_url, ids = ex_ids.len(), "Resolving external ids");

        let mut request = self
            .client
            .post(self.config.id_mapping_url.clone())
            .json(&IdMappingRequest {
                internal_id: Vec::new(),
                external_id: ex_ids,
            });
        if let Some(token) = &self.config.s2s_token {
            request = request.header("Authorization", token);
        }
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::serve_once;

    fn directory(base: &Url, token: Option<&str>) -> HttpPeopleDirectory {
        HttpPeopleDirectory::new(DirectoryConfig {
            profiles_url: base.join("profiles/").unwrap(),
            id_mapping_url: base.join("people/idmapping").unwrap(),
            s2s_token: token.map(str::to_string),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_lookup_profile_forwards_auth_headers() {
        let (base, request) = serve_once(200, r#"{"key":"k-1","tel":{"work":"+1 555"}}"#).await;
        let dir = directory(&base, None);
        let auth = AuthHeaders::new().with("cookie", "session=abc");

        let lookup = dir.lookup_profile("ex-1", &auth).await.unwrap();
        assert_eq!(lookup.key.as_deref(), Some("k-1"));
        assert_eq!(lookup.tel.unwrap()["work"], "+1 555");

        let raw = request.await.unwrap().to_lowercase();
        assert!(raw.starts_with("get /profiles/json/profile.do?format=compact&userid=ex-1 "));
        assert!(raw.contains("cookie: session=abc"));
    }

    #[tokio::test]
    async fn test_lookup_profile_without_key_is_incomplete() {
        let (base, _request) = serve_once(200, r#"{"displayName":"Ada"}"#).await;
        let err = directory(&base, None)
            .lookup_profile("ex-1", &AuthHeaders::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Incomplete(_)));
    }

    #[tokio::test]
    async fn test_bulk_profiles_posts_keys() {
        let (base, request) = serve_once(
            200,
            r#"{"profiles":[{"k1":{"displayName":"Ada"}}],"invalid-keys":["k2"]}"#,
        )
        .await;
        let keys = vec!["k1".to_string(), "k2".to_string()];
        let bulk = directory(&base, None)
            .bulk_profiles(&keys, &AuthHeaders::new())
            .await
            .unwrap();
        assert_eq!(bulk.profiles["k1"].display_name.as_deref(), Some("Ada"));
        assert_eq!(bulk.invalid_keys, vec!["k2"]);

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /profiles/json/profileBulk.do "));
        assert!(raw.ends_with(r#"{"keys":["k1","k2"]}"#));
    }

    #[tokio::test]
    async fn test_resolve_external_ids_sends_token() {
        let (base, request) = serve_once(
            200,
            r#"{"success":[{"internalId":"k1","orgId":"org-1"}],"error":[{"externalId":"e2"}]}"#,
        )
        .await;
        let ids = vec!["e1".to_string(), "e2".to_string()];
        let mapping = directory(&base, Some("s2s-secret"))
            .resolve_external_ids(&ids)
            .await
            .unwrap();
        assert_eq!(mapping.success[0].internal_id, "k1");
        assert_eq!(mapping.error[0].external_id, "e2");

        let raw = request.await.unwrap();
        assert!(raw.to_lowercase().contains("authorization: s2s-secret"));
        assert!(raw.ends_with(r#"{"internalId":[],"externalId":["e1","e2"]}"#));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (base, _request) = serve_once(503, "maintenance").await;
        let err = directory(&base, None)
            .resolve_external_ids(&["e1".to_string()])
            .await
            .unwrap_err();
        match err {
            DirectoryError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
