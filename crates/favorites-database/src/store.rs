//! Store traits used by the list and sync engines.

use crate::DatabaseResult;
use async_trait::async_trait;
use favorites_model::{AuthorityRecord, ProfileDocument, ProfileKey};

/// Whole-document persistence for profile documents.
///
/// Documents are read whole, mutated in memory and written back whole; the
/// last write wins.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_one(&self, key: &ProfileKey) -> DatabaseResult<Option<ProfileDocument>>;

    /// Load the document, creating an empty one first if absent.
    async fn find_or_create(&self, key: &ProfileKey) -> DatabaseResult<ProfileDocument>;

    /// Write the document, stamping `modified` with the current time.
    /// Returns the document as stored.
    async fn upsert(&self, document: ProfileDocument) -> DatabaseResult<ProfileDocument>;
}

/// Independently keyed cache of community names and delete state.
#[async_trait]
pub trait AuthorityStore: Send + Sync {
    async fn find(&self, id: &str) -> DatabaseResult<Option<AuthorityRecord>>;

    /// Return the stored record, inserting `seed` first if none exists.
    async fn find_or_create(&self, seed: AuthorityRecord) -> DatabaseResult<AuthorityRecord>;

    /// Write the record, stamping `modified`. Returns the record as stored.
    async fn upsert(&self, record: AuthorityRecord) -> DatabaseResult<AuthorityRecord>;
}
