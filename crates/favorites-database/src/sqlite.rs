//! SQLite-backed stores.

use crate::queries::{self, AuthorityRow, ProfileRow};
use crate::store::{AuthorityStore, ProfileStore};
use crate::{AsyncDatabase, DatabaseResult};
use async_trait::async_trait;
use chrono::Utc;
use favorites_model::{AuthorityRecord, Entry, ProfileDocument, ProfileKey, StateFlag};
use tracing::debug;

/// Implements both store traits on top of [`AsyncDatabase`].
#[derive(Clone)]
pub struct SqliteStore {
    db: AsyncDatabase,
}

impl SqliteStore {
    pub fn new(db: AsyncDatabase) -> Self {
        Self { db }
    }
}

fn document_from_row(row: ProfileRow) -> DatabaseResult<ProfileDocument> {
    let entries: Vec<Entry> = serde_json::from_str(&row.document)?;
    Ok(ProfileDocument {
        key: ProfileKey::new(row.user_id, row.org_id),
        entries,
        modified: queries::parse_timestamp(&row.modified)?,
    })
}

fn row_from_document(document: &ProfileDocument) -> DatabaseResult<ProfileRow> {
    Ok(ProfileRow {
        user_id: document.key.user_id.clone(),
        org_id: document.key.org_id.clone(),
        document: serde_json::to_string(&document.entries)?,
        modified: queries::format_timestamp(&document.modified),
    })
}

fn record_from_row(row: AuthorityRow) -> DatabaseResult<AuthorityRecord> {
    Ok(AuthorityRecord {
        id: row.id,
        name: row.name,
        state: row.state.as_deref().and_then(StateFlag::from_token),
        modified: queries::parse_timestamp(&row.modified)?,
    })
}

fn row_from_record(record: &AuthorityRecord) -> AuthorityRow {
    AuthorityRow {
        id: record.id.clone(),
        name: record.name.clone(),
        state: record.state.map(|s| s.as_str().to_string()),
        modified: queries::format_timestamp(&record.modified),
    }
}

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn find_one(&self, key: &ProfileKey) -> DatabaseResult<Option<ProfileDocument>> {
        let (user_id, org_id) = (key.user_id.clone(), key.org_id.clone());
        let row = self
            .db
            .call(move |conn| queries::get_profile(conn, &user_id, &org_id))
            .await?;
        row.map(document_from_row).transpose()
    }

    async fn find_or_create(&self, key: &ProfileKey) -> DatabaseResult<ProfileDocument> {
        let empty = row_from_document(&ProfileDocument::new(key.clone()))?;
        let (user_id, org_id) = (key.user_id.clone(), key.org_id.clone());
        let (created, row) = self
            .db
            .call(move |conn| {
                let created = queries::insert_profile_if_absent(conn, &empty)?;
                let row = queries::get_profile(conn, &user_id, &org_id)?;
                Ok((created, row.unwrap_or(empty)))
            })
            .await?;
        if created {
            debug!(profile = %key, "Created empty profile document");
        }
        document_from_row(row)
    }

    async fn upsert(&self, mut document: ProfileDocument) -> DatabaseResult<ProfileDocument> {
        document.modified = Utc::now();
        let row = row_from_document(&document)?;
        self.db
            .call(move |conn| queries::upsert_profile(conn, &row))
            .await?;
        debug!(profile = %document.key, entries = document.entries.len(), "Profile document saved");
        Ok(document)
    }
}

#[async_trait]
impl AuthorityStore for SqliteStore {
    async fn find(&self, id: &str) -> DatabaseResult<Option<AuthorityRecord>> {
        let id = id.to_string();
        let row = self
            .db
            .call(move |conn| queries::get_authority(conn, &id))
            .await?;
        row.map(record_from_row).transpose()
    }

    async fn find_or_create(&self, seed: AuthorityRecord) -> DatabaseResult<AuthorityRecord> {
        let seed_row = row_from_record(&seed);
        let row = self
            .db
            .call(move |conn| {
                queries::insert_authority_if_absent(conn, &seed_row)?;
                let row = queries::get_authority(conn, &seed_row.id)?;
                Ok(row.unwrap_or(seed_row))
            })
            .await?;
        record_from_row(row)
    }

    async fn upsert(&self, mut record: AuthorityRecord) -> DatabaseResult<AuthorityRecord> {
        record.modified = Utc::now();
        let row = row_from_record(&record);
        self.db
            .call(move |conn| queries::upsert_authority(conn, &row))
            .await?;
        Ok(record)
    }
}
