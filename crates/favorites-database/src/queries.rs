//! SQL helpers. Every function runs on the executor thread and does no
//! JSON work: documents cross this boundary as already-encoded text.

use crate::{DatabaseError, DatabaseResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// Raw `profiles` row.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRow {
    pub user_id: String,
    pub org_id: String,
    pub document: String,
    pub modified: String,
}

/// Raw `latest_entry_data` row.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorityRow {
    pub id: String,
    pub name: Option<String>,
    pub state: Option<String>,
    pub modified: String,
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> DatabaseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::InvalidData(format!("bad timestamp {:?}: {}", raw, e)))
}

pub fn get_profile(
    conn: &Connection,
    user_id: &str,
    org_id: &str,
) -> DatabaseResult<Option<ProfileRow>> {
    let row = conn
        .query_row(
            "SELECT user_id, org_id, document, modified FROM profiles
             WHERE user_id = ?1 AND org_id = ?2",
            params![user_id, org_id],
            |row| {
                Ok(ProfileRow {
                    user_id: row.get(0)?,
                    org_id: row.get(1)?,
                    document: row.get(2)?,
                    modified: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Insert an empty profile unless one exists; returns whether a row was created.
pub fn insert_profile_if_absent(conn: &Connection, row: &ProfileRow) -> DatabaseResult<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO profiles (user_id, org_id, document, modified)
         VALUES (?1, ?2, ?3, ?4)",
        params![row.user_id, row.org_id, row.document, row.modified],
    )?;
    Ok(inserted > 0)
}

pub fn upsert_profile(conn: &Connection, row: &ProfileRow) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO profiles (user_id, org_id, document, modified)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (user_id, org_id)
         DO UPDATE SET document = excluded.document, modified = excluded.modified",
        params![row.user_id, row.org_id, row.document, row.modified],
    )?;
    Ok(())
}

pub fn get_authority(conn: &Connection, id: &str) -> DatabaseResult<Option<AuthorityRow>> {
    let row = conn
        .query_row(
            "SELECT id, name, state, modified FROM latest_entry_data WHERE id = ?1",
            params![id],
            |row| {
                Ok(AuthorityRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    state: row.get(2)?,
                    modified: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn insert_authority_if_absent(conn: &Connection, row: &AuthorityRow) -> DatabaseResult<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO latest_entry_data (id, name, state, modified)
         VALUES (?1, ?2, ?3, ?4)",
        params![row.id, row.name, row.state, row.modified],
    )?;
    Ok(inserted > 0)
}

pub fn upsert_authority(conn: &Connection, row: &AuthorityRow) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO latest_entry_data (id, name, state, modified)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (id)
         DO UPDATE SET name = excluded.name, state = excluded.state, modified = excluded.modified",
        params![row.id, row.name, row.state, row.modified],
    )?;
    Ok(())
}
