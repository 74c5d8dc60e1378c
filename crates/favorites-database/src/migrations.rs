//! Schema migrations, tracked in the `migrations` table.

use crate::DatabaseResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> DatabaseResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_profiles(conn)?;
    }
    if current_version < 2 {
        migrate_v2_latest_entry_data(conn)?;
    }

    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: one row per (user, org) holding the ordered entry list as JSON.
fn migrate_v1_profiles(conn: &Connection) -> DatabaseResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            user_id TEXT NOT NULL,
            org_id TEXT NOT NULL,
            document TEXT NOT NULL DEFAULT '[]',
            modified TEXT NOT NULL,
            PRIMARY KEY (user_id, org_id)
        );
        ",
    )?;
    record_migration(conn, 1, "profiles")
}

/// V2: authority cache for community names and delete state.
fn migrate_v2_latest_entry_data(conn: &Connection) -> DatabaseResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS latest_entry_data (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT,
            state TEXT,
            modified TEXT NOT NULL
        );
        ",
    )?;
    record_migration(conn, 2, "latest_entry_data")
}
