//! Async SQLite executor on a dedicated background thread.
//!
//! Every query is sent to one SQLite thread through `tokio_rusqlite`, so
//! callers await results without blocking runtime workers and queries run in
//! FIFO order. Only SQL and light row mapping belong inside [`AsyncDatabase::call`].

use crate::{migrations, DatabaseError, DatabaseResult};
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

fn from_tokio_rusqlite(e: tokio_rusqlite::Error) -> DatabaseError {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => DatabaseError::Sqlite(e),
        tokio_rusqlite::Error::Close(_) => DatabaseError::Connection("Connection closed".to_string()),
        other => DatabaseError::Connection(other.to_string()),
    }
}

/// Handle to the SQLite executor. Cheap to clone.
#[derive(Clone)]
pub struct AsyncDatabase {
    conn: Connection,
    path: String,
}

impl AsyncDatabase {
    /// Open (or create) the database file, apply pragmas and run pending
    /// migrations.
    pub async fn open(path: &Path) -> DatabaseResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy().to_string();
        info!(path = %path_str, "Opening favorites database");

        let conn = Connection::open(path_str.clone())
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        conn.call(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA temp_store = MEMORY;
                PRAGMA busy_timeout = 5000;
                ",
            )?;
            Ok(())
        })
        .await
        .map_err(from_tokio_rusqlite)?;

        let db = Self {
            conn,
            path: path_str,
        };
        db.call(migrations::run_migrations).await?;

        info!(path = %db.path, "Favorites database ready");
        Ok(db)
    }

    /// Run `f` on the SQLite thread and return its result.
    pub async fn call<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DatabaseResult<T> + Send + 'static,
        T: Send + 'static,
    {
        // The closure's own result travels inside tokio_rusqlite's Ok so that
        // domain errors are not squeezed through rusqlite::Error.
        let outer = self.conn.call(move |conn| Ok(f(conn))).await;
        match outer {
            Ok(inner) => inner,
            Err(e) => Err(from_tokio_rusqlite(e)),
        }
    }

    /// Like [`call`](Self::call) for closures producing plain rusqlite errors.
    pub async fn call_sqlite<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn| Ok(f(conn)?))
            .await
            .map_err(from_tokio_rusqlite)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn health_check(&self) -> DatabaseResult<()> {
        self.call_sqlite(|conn| conn.execute_batch("SELECT 1")).await?;
        debug!("Database health check passed");
        Ok(())
    }

    /// Wait for queued work, then stop the executor thread.
    pub async fn close(self) -> DatabaseResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to close database: {:?}", e)))?;
        info!(path = %self.path, "Database closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_runs_migrations() {
        let dir = tempdir().unwrap();
        let db = AsyncDatabase::open(&dir.path().join("favorites.sqlite"))
            .await
            .unwrap();
        assert!(db.health_check().await.is_ok());

        let version: i32 = db
            .call_sqlite(|conn| {
                conn.query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(version, migrations::CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("favorites.sqlite");
        let db = AsyncDatabase::open(&path).await.unwrap();
        db.close().await.unwrap();

        let db = AsyncDatabase::open(&path).await.unwrap();
        let count: i64 = db
            .call_sqlite(|conn| conn.query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(count, migrations::CURRENT_VERSION as i64);
    }

    #[tokio::test]
    async fn test_concurrent_writes() {
        let dir = tempdir().unwrap();
        let db = AsyncDatabase::open(&dir.path().join("favorites.sqlite"))
            .await
            .unwrap();

        let mut handles = vec![];
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.call_sqlite(move |conn| {
                    conn.execute(
                        "INSERT INTO latest_entry_data (id, name, state, modified) VALUES (?1, ?2, NULL, '2024-01-01T00:00:00Z')",
                        rusqlite::params![format!("c-{}", i), "name"],
                    )
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let count: i64 = db
            .call(|conn| {
                conn.query_row("SELECT COUNT(*) FROM latest_entry_data", [], |row| row.get(0))
                    .map_err(DatabaseError::from)
            })
            .await
            .unwrap();
        assert_eq!(count, 10);
    }
}
