//! Persistence for profile documents and the community authority cache.
//!
//! This crate provides:
//! - [`AsyncDatabase`]: SQLite on a dedicated executor thread
//! - Versioned schema migrations
//! - The [`ProfileStore`] and [`AuthorityStore`] traits the engines talk to
//! - [`SqliteStore`], the production implementation of both traits
//! - [`MemoryStore`], an in-process implementation used by tests
//!
//! ```ignore
//! let db = AsyncDatabase::open(&paths.database_file()).await?;
//! let store = SqliteStore::new(db);
//! let doc = store.find_or_create(&key).await?;
//! ```
//!
//! **Important**: Only SQL runs inside `db.call()`. JSON encoding of
//! documents happens before and after the call.

mod error;
mod executor;
mod memory;
mod migrations;
pub mod queries;
mod sqlite;
mod store;

pub use error::{DatabaseError, DatabaseResult};
pub use executor::AsyncDatabase;
pub use memory::MemoryStore;
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use sqlite::SqliteStore;
pub use store::{AuthorityStore, ProfileStore};
