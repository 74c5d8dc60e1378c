//! Data model for per-user favorites lists.
//!
//! # Overview
//!
//! - [`Entry`]: a single reference to a person, community or other object.
//! - [`StateSet`]: the ordered set of state flags an entry carries.
//! - [`ProfileDocument`]: one user's ordered list of entries, with the
//!   positional insert/update/move/delete operations.
//! - [`AuthorityRecord`]: the latest known name and delete state of a
//!   community, kept independently of any document.
//!
//! Everything in this crate is synchronous and free of I/O.

mod authority;
mod document;
mod entry;
mod error;
mod state;
mod target;
pub mod validation;

pub use authority::AuthorityRecord;
pub use document::{DeleteReport, MoveOutcome, MoveSource, ProfileDocument, ProfileKey};
pub use entry::{Entry, EntryType, Image, Metadata};
pub use error::{DocumentError, DocumentResult};
pub use state::{StateFlag, StateSet};
pub use target::{Target, TAIL_SENTINEL};
pub use validation::{ValidationFailure, ValidationFailures};
