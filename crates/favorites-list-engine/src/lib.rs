//! Positional favorites list operations.
//!
//! [`ListEngine`] validates and applies writes to a user's
//! [`ProfileDocument`](favorites_model::ProfileDocument) and persists the
//! whole document afterwards. [`PagingView`] turns a document into the
//! filtered, paginated page a reader sees.
//!
//! # Write path
//!
//! 1. Validate the entry and target ids
//! 2. Load the document and apply the positional change
//! 3. Persist the whole document
//! 4. Emit an audit record (visible entries only)
//!
//! A failure in steps 1 to 3 leaves the stored document untouched.

mod audit;
mod engine;
mod error;
mod paging;

pub use audit::{Actor, AuditAction, AuditRecord, AuditSink, NullSink, RecordingSink};
pub use engine::{DeleteSummary, ListEngine, Written};
pub use error::{EntryError, EntryResult, ValidationCode};
pub use paging::{ListQuery, Page, PagingView};
