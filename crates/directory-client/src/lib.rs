//! Client for the people directory.
//!
//! The directory answers three questions:
//! - who is the person with this external id (profile key and telephone data),
//! - what are the current name, email and state of these profile keys,
//! - which profile keys belong to these external ids.
//!
//! [`PeopleDirectory`] is the seam the engines depend on;
//! [`HttpPeopleDirectory`] talks to the real service and
//! [`StaticDirectory`] serves canned answers in tests.

mod error;
mod http;
mod static_directory;
mod types;

#[cfg(test)]
mod test_server;

pub use error::{DirectoryError, DirectoryResult};
pub use http::{DirectoryConfig, HttpPeopleDirectory};
pub use static_directory::StaticDirectory;
pub use types::{
    AuthHeaders, BulkProfile, BulkProfiles, IdMapping, MappedId, PeopleDirectory, ProfileLookup,
    UnmappedId,
};
