//! Keeps favorites display data in step with its systems of record.
//!
//! Two paths feed changes into profile documents:
//!
//! - **Lazy refresh on read.** Expired community entries are refreshed from
//!   the authority cache; expired people entries from the people directory.
//!   The refreshed view is returned immediately and folded back into the full
//!   document by a detached task.
//! - **Event reconciliation.** Community lifecycle events update the
//!   authority cache; membership events toggle `NOACCESS` on the matching
//!   community entry of each affected user.

mod cache;
mod error;
mod events;
mod reconcile;
mod refresh;

pub use cache::{apply_change, merge_into_entry, CommunityChange};
pub use error::{SyncError, SyncResult};
pub use events::{sanitize, LifecycleEvent, MembershipChange};
pub use reconcile::EventOutcome;
pub use refresh::RefreshOutcome;

use directory_client::PeopleDirectory;
use favorites_database::{AuthorityStore, ProfileStore};
use std::sync::Arc;
use std::time::Duration;

/// Switches and timing for both sync paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// How long a synced entry stays fresh.
    pub ttl: Duration,
    /// Refresh people entries from the directory on read.
    pub sync_people_changes: bool,
    /// Apply membership events to entry ACL flags.
    pub communities_acl_sync: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            sync_people_changes: false,
            communities_acl_sync: true,
        }
    }
}

pub struct SyncEngine {
    profiles: Arc<dyn ProfileStore>,
    authority: Arc<dyn AuthorityStore>,
    directory: Arc<dyn PeopleDirectory>,
    settings: SyncSettings,
}

impl SyncEngine {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        authority: Arc<dyn AuthorityStore>,
        directory: Arc<dyn PeopleDirectory>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            profiles,
            authority,
            directory,
            settings,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }
}
