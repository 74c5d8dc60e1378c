//! Lifecycle events from the event feed.
//!
//! Payloads are parsed into a closed set of variants. Anything unknown or
//! malformed becomes [`LifecycleEvent::Ignored`] and is acknowledged without
//! side effects.

use serde::Deserialize;

pub const COMMUNITY_UPDATED: &str = "community.updated";
pub const COMMUNITY_DELETED: &str = "community.deleted";
pub const COMMUNITY_RESTORED: &str = "community.restored";
pub const MEMBERSHIP_ADDED: &str = "community.membership.added";
pub const MEMBERSHIP_REMOVED: &str = "community.membership.removed";
pub const NOTIFY_MEMBER_ADD: &str = "communities.notification.memberadd";
pub const NOTIFY_MEMBER_REMOVE: &str = "communities.notification.memberremove";

const PUBLIC_SCOPE: &str = "PUBLIC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    CommunityUpdated {
        community_id: String,
        name: Option<String>,
    },
    CommunityDeleted {
        community_id: String,
    },
    CommunityRestored {
        community_id: String,
    },
    Membership {
        change: MembershipChange,
        community_id: String,
        /// External ids of the affected people.
        target_people: Vec<String>,
        scope: Option<String>,
    },
    Ignored {
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    object: Option<RawObject>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(rename = "targetingData", default)]
    targeting_data: Option<RawTargeting>,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTargeting {
    #[serde(rename = "targetPeople", default)]
    target_people: Vec<String>,
}

/// Strip CR/LF and escaped single quotes from a raw payload.
pub fn sanitize(raw: &str) -> String {
    raw.replace(['\r', '\n'], "").replace("\\'", "")
}

impl LifecycleEvent {
    pub fn parse(raw: &str) -> Self {
        let event: RawEvent = match serde_json::from_str(&sanitize(raw)) {
            Ok(event) => event,
            Err(e) => {
                return Self::Ignored {
                    reason: format!("malformed event: {}", e),
                }
            }
        };
        let Some(name) = event.name else {
            return Self::ignored("event has no name");
        };
        let (community_id, object_name) = match event.object {
            Some(RawObject { id: Some(id), name }) if !id.is_empty() => (id, name),
            _ => return Self::ignored(format!("{} has no object id", name)),
        };

        let membership = |change| Self::Membership {
            change,
            community_id: community_id.clone(),
            target_people: event
                .targeting_data
                .as_ref()
                .map(|t| t.target_people.clone())
                .unwrap_or_default(),
            scope: event.scope.clone(),
        };

        match name.as_str() {
            COMMUNITY_UPDATED => Self::CommunityUpdated {
                community_id: community_id.clone(),
                name: object_name,
            },
            COMMUNITY_DELETED => Self::CommunityDeleted {
                community_id: community_id.clone(),
            },
            COMMUNITY_RESTORED => Self::CommunityRestored {
                community_id: community_id.clone(),
            },
            MEMBERSHIP_ADDED | NOTIFY_MEMBER_ADD => membership(MembershipChange::Added),
            MEMBERSHIP_REMOVED | NOTIFY_MEMBER_REMOVE => membership(MembershipChange::Removed),
            other => Self::ignored(format!("unhandled event {}", other)),
        }
    }

    fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored {
            reason: reason.into(),
        }
    }

    /// A member removed from a public community keeps read access.
    pub fn is_public_removal(&self) -> bool {
        matches!(
            self,
            Self::Membership {
                change: MembershipChange::Removed,
                scope: Some(scope),
                ..
            } if scope == PUBLIC_SCOPE
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::CommunityUpdated { .. } => "community_updated",
            Self::CommunityDeleted { .. } => "community_deleted",
            Self::CommunityRestored { .. } => "community_restored",
            Self::Membership {
                change: MembershipChange::Added,
                ..
            } => "membership_added",
            Self::Membership {
                change: MembershipChange::Removed,
                ..
            } => "membership_removed",
            Self::Ignored { .. } => "ignored",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_notification_alias_with_sanitizing() {
        let raw = "{\"name\": \"communities.notification.memberremove\",\r\n \"object\": {\"id\": \"c-1\", \"name\": \"G\\'s\"},\n \"scope\": \"PUBLIC\", \"targetingData\": {\"targetPeople\": [\"e1\", \"e2\"]}}";
        let event = LifecycleEvent::parse(raw);
        assert!(event.is_public_removal());
        match event {
            LifecycleEvent::Membership {
                change,
                community_id,
                target_people,
                ..
            } => {
                assert_eq!(change, MembershipChange::Removed);
                assert_eq!(community_id, "c-1");
                assert_eq!(target_people, vec!["e1", "e2"]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn parses_community_events() {
        let event = LifecycleEvent::parse(r#"{"name":"community.updated","object":{"id":"c-1","name":"Guild"}}"#);
        assert_eq!(
            event,
            LifecycleEvent::CommunityUpdated {
                community_id: "c-1".into(),
                name: Some("Guild".into())
            }
        );
        let event = LifecycleEvent::parse(r#"{"name":"community.deleted","object":{"id":"c-1"}}"#);
        assert_eq!(event.kind(), "community_deleted");
    }

    #[test]
    fn unknown_or_malformed_is_ignored() {
        for raw in [
            "not json",
            r#"{"name":"community.created","object":{"id":"c-1"}}"#,
            r#"{"name":"community.deleted"}"#,
            r#"{"object":{"id":"c-1"}}"#,
        ] {
            assert_eq!(LifecycleEvent::parse(raw).kind(), "ignored", "{raw}");
        }
    }

    #[test]
    fn private_removal_is_not_public() {
        let event = LifecycleEvent::parse(
            r#"{"name":"community.membership.removed","object":{"id":"c-1"},"scope":"PRIVATE"}"#,
        );
        assert!(!event.is_public_removal());
        assert_eq!(event.kind(), "membership_removed");
    }

    #[test]
    fn sanitize_strips_line_breaks_and_escaped_quotes() {
        assert_eq!(sanitize("a\r\nb\\'c"), "abc");
    }
}
