//! Audit fan-out over Redis.
//!
//! Every group registered in the subscriptions hash (except this service)
//! gets its own copy of each event on `<channel>.<group>`.

use crate::background::BackgroundTasks;
use chrono::{DateTime, Utc};
use favorites_list_engine::{AuditRecord, AuditSink};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditActor {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl AuditActor {
    fn id_only(id: String) -> Self {
        Self {
            id,
            name: None,
            email: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditObject {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: String,
    pub attributed_to: Vec<AuditActor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditOrganization {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditOrigin {
    pub id: String,
    pub organization: AuditOrganization,
}

/// Wire shape of an audit event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Milliseconds since the epoch, as a string.
    pub start_time: String,
    pub actor: AuditActor,
    pub object: AuditObject,
    pub origin: AuditOrigin,
}

impl AuditEvent {
    pub fn from_record(record: &AuditRecord, at: DateTime<Utc>) -> Self {
        let actor = &record.actor;
        let user_id = actor.key.user_id.clone();
        Self {
            id: Uuid::new_v4().to_string(),
            name: record.action.event_name().to_string(),
            event_type: record.action.event_type().to_string(),
            start_time: at.timestamp_millis().to_string(),
            actor: AuditActor {
                id: user_id.clone(),
                name: actor.name.clone(),
                email: actor.email.clone(),
            },
            object: AuditObject {
                id: record.entry_id.clone(),
                name: record.entry_name.clone(),
                object_type: record.entry_type.clone(),
                attributed_to: vec![AuditActor::id_only(user_id.clone())],
            },
            origin: AuditOrigin {
                id: user_id,
                organization: AuditOrganization {
                    id: actor.key.org_id.clone(),
                },
            },
        }
    }
}

/// Queue names for every registered group except `own`.
pub fn audit_queues(groups: &[String], own: &str, channel: &str) -> Vec<String> {
    groups
        .iter()
        .filter(|group| group.as_str() != own)
        .map(|group| format!("{}.{}", channel, group))
        .collect()
}

/// [`AuditSink`] that publishes from a detached task.
#[derive(Clone)]
pub struct RedisAuditPublisher {
    conn: MultiplexedConnection,
    subscriptions_hash: String,
    registration_name: String,
    channel: String,
    tasks: Arc<BackgroundTasks>,
}

impl RedisAuditPublisher {
    pub fn new(
        conn: MultiplexedConnection,
        subscriptions_hash: impl Into<String>,
        registration_name: impl Into<String>,
        channel: impl Into<String>,
        tasks: Arc<BackgroundTasks>,
    ) -> Self {
        Self {
            conn,
            subscriptions_hash: subscriptions_hash.into(),
            registration_name: registration_name.into(),
            channel: channel.into(),
            tasks,
        }
    }

    async fn publish(mut self, event: AuditEvent) {
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to serialize audit event");
                return;
            }
        };
        let groups: Vec<String> = match self.conn.hkeys(&self.subscriptions_hash).await {
            Ok(groups) => groups,
            Err(e) => {
                error!(hash = %self.subscriptions_hash, error = %e, "HKEYS failed");
                return;
            }
        };

        for queue in audit_queues(&groups, &self.registration_name, &self.channel) {
            let pushed: redis::RedisResult<i64> = self.conn.lpush(&queue, &payload).await;
            match pushed {
                Ok(_) => debug!(queue = %queue, event = %event.name, id = %event.id, "Audit event published"),
                Err(e) => error!(queue = %queue, error = %e, "LPUSH failed"),
            }
        }
    }
}

impl AuditSink for RedisAuditPublisher {
    fn emit(&self, record: AuditRecord) {
        let event = AuditEvent::from_record(&record, Utc::now());
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                self.tasks.track(handle.spawn(self.clone().publish(event)));
            }
            Err(_) => warn!(event = %event.name, "No runtime, dropping audit event"),
        }
    }
}
