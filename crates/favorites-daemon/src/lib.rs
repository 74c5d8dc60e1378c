//! Favorites daemon.
//!
//! Wires the list and sync engines to their outer surfaces:
//!
//! - [`FavoritesService`]: the operations exposed to the binding layer,
//!   including people id resolution and authority seeding on create
//! - [`RedisEventConsumer`] + [`EventLoop`]: lifecycle events from the
//!   Redis feed, applied one at a time
//! - [`RedisAuditPublisher`]: fire-and-forget audit fan-out
//! - [`BackgroundTasks`]: detached work a one-shot command drains on exit

mod audit_publisher;
mod background;
mod error;
mod event_loop;
mod redis_consumer;
mod service;

pub use audit_publisher::{audit_queues, AuditEvent, RedisAuditPublisher};
pub use background::BackgroundTasks;
pub use error::{ConsumerError, ConsumerResult};
pub use event_loop::{EventLoop, EventSource};
pub use redis_consumer::{ConsumerSettings, RedisEventConsumer};
pub use service::{Caller, EntryList, FavoritesService};
