//! Main event loop: pop, apply to completion, pop again.

use crate::error::{ConsumerError, ConsumerResult};
use async_trait::async_trait;
use favorites_sync_engine::{EventOutcome, LifecycleEvent, SyncEngine};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A blocking source of raw event payloads.
#[async_trait]
pub trait EventSource: Send {
    /// Wait for the next payload. `None` means the wait timed out.
    async fn next_event(&mut self) -> ConsumerResult<Option<String>>;

    /// Re-establish the transport after an error.
    async fn reconnect(&mut self) -> ConsumerResult<()>;
}

pub struct EventLoop<S: EventSource> {
    source: S,
    sync: Arc<SyncEngine>,
    retry_delay: Duration,
}

impl<S: EventSource> EventLoop<S> {
    pub fn new(source: S, sync: Arc<SyncEngine>) -> Self {
        Self {
            source,
            sync,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Pause between a transport error and the reconnect attempt.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Run until the task is dropped.
    ///
    /// Transport errors trigger a reconnect; errors applying an event are
    /// logged and the event is dropped.
    pub async fn run(&mut self) -> ConsumerResult<()> {
        info!("Starting lifecycle event loop");
        loop {
            if let Err(e) = self.process_one().await {
                self.recover(e).await;
            }
        }
    }

    /// Pop and apply one event. `Ok(None)` when the pop timed out.
    pub async fn process_one(&mut self) -> ConsumerResult<Option<EventOutcome>> {
        let Some(raw) = self.source.next_event().await? else {
            debug!("No events available, continuing to poll...");
            return Ok(None);
        };

        let event = LifecycleEvent::parse(&raw);
        let kind = event.kind();
        let outcome = self.sync.handle_event(event).await?;
        info!(kind, outcome = ?outcome, "Event processed");
        Ok(Some(outcome))
    }

    async fn recover(&mut self, e: ConsumerError) {
        error!(error = %e, "Error processing event");
        match e {
            ConsumerError::Redis(_) | ConsumerError::Protocol(_) => {
                warn!("Event feed error, attempting to reconnect...");
                tokio::time::sleep(self.retry_delay).await;
                if let Err(reconnect_err) = self.source.reconnect().await {
                    error!(error = %reconnect_err, "Failed to reconnect to event feed");
                    tokio::time::sleep(self.retry_delay * 5).await;
                }
            }
            ConsumerError::Sync(_) => {
                tokio::time::sleep(self.retry_delay / 10).await;
            }
        }
    }
}
