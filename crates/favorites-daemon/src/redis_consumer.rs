//! Redis list consumer for lifecycle events.
//!
//! Registers this service in the subscriptions hash and pops events with
//! BLPOP.

use crate::error::{ConsumerError, ConsumerResult};
use crate::event_loop::EventSource;
use async_trait::async_trait;
use favorites_config::Config;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::{debug, info};

/// Where and how to consume events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSettings {
    pub redis_url: String,
    /// List the feed pushes events onto.
    pub events_list: String,
    /// Hash of registered consumer groups.
    pub subscriptions_hash: String,
    /// This service's field in the subscriptions hash.
    pub registration_name: String,
    /// BLPOP timeout.
    pub block_timeout: Duration,
}

impl ConsumerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            redis_url: config.redis_url.clone(),
            events_list: config.events_list.clone(),
            subscriptions_hash: config.subscriptions_hash.clone(),
            registration_name: config.registration_name.clone(),
            block_timeout: config.event_block_timeout(),
        }
    }
}

pub struct RedisEventConsumer {
    client: Client,
    conn: MultiplexedConnection,
    settings: ConsumerSettings,
}

impl RedisEventConsumer {
    /// Connect and register with the event feed.
    pub async fn connect(settings: ConsumerSettings) -> ConsumerResult<Self> {
        let client = Client::open(settings.redis_url.as_str())?;
        let conn = client.get_multiplexed_async_connection().await?;

        let mut consumer = Self {
            client,
            conn,
            settings,
        };
        consumer.register().await?;
        Ok(consumer)
    }

    /// HSET this service's registration name into the subscriptions hash.
    async fn register(&mut self) -> ConsumerResult<()> {
        let _: () = self
            .conn
            .hset(
                &self.settings.subscriptions_hash,
                &self.settings.registration_name,
                "",
            )
            .await?;
        info!(
            hash = %self.settings.subscriptions_hash,
            name = %self.settings.registration_name,
            "Registered with event feed"
        );
        Ok(())
    }

    pub fn settings(&self) -> &ConsumerSettings {
        &self.settings
    }
}

#[async_trait]
impl EventSource for RedisEventConsumer {
    async fn next_event(&mut self) -> ConsumerResult<Option<String>> {
        let timeout = self.settings.block_timeout.as_secs_f64();
        let popped: Option<(String, String)> = self
            .conn
            .blpop(&self.settings.events_list, timeout)
            .await?;

        match popped {
            Some((list, payload)) if list == self.settings.events_list => {
                debug!(list = %list, payload_len = payload.len(), "Popped event");
                Ok(Some(payload))
            }
            Some((list, _)) => Err(ConsumerError::Protocol(format!(
                "BLPOP answered from unexpected list {}",
                list
            ))),
            None => Ok(None),
        }
    }

    async fn reconnect(&mut self) -> ConsumerResult<()> {
        info!("Reconnecting to Redis...");
        self.conn = self.client.get_multiplexed_async_connection().await?;
        self.register().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let config = Config::default();
        let settings = ConsumerSettings::from_config(&config);

        assert_eq!(settings.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(settings.events_list, "events.favorites");
        assert_eq!(settings.subscriptions_hash, "events.subscriptions");
        assert_eq!(settings.registration_name, "favorites");
        assert_eq!(settings.block_timeout, Duration::from_secs(5));
    }
}
