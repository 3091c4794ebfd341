//! Redis Streams publisher.
//!
//! Handles XADD against the configured stream. The stream itself is
//! created by the first XADD; consumers attach their own groups.

use crate::error::{RelayError, RelayResult};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;
use std::sync::Mutex;
use tracing::{debug, info};

/// What the relay needs from a message broker.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Publish one payload. An error leaves the corresponding record unsent.
    async fn publish(&self, payload: &[u8]) -> RelayResult<()>;

    /// Re-establish the transport after a failure. No-op by default.
    async fn reconnect(&self) -> RelayResult<()> {
        Ok(())
    }

    /// Close the transport. Further publishes must fail.
    async fn close(&self) -> RelayResult<()>;
}

/// Redis Streams publisher.
pub struct RedisPublisher {
    client: Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    stream_key: String,
}

impl RedisPublisher {
    /// Connect to Redis.
    ///
    /// A failure here is fatal to relay startup.
    pub async fn connect(url: &str, stream_key: &str) -> RelayResult<Self> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;

        info!(stream = %stream_key, "Connected to Redis");

        Ok(Self {
            client,
            conn: Mutex::new(Some(conn)),
            stream_key: stream_key.to_string(),
        })
    }

    /// Get the stream key this publisher writes to.
    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    fn connection(&self) -> RelayResult<MultiplexedConnection> {
        self.conn
            .lock()
            .expect("connection lock poisoned")
            .clone()
            .ok_or(RelayError::BrokerClosed)
    }
}

#[async_trait]
impl Broker for RedisPublisher {
    async fn publish(&self, payload: &[u8]) -> RelayResult<()> {
        let mut conn = self.connection()?;

        // XADD <stream> * payload <bytes>
        let entry_id: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg("payload")
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        debug!(
            stream = %self.stream_key,
            entry_id = %entry_id,
            payload_len = payload.len(),
            "Published message to stream"
        );

        Ok(())
    }

    async fn reconnect(&self) -> RelayResult<()> {
        info!("Reconnecting to Redis...");
        let conn = self.client.get_multiplexed_async_connection().await?;

        let mut guard = self.conn.lock().expect("connection lock poisoned");
        if guard.is_none() {
            // close() won the race; stay closed
            return Err(RelayError::BrokerClosed);
        }
        *guard = Some(conn);

        info!("Reconnected to Redis");
        Ok(())
    }

    async fn close(&self) -> RelayResult<()> {
        let conn = self.conn.lock().expect("connection lock poisoned").take();
        if conn.is_some() {
            info!(stream = %self.stream_key, "Closed Redis publisher");
        }
        Ok(())
    }
}
