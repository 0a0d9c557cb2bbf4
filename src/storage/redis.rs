//! Redis-backed store.
//!
//! Commands go over a shared multiplexed connection; each subscription
//! opens its own pub/sub connection, mirroring how the rest of the BAP
//! network deploys this façade (replicas share nothing in-process).

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::{Store, StoreError, Subscription};

/// Store implementation over a remote Redis.
pub struct RedisStore {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect and verify the server responds to PING.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|err| StoreError::Connection(err.to_string()))?;
        let mut conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;

        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;

        Ok(Self { client, conn })
    }
}

fn backend(err: redis::RedisError) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl Store for RedisStore {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key, value, ttl.as_secs())
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(backend)
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(backend)?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.keys(pattern).await.map_err(backend)
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        let subscribers: i64 = conn.publish(channel, payload).await.map_err(backend)?;
        Ok(subscribers.max(0) as usize)
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        // A dedicated connection per subscription; SUBSCRIBE is awaited, so
        // the subscription is acknowledged before the caller dispatches.
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;
        pubsub.subscribe(channel).await.map_err(backend)?;

        let stream = pubsub
            .into_on_message()
            .map(|msg| msg.get_payload::<Vec<u8>>().unwrap_or_default());
        Ok(Subscription::new(stream))
    }
}
