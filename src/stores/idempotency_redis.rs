//! Redis-based idempotency store implementation.
//!
//! One key per `(user, client key)` pair, written with `SET NX EX`: the
//! write and the duplicate check are a single Redis command, so two racing
//! requests with the same key resolve to exactly one winner.

use crate::error::{ChatError, Result};
use crate::providers::IdempotencyStore;
use crate::state::UserId;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Redis-based idempotency store.
#[derive(Clone)]
pub struct RedisIdempotencyStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisIdempotencyStore {
    /// Create a new Redis idempotency store.
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            ChatError::StorageUnavailable(format!("failed to create Redis client: {e}"))
        })?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            ChatError::StorageUnavailable(format!(
                "failed to create Redis connection manager: {e}"
            ))
        })?;

        Ok(Self { conn_manager })
    }

    fn record_key(user_id: UserId, client_key: &str) -> String {
        format!("idempotency:{}:{client_key}", user_id.0)
    }
}

impl IdempotencyStore for RedisIdempotencyStore {
    async fn set_if_absent(&self, user_id: UserId, client_key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let key = Self::record_key(user_id, client_key);

        // SET NX EX returns OK when the key was written, nil when it already
        // existed.
        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                ChatError::StorageUnavailable(format!("failed to write idempotency record: {e}"))
            })?;

        let claimed = reply.is_some();
        tracing::debug!(
            user_id = %user_id.0,
            client_key = %client_key,
            claimed = claimed,
            "Idempotency record check"
        );

        Ok(claimed)
    }

    async fn remove(&self, user_id: UserId, client_key: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let key = Self::record_key(user_id, client_key);

        let _: () = conn.del(&key).await.map_err(|e| {
            ChatError::StorageUnavailable(format!("failed to delete idempotency record: {e}"))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require a running Redis instance
    // Run with: docker run -d -p 6379:6379 redis:7-alpine

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_second_write_is_rejected_until_removed() {
        let store = RedisIdempotencyStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();

        let user = UserId::new();
        let key = format!("test:{}", uuid::Uuid::new_v4());

        assert!(store
            .set_if_absent(user, &key, Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!store
            .set_if_absent(user, &key, Duration::from_secs(60))
            .await
            .unwrap());

        store.remove(user, &key).await.unwrap();
        assert!(store
            .set_if_absent(user, &key, Duration::from_secs(60))
            .await
            .unwrap());

        // Cleanup
        store.remove(user, &key).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_record_expires_with_ttl() {
        let store = RedisIdempotencyStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();

        let user = UserId::new();
        let key = format!("test:{}", uuid::Uuid::new_v4());

        assert!(store
            .set_if_absent(user, &key, Duration::from_secs(1))
            .await
            .unwrap());

        tokio::time::sleep(tokio::time::Duration::from_millis(1500)).await;

        assert!(store
            .set_if_absent(user, &key, Duration::from_secs(60))
            .await
            .unwrap());

        // Cleanup
        store.remove(user, &key).await.unwrap();
    }
}
