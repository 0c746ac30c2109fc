//! Redis-based push subscription store implementation.
//!
//! # Architecture
//!
//! - **Token key**: `push:token:{user_id}:{channel}` → token string, with
//!   the registration TTL
//! - **Channel index**: `push:channels:{user_id}` (Set) → channel names,
//!   with a TTL one day past the token TTL
//!
//! The token key expiring is what unsubscribes a channel; `channels` prunes
//! index entries whose token key is gone.

use crate::error::{ChatError, Result};
use crate::providers::PushSubscriptionStore;
use crate::state::UserId;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Redis-based push subscription store.
#[derive(Clone)]
pub struct RedisPushSubscriptionStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisPushSubscriptionStore {
    /// Create a new Redis push subscription store.
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

    fn token_key(user_id: UserId, channel: &str) -> String {
        format!("push:token:{}:{channel}", user_id.0)
    }

    fn channels_key(user_id: UserId) -> String {
        format!("push:channels:{}", user_id.0)
    }
}

impl PushSubscriptionStore for RedisPushSubscriptionStore {
    async fn save_token(
        &self,
        user_id: UserId,
        channel: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let token_key = Self::token_key(user_id, channel);
        let channels_key = Self::channels_key(user_id);

        let ttl_seconds = ttl.as_secs();
        // The index must outlive every token it references; +1 day buffer so
        // pruning in `channels` is the normal cleanup path, the index TTL the
        // backstop.
        #[allow(clippy::cast_possible_wrap)]
        let index_ttl_seconds = (ttl_seconds + 86_400) as i64;

        let _: () = redis::pipe()
            .atomic()
            .set_ex(&token_key, token, ttl_seconds)
            .sadd(&channels_key, channel)
            .ignore()
            .expire(&channels_key, index_ttl_seconds)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                ChatError::StorageUnavailable(format!("failed to save push token: {e}"))
            })?;

        tracing::info!(
            user_id = %user_id.0,
            channel = %channel,
            ttl_seconds = ttl_seconds,
            "Registered push token"
        );

        Ok(())
    }

    async fn remove_token(&self, user_id: UserId, channel: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let token_key = Self::token_key(user_id, channel);
        let channels_key = Self::channels_key(user_id);

        let _: () = redis::pipe()
            .atomic()
            .del(&token_key)
            .ignore()
            .srem(&channels_key, channel)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                ChatError::StorageUnavailable(format!("failed to remove push token: {e}"))
            })?;

        tracing::info!(
            user_id = %user_id.0,
            channel = %channel,
            "Removed push token"
        );

        Ok(())
    }

    async fn channels(&self, user_id: UserId) -> Result<Vec<String>> {
        let mut conn = self.conn_manager.clone();
        let channels_key = Self::channels_key(user_id);

        let names: Vec<String> = conn.smembers(&channels_key).await.map_err(|e| {
            ChatError::StorageUnavailable(format!("failed to read push channels: {e}"))
        })?;

        // Prune index entries whose token key has expired.
        let mut live = Vec::new();
        for name in names {
            let exists: bool = conn
                .exists(Self::token_key(user_id, &name))
                .await
                .map_err(|e| {
                    ChatError::StorageUnavailable(format!("failed to check push token: {e}"))
                })?;

            if exists {
                live.push(name);
            } else {
                let _: () = conn.srem(&channels_key, &name).await.unwrap_or_else(|e| {
                    tracing::warn!(
                        user_id = %user_id.0,
                        channel = %name,
                        error = %e,
                        "Failed to clean up expired channel entry"
                    );
                });
            }
        }

        live.sort();
        Ok(live)
    }

    async fn token(&self, user_id: UserId, channel: &str) -> Result<Option<String>> {
        let mut conn = self.conn_manager.clone();
        let token_key = Self::token_key(user_id, channel);

        let token: Option<String> = conn.get(&token_key).await.map_err(|e| {
            ChatError::StorageUnavailable(format!("failed to read push token: {e}"))
        })?;

        Ok(token)
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
    async fn test_token_lifecycle() {
        let store = RedisPushSubscriptionStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();

        let user = UserId::new();

        store
            .save_token(user, "mobile", "tok-mobile", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .save_token(user, "web", "tok-web", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            store.channels(user).await.unwrap(),
            vec!["mobile".to_string(), "web".to_string()]
        );
        assert_eq!(
            store.token(user, "mobile").await.unwrap(),
            Some("tok-mobile".to_string())
        );

        store.remove_token(user, "mobile").await.unwrap();
        assert_eq!(store.channels(user).await.unwrap(), vec!["web".to_string()]);
        assert_eq!(store.token(user, "mobile").await.unwrap(), None);

        // Cleanup
        store.remove_token(user, "web").await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_expired_token_is_pruned_from_channels() {
        let store = RedisPushSubscriptionStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();

        let user = UserId::new();

        store
            .save_token(user, "mobile", "tok", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(store.channels(user).await.unwrap().len(), 1);

        tokio::time::sleep(tokio::time::Duration::from_millis(1500)).await;

        assert!(store.channels(user).await.unwrap().is_empty());
        assert_eq!(store.token(user, "mobile").await.unwrap(), None);
    }
}
