//! Redis-based presence store implementation.
//!
//! # Architecture
//!
//! Presence is stored in Redis with:
//! - **Session set**: `presence:sessions:{user_id}` (Set) → live session IDs,
//!   with a TTL refreshed on every registration
//! - **Online index**: `presence:online` (Set) → user IDs with at least one
//!   session
//!
//! Register and remove run as Lua scripts so the membership change and the
//! resulting session count are observed atomically; the edge decision made
//! from the returned count is race-free across concurrent sessions of the
//! same user.

use crate::error::{ChatError, Result};
use crate::providers::{PresenceStore, SessionRegistration, SessionRemoval};
use crate::state::{SessionId, UserId};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::collections::HashSet;
use std::time::Duration;

/// Atomically add a session, refresh the set TTL, and maintain the online
/// index. Returns `{newly_added, session_count}`.
const REGISTER_SCRIPT: &str = r"
    local added = redis.call('SADD', KEYS[1], ARGV[1])
    redis.call('EXPIRE', KEYS[1], ARGV[2])
    local count = redis.call('SCARD', KEYS[1])
    redis.call('SADD', KEYS[2], ARGV[3])
    return {added, count}
";

/// Atomically remove a session and drop the user from the online index when
/// the set empties. Returns `{removed, session_count}`.
const REMOVE_SCRIPT: &str = r"
    local removed = redis.call('SREM', KEYS[1], ARGV[1])
    local count = redis.call('SCARD', KEYS[1])
    if count == 0 then
        redis.call('DEL', KEYS[1])
        redis.call('SREM', KEYS[2], ARGV[2])
    end
    return {removed, count}
";

/// Redis-based presence store.
#[derive(Clone)]
pub struct RedisPresenceStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisPresenceStore {
    /// Create a new Redis presence store.
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

    fn sessions_key(user_id: UserId) -> String {
        format!("presence:sessions:{}", user_id.0)
    }

    const ONLINE_KEY: &'static str = "presence:online";
}

impl PresenceStore for RedisPresenceStore {
    async fn register_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
        ttl: Duration,
    ) -> Result<SessionRegistration> {
        let mut conn = self.conn_manager.clone();

        let (added, count): (i64, i64) = redis::Script::new(REGISTER_SCRIPT)
            .key(Self::sessions_key(user_id))
            .key(Self::ONLINE_KEY)
            .arg(session_id.0.to_string())
            .arg(ttl.as_secs())
            .arg(user_id.0.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                ChatError::StorageUnavailable(format!("failed to register session: {e}"))
            })?;

        tracing::debug!(
            user_id = %user_id.0,
            session_id = %session_id.0,
            session_count = count,
            "Registered presence session"
        );

        #[allow(clippy::cast_sign_loss)]
        Ok(SessionRegistration {
            newly_added: added == 1,
            session_count: count.max(0) as u64,
        })
    }

    async fn remove_session(&self, user_id: UserId, session_id: SessionId) -> Result<SessionRemoval> {
        let mut conn = self.conn_manager.clone();

        let (removed, count): (i64, i64) = redis::Script::new(REMOVE_SCRIPT)
            .key(Self::sessions_key(user_id))
            .key(Self::ONLINE_KEY)
            .arg(session_id.0.to_string())
            .arg(user_id.0.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                ChatError::StorageUnavailable(format!("failed to remove session: {e}"))
            })?;

        tracing::debug!(
            user_id = %user_id.0,
            session_id = %session_id.0,
            session_count = count,
            "Removed presence session"
        );

        #[allow(clippy::cast_sign_loss)]
        Ok(SessionRemoval {
            removed: removed == 1,
            session_count: count.max(0) as u64,
        })
    }

    async fn is_online(&self, user_id: UserId) -> Result<bool> {
        let mut conn = self.conn_manager.clone();

        // The session set is the source of truth; its TTL clears out crashed
        // connections, while the online index is only cleaned up lazily.
        let exists: bool = conn
            .exists(Self::sessions_key(user_id))
            .await
            .map_err(|e| {
                ChatError::StorageUnavailable(format!("failed to check presence: {e}"))
            })?;

        Ok(exists)
    }

    async fn online_users(&self) -> Result<HashSet<UserId>> {
        let mut conn = self.conn_manager.clone();

        let member_ids: Vec<String> = conn.smembers(Self::ONLINE_KEY).await.map_err(|e| {
            ChatError::StorageUnavailable(format!("failed to read online index: {e}"))
        })?;

        // Filter out users whose session set expired without a clean
        // disconnect, and drop their stale index entries.
        let mut online = HashSet::new();
        for id_str in member_ids {
            let Ok(uuid) = uuid::Uuid::parse_str(&id_str) else {
                continue;
            };
            let user_id = UserId(uuid);

            if self.is_online(user_id).await? {
                online.insert(user_id);
            } else {
                let _: () = conn
                    .srem(Self::ONLINE_KEY, &id_str)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(
                            user_id = %id_str,
                            error = %e,
                            "Failed to clean up stale online index entry"
                        );
                    });
            }
        }

        Ok(online)
    }

    async fn session_count(&self, user_id: UserId) -> Result<u64> {
        let mut conn = self.conn_manager.clone();

        let count: u64 = conn.scard(Self::sessions_key(user_id)).await.map_err(|e| {
            ChatError::StorageUnavailable(format!("failed to count sessions: {e}"))
        })?;

        Ok(count)
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
    async fn test_session_lifecycle_drives_online_state() {
        let store = RedisPresenceStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();

        let user = UserId::new();
        let (first, second) = (SessionId::new(), SessionId::new());

        let reg = store
            .register_session(user, first, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(reg.newly_added);
        assert_eq!(reg.session_count, 1);
        assert!(store.is_online(user).await.unwrap());

        let reg = store
            .register_session(user, second, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(reg.session_count, 2);

        let rem = store.remove_session(user, first).await.unwrap();
        assert!(rem.removed);
        assert_eq!(rem.session_count, 1);
        assert!(store.is_online(user).await.unwrap());

        let rem = store.remove_session(user, second).await.unwrap();
        assert_eq!(rem.session_count, 0);
        assert!(!store.is_online(user).await.unwrap());
        assert!(!store.online_users().await.unwrap().contains(&user));
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_duplicate_registration_is_not_newly_added() {
        let store = RedisPresenceStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();

        let user = UserId::new();
        let session = SessionId::new();

        let first = store
            .register_session(user, session, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(first.newly_added);

        let second = store
            .register_session(user, session, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!second.newly_added);
        assert_eq!(second.session_count, 1);

        // Cleanup
        store.remove_session(user, session).await.unwrap();
    }
}
