//! Redis-based rate-limit store implementation.
//!
//! Sliding window over a sorted set, one set per `(user, category)`:
//! 1. Drop entries older than the window (ZREMRANGEBYSCORE)
//! 2. Count what remains (ZCARD)
//! 3. Record the request (ZADD) only when under the limit
//!
//! All three steps run in one Lua script. Denied requests record nothing, so
//! a client hammering a full window does not push its own recovery point
//! further into the future.

use crate::error::{ChatError, Result};
use crate::providers::RateLimitStore;
use crate::state::UserId;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Prune the window, then record the request only if the limit allows it.
/// Returns 1 when allowed, 0 when denied.
const CHECK_AND_RECORD_SCRIPT: &str = r"
    redis.call('ZREMRANGEBYSCORE', KEYS[1], 0, ARGV[1])
    local count = redis.call('ZCARD', KEYS[1])
    if count >= tonumber(ARGV[2]) then
        return 0
    end
    redis.call('ZADD', KEYS[1], ARGV[3], ARGV[4])
    redis.call('EXPIRE', KEYS[1], ARGV[5])
    return 1
";

/// Redis-based sliding-window rate-limit store.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisRateLimitStore {
    /// Create a new Redis rate-limit store.
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

    fn window_key(user_id: UserId, category: &str) -> String {
        format!("rate:{}:{category}", user_id.0)
    }

    /// Current timestamp in milliseconds.
    #[allow(clippy::cast_possible_truncation)] // timestamps fit in u64 until year 2554
    fn current_timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }
}

impl RateLimitStore for RedisRateLimitStore {
    async fn check_and_record(
        &self,
        user_id: UserId,
        category: &str,
        limit: u32,
        window: Duration,
    ) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let key = Self::window_key(user_id, category);
        let now_ms = Self::current_timestamp_ms();
        #[allow(clippy::cast_possible_truncation)] // rate limit windows are small durations
        let window_ms = window.as_millis() as u64;
        let window_start = now_ms.saturating_sub(window_ms);

        // Member must be unique per request; two requests in the same
        // millisecond would otherwise collapse into one sorted-set entry.
        let member = format!("{now_ms}:{}", uuid::Uuid::new_v4().simple());
        let key_ttl_secs = window.as_secs().max(1) * 2;

        let allowed: i64 = redis::Script::new(CHECK_AND_RECORD_SCRIPT)
            .key(&key)
            .arg(window_start)
            .arg(limit)
            .arg(now_ms)
            .arg(member)
            .arg(key_ttl_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                ChatError::StorageUnavailable(format!("failed to check rate limit: {e}"))
            })?;

        if allowed == 0 {
            tracing::warn!(
                user_id = %user_id.0,
                category = %category,
                limit = limit,
                window_ms = window_ms,
                "Rate limit window full"
            );
        }

        Ok(allowed == 1)
    }

    async fn count(&self, user_id: UserId, category: &str, window: Duration) -> Result<u32> {
        let mut conn = self.conn_manager.clone();
        let key = Self::window_key(user_id, category);
        let now_ms = Self::current_timestamp_ms();
        #[allow(clippy::cast_possible_truncation)] // rate limit windows are small durations
        let window_start = now_ms.saturating_sub(window.as_millis() as u64);

        #[allow(clippy::cast_possible_wrap)]
        let (count,): (u64,) = redis::pipe()
            .atomic()
            .zrembyscore(&key, 0, window_start as isize)
            .ignore()
            .zcard(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                ChatError::StorageUnavailable(format!("failed to count rate limit window: {e}"))
            })?;

        #[allow(clippy::cast_possible_truncation)]
        Ok(count as u32)
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
    async fn test_denied_requests_record_nothing() {
        let store = RedisRateLimitStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();

        let user = UserId::new();
        let category = format!("test:{}", uuid::Uuid::new_v4());
        let window = Duration::from_secs(60);

        for _ in 0..3 {
            assert!(store
                .check_and_record(user, &category, 3, window)
                .await
                .unwrap());
        }

        // Window is full; denials must not extend it.
        for _ in 0..5 {
            assert!(!store
                .check_and_record(user, &category, 3, window)
                .await
                .unwrap());
        }

        assert_eq!(store.count(user, &category, window).await.unwrap(), 3);
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_window_slides_open_again() {
        let store = RedisRateLimitStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();

        let user = UserId::new();
        let category = format!("test:{}", uuid::Uuid::new_v4());
        let window = Duration::from_secs(1);

        for _ in 0..2 {
            assert!(store
                .check_and_record(user, &category, 2, window)
                .await
                .unwrap());
        }
        assert!(!store
            .check_and_record(user, &category, 2, window)
            .await
            .unwrap());

        tokio::time::sleep(tokio::time::Duration::from_millis(1100)).await;

        assert!(store
            .check_and_record(user, &category, 2, window)
            .await
            .unwrap());
    }
}
