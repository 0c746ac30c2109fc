//! Redis-backed store implementations.
//!
//! Production implementations of the shared-store provider traits. All four
//! use `redis::aio::ConnectionManager` for pooling and reconnect handling,
//! and Lua scripts wherever a read-and-write pair must be atomic across
//! concurrent callers.

pub mod idempotency_redis;
pub mod presence_redis;
pub mod push_subscriptions_redis;
pub mod rate_limit_redis;

pub use idempotency_redis::RedisIdempotencyStore;
pub use presence_redis::RedisPresenceStore;
pub use push_subscriptions_redis::RedisPushSubscriptionStore;
pub use rate_limit_redis::RedisRateLimitStore;
