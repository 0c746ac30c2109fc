//! Mock provider implementations for testing.
//!
//! Simple in-memory implementations of every provider trait, deterministic
//! and memory-speed. The shared-store mocks expose a `set_unavailable(true)`
//! toggle that makes every subsequent operation fail with
//! [`ChatError::StorageUnavailable`](crate::ChatError::StorageUnavailable),
//! so the fail-open/fail-closed policies are testable without a real outage.

pub mod idempotency_store;
pub mod message_store;
pub mod presence_store;
pub mod push_gateway;
pub mod push_subscriptions;
pub mod rate_limit_store;
pub mod transport;

pub use idempotency_store::MockIdempotencyStore;
pub use message_store::MockMessageStore;
pub use presence_store::MockPresenceStore;
pub use push_gateway::MockPushGateway;
pub use push_subscriptions::MockPushSubscriptionStore;
pub use rate_limit_store::MockRateLimitStore;
pub use transport::MockLiveTransport;
