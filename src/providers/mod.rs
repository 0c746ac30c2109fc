//! Provider traits.
//!
//! This module defines traits for all external dependencies used by the
//! coordination layer. These traits enable dependency injection and make the
//! orchestration logic testable.
//!
//! # Architecture
//!
//! Providers are **interfaces**, not implementations. Components depend on
//! these traits and receive concrete handles at construction time — never
//! through ambient/static state. This enables:
//!
//! - **Testing**: in-memory fakes from [`crate::mocks`], deterministic and
//!   memory-speed
//! - **Production**: Redis-backed stores from [`crate::stores`] plus the
//!   application's real transport and push gateway
//!
//! Two groups live here:
//!
//! - Shared-store seams owned by this crate: [`PresenceStore`],
//!   [`IdempotencyStore`], [`RateLimitStore`], [`PushSubscriptionStore`]
//! - External collaborators (interfaces only, per the system boundary):
//!   [`MessageStore`], [`LiveTransport`], [`PushGateway`]

pub mod idempotency_store;
pub mod message_store;
pub mod presence_store;
pub mod push_gateway;
pub mod push_subscriptions;
pub mod rate_limit_store;
pub mod transport;

pub use idempotency_store::IdempotencyStore;
pub use message_store::{MessageStore, NewMessage};
pub use presence_store::{PresenceStore, SessionRegistration, SessionRemoval};
pub use push_gateway::{PushGateway, PushPayload};
pub use push_subscriptions::PushSubscriptionStore;
pub use rate_limit_store::RateLimitStore;
pub use transport::LiveTransport;
