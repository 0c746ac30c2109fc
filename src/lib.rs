//! # Chat Relay
//!
//! Coordination layer for real-time one-to-one messaging: who is reachable
//! right now, which requests are retries, who is sending too fast, and how a
//! message gets from sender to recipient.
//!
//! ## Components
//!
//! - [`PresenceTracker`]: multi-session online/offline tracking with
//!   edge-triggered broadcasts
//! - [`IdempotencyGuard`]: retry deduplication keyed by client-supplied keys
//! - [`RateLimiter`]: per-user, per-category sliding-window limits
//! - [`PushDispatcher`]: out-of-band notification fallback for offline
//!   recipients
//! - [`MessageRouter`]: the send/read/typing pipeline tying them together
//!
//! ## Architecture
//!
//! Everything stateful lives behind a provider trait ([`providers`]). The
//! crate ships Redis implementations ([`stores`]) for the shared state it
//! owns, and in-memory mocks ([`mocks`]) for all of it; message persistence,
//! the live transport, and the push gateway are the application's to
//! implement.
//!
//! ## Example: routing a message
//!
//! ```rust,ignore
//! use chat_relay::*;
//!
//! let outcome = router
//!     .send_message(sender_id, receiver_id, request)
//!     .await?;
//!
//! match outcome {
//!     SendOutcome::Sent(message) => { /* persisted, delivery attempted */ }
//!     SendOutcome::Duplicate => { /* retry of an in-flight request */ }
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod config;
pub mod error;
pub mod idempotency;
pub mod mocks;
pub mod presence;
pub mod providers;
pub mod push;
pub mod rate_limit;
pub mod router;
pub mod state;
pub mod stores;

// Re-export main types for convenience
pub use config::{IdempotencyConfig, PresenceConfig, PushConfig, RateLimitConfig};
pub use error::{ChatError, Result};
pub use idempotency::IdempotencyGuard;
pub use presence::PresenceTracker;
pub use push::PushDispatcher;
pub use rate_limit::RateLimiter;
pub use router::MessageRouter;
pub use state::{
    ConversationId, Message, MessageId, MessageStatus, SendMessageRequest, SendOutcome, SessionId,
    Topic, UserId,
};
