//! Error types for messaging coordination operations.

use crate::state::{ConversationId, UserId};
use thiserror::Error;

/// Result type alias for messaging operations.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Error taxonomy for the messaging coordination layer.
///
/// Persistence-path failures are always surfaced to the caller (the message
/// store is the source of truth). Notification-path failures
/// (`DispatchFailed`) are logged and absorbed by callers. `StorageUnavailable`
/// is absorbed inside the presence/idempotency/rate-limit components per
/// their fail-open/fail-closed policies and only escapes from session
/// lifecycle calls.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChatError {
    /// Malformed or missing required field. Rejected before any side effect.
    #[error("Validation failed: {reason}")]
    Validation {
        /// What was wrong with the input.
        reason: String,
    },

    /// Conversation, message, or participant does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// Human-readable name of the missing resource.
        resource: String,
    },

    /// Caller is not a participant of the target conversation.
    #[error("User {user_id:?} is not a participant of conversation {conversation_id:?}")]
    Unauthorized {
        /// The offending caller.
        user_id: UserId,
        /// The conversation they tried to touch.
        conversation_id: ConversationId,
    },

    /// Backing store for presence/idempotency/rate-limit state is unreachable.
    #[error("Shared store unavailable: {0}")]
    StorageUnavailable(String),

    /// Live delivery or push dispatch failed. Never rolls back a persisted
    /// message.
    #[error("Notification dispatch failed: {0}")]
    DispatchFailed(String),

    /// Payload serialization failed (treated as a dispatch-path failure).
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ChatError {
    /// Returns `true` if this error is caused by invalid caller input rather
    /// than an infrastructure problem.
    ///
    /// # Examples
    ///
    /// ```
    /// # use chat_relay::ChatError;
    /// let err = ChatError::Validation { reason: "empty content".into() };
    /// assert!(err.is_user_error());
    /// assert!(!ChatError::StorageUnavailable("down".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::NotFound { .. } | Self::Unauthorized { .. }
        )
    }

    /// Returns `true` if this error belongs to the notification path and must
    /// be absorbed (logged, never propagated, never rolled back).
    #[must_use]
    pub const fn is_notification_error(&self) -> bool {
        matches!(self, Self::DispatchFailed(_) | Self::Serialization(_))
    }
}
