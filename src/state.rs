//! Core domain types for the messaging coordination layer.
//!
//! All types are `Clone` and serde-serializable; event payload types
//! (`PresenceEvent`, `ReadReceipt`, `TypingIndicator`) are serialized to JSON
//! before being handed to the live transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    /// Generate a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a live connection session.
///
/// A user may hold several sessions at once (multi-device); presence is
/// derived from the set of live sessions, not from any single one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    /// Generate a new random `SessionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a two-party conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub uuid::Uuid);

impl ConversationId {
    /// Generate a new random `ConversationId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub uuid::Uuid);

impl MessageId {
    /// Generate a new random `MessageId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Messages
// ═══════════════════════════════════════════════════════════════════════

/// Delivery status of a message.
///
/// Transitions are monotonic: `Sent → Delivered → Read`. A status never
/// regresses, and `Read` is only reached via bulk mark-as-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    /// Persisted, not yet confirmed on a live channel.
    Sent,
    /// Pushed to the recipient's live channel at send time.
    Delivered,
    /// Covered by a bulk mark-as-read from the recipient.
    Read,
}

impl MessageStatus {
    /// Returns `true` if advancing to `next` respects the monotonic
    /// `Sent → Delivered → Read` order.
    ///
    /// `Sent → Read` is allowed: a recipient can mark a conversation read
    /// without the live path ever having confirmed delivery.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        next > self
    }
}

/// A persisted chat message.
///
/// Owned by the external message store; the router only reads and writes it
/// through the [`MessageStore`](crate::providers::MessageStore) interface and
/// never holds it as local state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message ID (assigned by the store on save).
    pub id: MessageId,

    /// Conversation this message belongs to.
    pub conversation_id: ConversationId,

    /// Author.
    pub sender_id: UserId,

    /// The other participant.
    pub receiver_id: UserId,

    /// Message text.
    pub content: String,

    /// Current delivery status.
    pub status: MessageStatus,

    /// Persistence timestamp (assigned by the store).
    pub created_at: DateTime<Utc>,
}

/// Inbound send-message request from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Target conversation.
    pub conversation_id: ConversationId,

    /// Message text. Must be non-empty.
    pub content: String,

    /// Caller-supplied idempotency key. `None` or empty opts out of
    /// deduplication.
    pub idempotency_key: Option<String>,
}

/// Result of a send-message call.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The message was persisted; carries the stored representation for
    /// optimistic-UI reconciliation on the sender's client.
    Sent(Message),

    /// The idempotency key was already seen within its TTL. No message was
    /// persisted and no notification was produced.
    Duplicate,
}

// ═══════════════════════════════════════════════════════════════════════
// Ephemeral event payloads
// ═══════════════════════════════════════════════════════════════════════

/// Typing indicator. Never persisted; exists only as an in-flight broadcast
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingIndicator {
    /// Conversation the indicator applies to.
    pub conversation_id: ConversationId,

    /// User who is (or stopped) typing.
    pub user_id: UserId,

    /// `true` while typing, `false` when stopped.
    pub is_typing: bool,
}

/// Presence transition event, emitted only on a 0→1 or 1→0 session edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// User whose presence changed.
    pub user_id: UserId,

    /// Display name cached for rendering without a user lookup.
    pub display_name: String,

    /// New presence state.
    pub online: bool,

    /// When the edge was observed.
    pub timestamp: DateTime<Utc>,
}

/// Read-receipt event sent to the original sender after a bulk mark-as-read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadReceipt {
    /// Conversation that was read.
    pub conversation_id: ConversationId,

    /// User who read it.
    pub reader_id: UserId,

    /// Number of messages transitioned to `Read`.
    pub count: u64,

    /// When the bulk update happened.
    pub read_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════
// Transport topics
// ═══════════════════════════════════════════════════════════════════════

/// Live-transport stream discriminator.
///
/// Distinguishes the message, typing, presence, and read-receipt streams on
/// the per-user addressable channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// New chat messages.
    Message,
    /// Typing indicators.
    Typing,
    /// Presence transitions.
    Presence,
    /// Read receipts.
    ReadReceipt,
}

impl Topic {
    /// Wire name of the topic.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Typing => "typing",
            Self::Presence => "presence",
            Self::ReadReceipt => "read_receipt",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
