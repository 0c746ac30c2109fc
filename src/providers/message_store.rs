//! Message store collaborator trait.
//!
//! Message persistence is external to this crate: the store owns all message
//! state and is the source of truth for `Sent` ordering within a
//! conversation. The router reads and writes exclusively through this
//! interface.

use crate::error::Result;
use crate::state::{ConversationId, Message, MessageId, UserId};

/// Payload for persisting a new message.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    /// Target conversation.
    pub conversation_id: ConversationId,

    /// Author.
    pub sender_id: UserId,

    /// The other participant.
    pub receiver_id: UserId,

    /// Message text.
    pub content: String,
}

/// External message persistence collaborator.
pub trait MessageStore: Send + Sync {
    /// Persist a message with status `Sent`; the store assigns id and
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails. Save failures are always surfaced
    /// to the sending caller.
    fn save(
        &self,
        message: NewMessage,
    ) -> impl std::future::Future<Output = Result<Message>> + Send;

    /// Advance a message to `Delivered`.
    ///
    /// # Errors
    ///
    /// Returns error if the message does not exist or the update fails.
    fn mark_delivered(
        &self,
        message_id: MessageId,
    ) -> impl std::future::Future<Output = Result<Message>> + Send;

    /// Bulk-update all unread messages in the conversation not authored by
    /// `reader_id` to `Read`.
    ///
    /// # Returns
    ///
    /// The number of messages affected.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    fn mark_all_read(
        &self,
        conversation_id: ConversationId,
        reader_id: UserId,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// The most recent message in the conversation, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn last_message(
        &self,
        conversation_id: ConversationId,
    ) -> impl std::future::Future<Output = Result<Option<Message>>> + Send;

    /// Whether `user_id` is a legitimate participant of the conversation.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails or the conversation does not exist.
    fn is_participant(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Resolve the conversation participant that is not `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NotFound`](crate::ChatError::NotFound) if the
    /// conversation does not exist or has no other participant.
    fn other_participant(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<UserId>> + Send;
}
