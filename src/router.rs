//! Message router.
//!
//! Orchestrates the send-message, mark-as-read, and typing-indicator flows
//! over the idempotency guard, presence tracker, push dispatcher, and the
//! external message store.
//!
//! # Failure semantics
//!
//! Persistence-path failures (anything the message store returns) are always
//! surfaced to the caller — the store is the source of truth. Notification
//! failures (live delivery, push dispatch) are logged and absorbed: a
//! persisted message that fails to notify live is a latency degradation, not
//! data loss, and must never roll back the persisted write. A sender gets a
//! definitive answer for whether their message was *stored*, never for
//! whether it was *delivered live*.

use crate::error::{ChatError, Result};
use crate::idempotency::IdempotencyGuard;
use crate::presence::PresenceTracker;
use crate::providers::{
    IdempotencyStore, LiveTransport, MessageStore, NewMessage, PresenceStore, PushGateway,
    PushSubscriptionStore,
};
use crate::push::PushDispatcher;
use crate::state::{
    ConversationId, Message, ReadReceipt, SendMessageRequest, SendOutcome, Topic, TypingIndicator,
    UserId,
};
use serde::Serialize;

/// Orchestrator for the two-party chat flows.
///
/// All collaborators are injected at construction.
///
/// # Type Parameters
///
/// - `M`: message store (external collaborator)
/// - `PS`: presence store
/// - `IS`: idempotency store
/// - `SS`: push subscription store
/// - `T`: live transport
/// - `G`: push gateway
#[derive(Clone)]
pub struct MessageRouter<M, PS, IS, SS, T, G>
where
    M: MessageStore + Clone,
    PS: PresenceStore + Clone,
    IS: IdempotencyStore + Clone,
    SS: PushSubscriptionStore + Clone,
    T: LiveTransport + Clone,
    G: PushGateway + Clone,
{
    messages: M,
    presence: PresenceTracker<PS, T>,
    idempotency: IdempotencyGuard<IS>,
    push: PushDispatcher<SS, G, PS>,
    transport: T,
}

impl<M, PS, IS, SS, T, G> MessageRouter<M, PS, IS, SS, T, G>
where
    M: MessageStore + Clone,
    PS: PresenceStore + Clone,
    IS: IdempotencyStore + Clone,
    SS: PushSubscriptionStore + Clone,
    T: LiveTransport + Clone,
    G: PushGateway + Clone,
{
    /// Create a new message router.
    #[must_use]
    pub const fn new(
        messages: M,
        presence: PresenceTracker<PS, T>,
        idempotency: IdempotencyGuard<IS>,
        push: PushDispatcher<SS, G, PS>,
        transport: T,
    ) -> Self {
        Self {
            messages,
            presence,
            idempotency,
            push,
            transport,
        }
    }

    /// The presence tracker, for connection-event handlers
    /// (on-connect/on-disconnect).
    #[must_use]
    pub const fn presence(&self) -> &PresenceTracker<PS, T> {
        &self.presence
    }

    /// The idempotency guard, for callers that mint their own keys.
    #[must_use]
    pub const fn idempotency(&self) -> &IdempotencyGuard<IS> {
        &self.idempotency
    }

    /// The push dispatcher, for token registration handlers.
    #[must_use]
    pub const fn push(&self) -> &PushDispatcher<SS, G, PS> {
        &self.push
    }

    /// Send a message from `sender_id` to `receiver_id`.
    ///
    /// Flow: validate → idempotency check (strictly before persistence) →
    /// participant check → persist as `Sent` → live delivery + `Delivered`
    /// when the recipient is online, push fallback when not.
    ///
    /// # Returns
    ///
    /// [`SendOutcome::Sent`] with the persisted message (final status
    /// included) for optimistic-UI reconciliation, or
    /// [`SendOutcome::Duplicate`] when the idempotency key was already seen —
    /// in which case nothing was persisted, delivered, or pushed.
    ///
    /// # Errors
    ///
    /// - [`ChatError::Validation`] for empty content (no side effects)
    /// - [`ChatError::Unauthorized`] when the sender is not a conversation
    ///   participant
    /// - any message-store error (persistence failures always surface)
    pub async fn send_message(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        request: SendMessageRequest,
    ) -> Result<SendOutcome> {
        if request.content.trim().is_empty() {
            return Err(ChatError::Validation {
                reason: "message content must not be empty".to_string(),
            });
        }

        if !self
            .idempotency
            .check_and_set(sender_id, request.idempotency_key.as_deref())
            .await
        {
            return Ok(SendOutcome::Duplicate);
        }

        if !self
            .messages
            .is_participant(sender_id, request.conversation_id)
            .await?
        {
            return Err(ChatError::Unauthorized {
                user_id: sender_id,
                conversation_id: request.conversation_id,
            });
        }

        let message = self
            .messages
            .save(NewMessage {
                conversation_id: request.conversation_id,
                sender_id,
                receiver_id,
                content: request.content,
            })
            .await?;

        tracing::info!(
            message_id = %message.id,
            conversation_id = %message.conversation_id,
            sender_id = %sender_id,
            receiver_id = %receiver_id,
            "Persisted message"
        );

        let recipient_online = match self.presence.is_online(receiver_id).await {
            Ok(online) => online,
            Err(e) => {
                tracing::warn!(
                    receiver_id = %receiver_id,
                    error = %e,
                    "Presence unreadable, treating recipient as offline"
                );
                false
            }
        };

        let message = if recipient_online {
            self.deliver_live(receiver_id, message).await?
        } else {
            self.push.send_message_notification(receiver_id, &message).await;
            message
        };

        Ok(SendOutcome::Sent(message))
    }

    /// Mark every unread message in the conversation not authored by
    /// `reader_id` as read.
    ///
    /// When at least one message was affected and the original sender is
    /// currently online, exactly one [`ReadReceipt`] is sent to them; an
    /// offline sender gets no live event and sees the status on next fetch.
    ///
    /// # Returns
    ///
    /// The number of messages transitioned to `Read`.
    ///
    /// # Errors
    ///
    /// Returns any message-store error (bulk update and participant
    /// resolution are persistence-path).
    pub async fn mark_as_read(
        &self,
        conversation_id: ConversationId,
        reader_id: UserId,
    ) -> Result<u64> {
        let count = self.messages.mark_all_read(conversation_id, reader_id).await?;

        if count == 0 {
            return Ok(0);
        }

        tracing::info!(
            conversation_id = %conversation_id,
            reader_id = %reader_id,
            count = count,
            "Marked conversation read"
        );

        let sender_id = self
            .messages
            .other_participant(conversation_id, reader_id)
            .await?;

        if self.is_online_or_assume_offline(sender_id).await {
            let receipt = ReadReceipt {
                conversation_id,
                reader_id,
                count,
                read_at: chrono::Utc::now(),
            };
            self.notify(sender_id, Topic::ReadReceipt, &receipt).await;
        }

        Ok(count)
    }

    /// Relay a typing indicator to the conversation's other participant.
    ///
    /// Never persisted, and only relayed while the other participant is
    /// online. The indicator is sent to that one participant only, never
    /// echoed to its author.
    ///
    /// # Errors
    ///
    /// Returns a message-store error if the other participant cannot be
    /// resolved.
    pub async fn handle_typing_indicator(&self, indicator: TypingIndicator) -> Result<()> {
        let other = self
            .messages
            .other_participant(indicator.conversation_id, indicator.user_id)
            .await?;

        if self.is_online_or_assume_offline(other).await {
            self.notify(other, Topic::Typing, &indicator).await;
        }

        Ok(())
    }

    /// Live-deliver `message` and advance it to `Delivered`.
    ///
    /// On live-send failure the message stays `Sent` (logged, swallowed, no
    /// push fallback — the dispatcher would suppress it for an online
    /// recipient anyway). A `mark_delivered` store failure propagates.
    async fn deliver_live(&self, receiver_id: UserId, message: Message) -> Result<Message> {
        let payload = match serde_json::to_value(&message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(
                    message_id = %message.id,
                    error = %e,
                    "Failed to encode message payload, skipping live delivery"
                );
                return Ok(message);
            }
        };

        match self
            .transport
            .send_to_user(receiver_id, Topic::Message, &payload)
            .await
        {
            Ok(()) => {
                let delivered = self.messages.mark_delivered(message.id).await?;
                tracing::debug!(
                    message_id = %delivered.id,
                    receiver_id = %receiver_id,
                    "Delivered message live"
                );
                Ok(delivered)
            }
            Err(e) => {
                tracing::warn!(
                    message_id = %message.id,
                    receiver_id = %receiver_id,
                    error = %e,
                    "Live delivery failed, message stays Sent"
                );
                Ok(message)
            }
        }
    }

    /// Presence query with the send-path fallback: unreadable presence counts
    /// as offline.
    async fn is_online_or_assume_offline(&self, user_id: UserId) -> bool {
        match self.presence.is_online(user_id).await {
            Ok(online) => online,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Presence unreadable, assuming offline"
                );
                false
            }
        }
    }

    /// Notification-path send: encode, push to one user, log and swallow any
    /// failure.
    async fn notify<E: Serialize>(&self, user_id: UserId, topic: Topic, event: &E) {
        let payload = match serde_json::to_value(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(topic = %topic, error = %e, "Failed to encode event payload");
                return;
            }
        };

        if let Err(e) = self.transport.send_to_user(user_id, topic, &payload).await {
            tracing::warn!(
                user_id = %user_id,
                topic = %topic,
                error = %e,
                "Live event send failed"
            );
        }
    }
}
