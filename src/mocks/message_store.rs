//! Mock message store for testing.

use crate::error::{ChatError, Result};
use crate::providers::{MessageStore, NewMessage};
use crate::state::{ConversationId, Message, MessageId, MessageStatus, UserId};
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory message store with explicit conversation membership.
///
/// Conversations must be created up front with [`create_conversation`];
/// participant checks against an unknown conversation return `NotFound`, the
/// same way a relational store would fail the foreign-key lookup.
///
/// [`create_conversation`]: MockMessageStore::create_conversation
#[derive(Debug, Clone)]
pub struct MockMessageStore {
    conversations: Arc<Mutex<HashMap<ConversationId, Vec<UserId>>>>,
    messages: Arc<Mutex<Vec<Message>>>,
    unavailable: Arc<AtomicBool>,
}

impl MockMessageStore {
    /// Create a new mock message store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(Mutex::new(HashMap::new())),
            messages: Arc::new(Mutex::new(Vec::new())),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent operation fail with `StorageUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Register a conversation and its participants. Test setup helper.
    #[must_use]
    pub fn create_conversation(&self, participants: &[UserId]) -> ConversationId {
        let id = ConversationId::new();
        self.conversations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, participants.to_vec());
        id
    }

    /// Total number of persisted messages. Test inspection helper.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Current status of a persisted message. Test inspection helper.
    #[must_use]
    pub fn status_of(&self, message_id: MessageId) -> Option<MessageStatus> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|m| m.id == message_id)
            .map(|m| m.status)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ChatError::StorageUnavailable(
                "mock message store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MockMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore for MockMessageStore {
    fn save(&self, message: NewMessage) -> impl Future<Output = Result<Message>> + Send {
        let messages = Arc::clone(&self.messages);
        let available = self.check_available();

        async move {
            available?;
            let persisted = Message {
                id: MessageId::new(),
                conversation_id: message.conversation_id,
                sender_id: message.sender_id,
                receiver_id: message.receiver_id,
                content: message.content,
                status: MessageStatus::Sent,
                created_at: Utc::now(),
            };

            let mut guard = messages
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;
            guard.push(persisted.clone());
            Ok(persisted)
        }
    }

    fn mark_delivered(
        &self,
        message_id: MessageId,
    ) -> impl Future<Output = Result<Message>> + Send {
        let messages = Arc::clone(&self.messages);
        let available = self.check_available();

        async move {
            available?;
            let mut guard = messages
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;

            let message = guard
                .iter_mut()
                .find(|m| m.id == message_id)
                .ok_or_else(|| ChatError::NotFound {
                    resource: format!("message {message_id}"),
                })?;

            if message.status.can_advance_to(MessageStatus::Delivered) {
                message.status = MessageStatus::Delivered;
            }
            Ok(message.clone())
        }
    }

    fn mark_all_read(
        &self,
        conversation_id: ConversationId,
        reader_id: UserId,
    ) -> impl Future<Output = Result<u64>> + Send {
        let messages = Arc::clone(&self.messages);
        let available = self.check_available();

        async move {
            available?;
            let mut guard = messages
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;

            let mut updated = 0u64;
            for message in guard.iter_mut().filter(|m| {
                m.conversation_id == conversation_id
                    && m.sender_id != reader_id
                    && m.status != MessageStatus::Read
            }) {
                message.status = MessageStatus::Read;
                updated += 1;
            }
            Ok(updated)
        }
    }

    fn last_message(
        &self,
        conversation_id: ConversationId,
    ) -> impl Future<Output = Result<Option<Message>>> + Send {
        let messages = Arc::clone(&self.messages);
        let available = self.check_available();

        async move {
            available?;
            let guard = messages
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;
            Ok(guard
                .iter()
                .filter(|m| m.conversation_id == conversation_id)
                .next_back()
                .cloned())
        }
    }

    fn is_participant(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
    ) -> impl Future<Output = Result<bool>> + Send {
        let conversations = Arc::clone(&self.conversations);
        let available = self.check_available();

        async move {
            available?;
            let guard = conversations
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;
            let participants = guard.get(&conversation_id).ok_or_else(|| ChatError::NotFound {
                resource: format!("conversation {conversation_id}"),
            })?;
            Ok(participants.contains(&user_id))
        }
    }

    fn other_participant(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> impl Future<Output = Result<UserId>> + Send {
        let conversations = Arc::clone(&self.conversations);
        let available = self.check_available();

        async move {
            available?;
            let guard = conversations
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;
            guard
                .get(&conversation_id)
                .and_then(|participants| participants.iter().find(|p| **p != user_id))
                .copied()
                .ok_or_else(|| ChatError::NotFound {
                    resource: format!("other participant in conversation {conversation_id}"),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn mark_all_read_skips_own_and_already_read() {
        let store = MockMessageStore::new();
        let (alice, bob) = (UserId::new(), UserId::new());
        let conversation = store.create_conversation(&[alice, bob]);

        for _ in 0..3 {
            store
                .save(NewMessage {
                    conversation_id: conversation,
                    sender_id: alice,
                    receiver_id: bob,
                    content: "hi".to_string(),
                })
                .await
                .unwrap();
        }
        // Bob replies; his own message must not be touched by his read sweep.
        store
            .save(NewMessage {
                conversation_id: conversation,
                sender_id: bob,
                receiver_id: alice,
                content: "hey".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(store.mark_all_read(conversation, bob).await.unwrap(), 3);
        assert_eq!(store.mark_all_read(conversation, bob).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn other_participant_resolves_the_peer() {
        let store = MockMessageStore::new();
        let (alice, bob) = (UserId::new(), UserId::new());
        let conversation = store.create_conversation(&[alice, bob]);

        assert_eq!(
            store.other_participant(conversation, alice).await.unwrap(),
            bob
        );
        assert_eq!(
            store.other_participant(conversation, bob).await.unwrap(),
            alice
        );
    }
}
