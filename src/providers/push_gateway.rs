//! Push gateway collaborator trait.

use crate::error::Result;
use crate::state::{ConversationId, MessageId, UserId};
use serde::{Deserialize, Serialize};

/// Out-of-band notification payload handed to the external gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    /// Notification title.
    pub title: String,

    /// Notification body (message preview).
    pub body: String,

    /// Conversation to open on tap.
    pub conversation_id: ConversationId,

    /// Message that triggered the notification.
    pub message_id: MessageId,

    /// Message author.
    pub sender_id: UserId,
}

/// External push-notification gateway (FCM/APNs-equivalent).
///
/// Retry and backoff policy live behind this seam; the dispatcher's job ends
/// at "resolve token, hand off".
pub trait PushGateway: Send + Sync {
    /// Dispatch `payload` to `token` on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::DispatchFailed`](crate::ChatError::DispatchFailed)
    /// on gateway failure. The dispatcher logs per-channel failures and keeps
    /// going.
    fn dispatch(
        &self,
        channel: &str,
        token: &str,
        payload: &PushPayload,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
