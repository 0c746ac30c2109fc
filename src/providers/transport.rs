//! Live transport collaborator trait.

use crate::error::Result;
use crate::state::{Topic, UserId};

/// Bidirectional per-user addressable channel owned by the application's
/// connection layer.
///
/// Delivery is best-effort and fire-and-forget: implementations must not
/// block the caller waiting for the recipient's client to acknowledge.
pub trait LiveTransport: Send + Sync {
    /// Push `payload` to every live session of `user_id` on `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::DispatchFailed`](crate::ChatError::DispatchFailed)
    /// if the payload could not be handed to the transport. Callers on the
    /// notification path log and swallow this.
    fn send_to_user(
        &self,
        user_id: UserId,
        topic: Topic,
        payload: &serde_json::Value,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Publish `payload` to every subscriber of `topic` (the global presence
    /// feed). Fan-out to individual channels is the transport's concern.
    ///
    /// # Errors
    ///
    /// Returns error if the payload could not be handed to the transport.
    fn broadcast(
        &self,
        topic: Topic,
        payload: &serde_json::Value,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
