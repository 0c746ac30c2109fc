//! Push notification dispatcher.
//!
//! Fallback delivery path for recipients with no live session: resolves the
//! recipient's registered channels, fetches each channel's token, and hands
//! the notification to the external gateway. Everything here is
//! notification-path — failures are logged, never propagated, and one
//! channel's failure never prevents attempting the others.

use crate::config::PushConfig;
use crate::error::Result;
use crate::providers::{PresenceStore, PushGateway, PushPayload, PushSubscriptionStore};
use crate::state::{Message, UserId};

/// Maximum characters of message content carried in a notification preview.
const PREVIEW_MAX_CHARS: usize = 120;

/// Dispatches out-of-band notifications to a user's registered channels.
#[derive(Clone)]
pub struct PushDispatcher<S, G, P>
where
    S: PushSubscriptionStore + Clone,
    G: PushGateway + Clone,
    P: PresenceStore + Clone,
{
    subscriptions: S,
    gateway: G,
    presence: P,
    config: PushConfig,
}

impl<S, G, P> PushDispatcher<S, G, P>
where
    S: PushSubscriptionStore + Clone,
    G: PushGateway + Clone,
    P: PresenceStore + Clone,
{
    /// Create a new push dispatcher.
    #[must_use]
    pub const fn new(subscriptions: S, gateway: G, presence: P, config: PushConfig) -> Self {
        Self {
            subscriptions,
            gateway,
            presence,
            config,
        }
    }

    /// Whether push notifications are globally enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Register (or refresh) a push token for `(user, channel)`.
    ///
    /// A no-op, not an error, while the feature is disabled.
    ///
    /// # Errors
    ///
    /// Returns error if the subscription store is unreachable.
    pub async fn register_push_token(
        &self,
        user_id: UserId,
        token: &str,
        channel: &str,
    ) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        self.subscriptions
            .save_token(user_id, channel, token, self.config.token_ttl)
            .await?;

        tracing::info!(user_id = %user_id, channel = %channel, "Registered push token");
        Ok(())
    }

    /// Remove the push token for `(user, channel)`.
    ///
    /// A no-op, not an error, while the feature is disabled.
    ///
    /// # Errors
    ///
    /// Returns error if the subscription store is unreachable.
    pub async fn unregister_push_token(&self, user_id: UserId, channel: &str) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        self.subscriptions.remove_token(user_id, channel).await?;

        tracing::info!(user_id = %user_id, channel = %channel, "Unregistered push token");
        Ok(())
    }

    /// Send a new-message notification to every channel `recipient_id` has
    /// registered.
    ///
    /// No-ops when the feature is disabled, when the recipient is online (the
    /// live path already delivered the message), or when the channel set is
    /// empty or unreadable. Per-channel failures are logged and the remaining
    /// channels are still attempted. Never raises.
    pub async fn send_message_notification(&self, recipient_id: UserId, message: &Message) {
        if !self.config.enabled {
            return;
        }

        // Redundant-notification guard: a presence read error counts as
        // offline, which at worst produces one extra push.
        match self.presence.is_online(recipient_id).await {
            Ok(true) => {
                tracing::debug!(
                    recipient_id = %recipient_id,
                    message_id = %message.id,
                    "Recipient online, skipping push"
                );
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    recipient_id = %recipient_id,
                    error = %e,
                    "Presence unreadable during push dispatch, assuming offline"
                );
            }
        }

        let channels = match self.subscriptions.channels(recipient_id).await {
            Ok(channels) => channels,
            Err(e) => {
                tracing::warn!(
                    recipient_id = %recipient_id,
                    error = %e,
                    "Failed to read push channels, skipping notification"
                );
                return;
            }
        };

        if channels.is_empty() {
            tracing::debug!(
                recipient_id = %recipient_id,
                message_id = %message.id,
                "No push channels registered"
            );
            return;
        }

        let payload = Self::payload_for(message);

        for channel in &channels {
            if let Err(e) = self.dispatch_to_channel(recipient_id, channel, &payload).await {
                tracing::warn!(
                    recipient_id = %recipient_id,
                    channel = %channel,
                    message_id = %message.id,
                    error = %e,
                    "Push dispatch failed for channel"
                );
            }
        }
    }

    async fn dispatch_to_channel(
        &self,
        recipient_id: UserId,
        channel: &str,
        payload: &PushPayload,
    ) -> Result<()> {
        let Some(token) = self.subscriptions.token(recipient_id, channel).await? else {
            tracing::debug!(
                recipient_id = %recipient_id,
                channel = %channel,
                "No token for channel (expired?), skipping"
            );
            return Ok(());
        };

        self.gateway.dispatch(channel, &token, payload).await?;

        tracing::debug!(
            recipient_id = %recipient_id,
            channel = %channel,
            "Dispatched push notification"
        );
        Ok(())
    }

    fn payload_for(message: &Message) -> PushPayload {
        let body = if message.content.chars().count() > PREVIEW_MAX_CHARS {
            let truncated: String = message.content.chars().take(PREVIEW_MAX_CHARS).collect();
            format!("{truncated}…")
        } else {
            message.content.clone()
        };

        PushPayload {
            title: "New message".to_string(),
            body,
            conversation_id: message.conversation_id,
            message_id: message.id,
            sender_id: message.sender_id,
        }
    }
}
