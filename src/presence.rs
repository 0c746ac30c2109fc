//! Presence tracker with edge-triggered broadcast.
//!
//! Presence is derived state: `online(user) := session_count(user) > 0`. The
//! tracker registers and deregisters sessions through a [`PresenceStore`]
//! whose register/remove operations atomically mutate the per-user session
//! set and the global online set and return the resulting count. Edge
//! detection works off that single result — there is no separate
//! "was offline?" read that could race with a concurrent connect.
//!
//! A presence event is broadcast on [`Topic::Presence`] only on a 0→1 or 1→0
//! session edge, never on every mutating call.

use crate::config::PresenceConfig;
use crate::error::Result;
use crate::providers::{LiveTransport, PresenceStore};
use crate::state::{PresenceEvent, SessionId, Topic, UserId};
use std::collections::HashSet;

/// Tracks live sessions per user and broadcasts presence transitions.
///
/// Store and transport handles are injected at construction so tests can
/// substitute the in-memory fakes from [`crate::mocks`].
#[derive(Clone)]
pub struct PresenceTracker<S, T>
where
    S: PresenceStore + Clone,
    T: LiveTransport + Clone,
{
    store: S,
    transport: T,
    config: PresenceConfig,
}

impl<S, T> PresenceTracker<S, T>
where
    S: PresenceStore + Clone,
    T: LiveTransport + Clone,
{
    /// Create a new presence tracker.
    #[must_use]
    pub const fn new(store: S, transport: T, config: PresenceConfig) -> Self {
        Self {
            store,
            transport,
            config,
        }
    }

    /// Register a session for `user_id`.
    ///
    /// # Returns
    ///
    /// `true` only if this session took the user's session count from 0 to
    /// ≥1. On that edge exactly one `online = true` [`PresenceEvent`] is
    /// broadcast; subsequent sessions for an already-online user broadcast
    /// nothing. Broadcast failures are logged and swallowed — they never
    /// affect the return value.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StorageUnavailable`](crate::ChatError::StorageUnavailable)
    /// if the session could not be registered. The connection layer owns the
    /// session lifecycle and decides whether to retry or close.
    pub async fn set_online(
        &self,
        user_id: UserId,
        session_id: SessionId,
        display_name: &str,
    ) -> Result<bool> {
        let registration = self
            .store
            .register_session(user_id, session_id, self.config.session_ttl)
            .await?;

        let was_previously_offline = registration.newly_added && registration.session_count == 1;

        tracing::debug!(
            user_id = %user_id,
            session_id = %session_id,
            session_count = registration.session_count,
            edge = was_previously_offline,
            "Registered session"
        );

        if was_previously_offline {
            self.broadcast_presence(user_id, display_name, true).await;
        }

        Ok(was_previously_offline)
    }

    /// Deregister a session for `user_id`.
    ///
    /// # Returns
    ///
    /// `true` only if this removal took the user's session count to 0. On
    /// that edge exactly one `online = false` [`PresenceEvent`] is broadcast.
    ///
    /// # Errors
    ///
    /// Returns error if the session could not be deregistered.
    pub async fn set_offline(&self, user_id: UserId, session_id: SessionId) -> Result<bool> {
        let removal = self.store.remove_session(user_id, session_id).await?;

        let became_fully_offline = removal.removed && removal.session_count == 0;

        tracing::debug!(
            user_id = %user_id,
            session_id = %session_id,
            session_count = removal.session_count,
            edge = became_fully_offline,
            "Removed session"
        );

        if became_fully_offline {
            self.broadcast_presence(user_id, "", false).await;
        }

        Ok(became_fully_offline)
    }

    /// Whether `user_id` currently has at least one live session.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable. Send-path callers
    /// treat that as offline (an extra push fallback, never a lost message).
    pub async fn is_online(&self, user_id: UserId) -> Result<bool> {
        self.store.is_online(user_id).await
    }

    /// The set of currently online users.
    ///
    /// On storage failure this returns the **empty set**: a false "nobody is
    /// online" only causes an extra push fallback, which is the tolerable
    /// direction of error for bulk presence queries.
    pub async fn online_users(&self) -> HashSet<UserId> {
        match self.store.online_users().await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to read online set, returning empty set"
                );
                HashSet::new()
            }
        }
    }

    /// Number of live sessions for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    pub async fn session_count(&self, user_id: UserId) -> Result<u64> {
        self.store.session_count(user_id).await
    }

    /// Broadcast a presence transition. Failures are logged and swallowed:
    /// presence events are notification-path only.
    async fn broadcast_presence(&self, user_id: UserId, display_name: &str, online: bool) {
        let event = PresenceEvent {
            user_id,
            display_name: display_name.to_string(),
            online,
            timestamp: chrono::Utc::now(),
        };

        let payload = match serde_json::to_value(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to encode presence event");
                return;
            }
        };

        if let Err(e) = self.transport.broadcast(Topic::Presence, &payload).await {
            tracing::warn!(
                user_id = %user_id,
                online = online,
                error = %e,
                "Failed to broadcast presence transition"
            );
        } else {
            tracing::info!(user_id = %user_id, online = online, "Broadcast presence transition");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::mocks::{MockLiveTransport, MockPresenceStore};

    fn tracker() -> (
        PresenceTracker<MockPresenceStore, MockLiveTransport>,
        MockPresenceStore,
        MockLiveTransport,
    ) {
        let store = MockPresenceStore::new();
        let transport = MockLiveTransport::new();
        let tracker =
            PresenceTracker::new(store.clone(), transport.clone(), PresenceConfig::default());
        (tracker, store, transport)
    }

    #[tokio::test]
    async fn first_session_is_an_edge() {
        let (tracker, _, transport) = tracker();
        let user = UserId::new();

        let edge = tracker
            .set_online(user, SessionId::new(), "Alice")
            .await
            .unwrap();

        assert!(edge);
        assert_eq!(transport.broadcast_count(Topic::Presence), 1);
        assert!(tracker.is_online(user).await.unwrap());
    }

    #[tokio::test]
    async fn second_session_is_not_an_edge() {
        let (tracker, _, transport) = tracker();
        let user = UserId::new();

        tracker
            .set_online(user, SessionId::new(), "Alice")
            .await
            .unwrap();
        let edge = tracker
            .set_online(user, SessionId::new(), "Alice")
            .await
            .unwrap();

        assert!(!edge);
        assert_eq!(transport.broadcast_count(Topic::Presence), 1);
        assert_eq!(tracker.session_count(user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn re_registering_same_session_is_not_an_edge() {
        let (tracker, _, transport) = tracker();
        let user = UserId::new();
        let session = SessionId::new();

        tracker.set_online(user, session, "Alice").await.unwrap();
        let edge = tracker.set_online(user, session, "Alice").await.unwrap();

        assert!(!edge);
        assert_eq!(transport.broadcast_count(Topic::Presence), 1);
        assert_eq!(tracker.session_count(user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn offline_edge_only_when_last_session_leaves() {
        let (tracker, _, transport) = tracker();
        let user = UserId::new();
        let s1 = SessionId::new();
        let s2 = SessionId::new();

        tracker.set_online(user, s1, "Alice").await.unwrap();
        tracker.set_online(user, s2, "Alice").await.unwrap();

        let edge = tracker.set_offline(user, s1).await.unwrap();
        assert!(!edge);
        assert!(tracker.is_online(user).await.unwrap());

        let edge = tracker.set_offline(user, s2).await.unwrap();
        assert!(edge);
        assert!(!tracker.is_online(user).await.unwrap());

        // One online edge + one offline edge.
        assert_eq!(transport.broadcast_count(Topic::Presence), 2);
    }

    #[tokio::test]
    async fn removing_unknown_session_is_not_an_edge() {
        let (tracker, _, transport) = tracker();
        let user = UserId::new();

        let edge = tracker.set_offline(user, SessionId::new()).await.unwrap();

        assert!(!edge);
        assert_eq!(transport.broadcast_count(Topic::Presence), 0);
    }

    #[tokio::test]
    async fn online_users_fails_safe_to_empty_set() {
        let (tracker, store, _) = tracker();
        let user = UserId::new();

        tracker
            .set_online(user, SessionId::new(), "Alice")
            .await
            .unwrap();
        assert_eq!(tracker.online_users().await.len(), 1);

        store.set_unavailable(true);
        assert!(tracker.online_users().await.is_empty());
    }

    #[tokio::test]
    async fn registration_failure_is_surfaced() {
        let (tracker, store, transport) = tracker();
        store.set_unavailable(true);

        let result = tracker
            .set_online(UserId::new(), SessionId::new(), "Alice")
            .await;

        assert!(result.is_err());
        assert_eq!(transport.broadcast_count(Topic::Presence), 0);
    }
}
