//! Mock live transport for testing.

use crate::error::{ChatError, Result};
use crate::providers::LiveTransport;
use crate::state::{Topic, UserId};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Recording live transport.
///
/// Stores every targeted send and every broadcast so tests can assert on
/// exact fan-out counts and payloads.
#[derive(Debug, Clone)]
pub struct MockLiveTransport {
    sends: Arc<Mutex<Vec<(UserId, Topic, serde_json::Value)>>>,
    broadcasts: Arc<Mutex<Vec<(Topic, serde_json::Value)>>>,
    failing: Arc<AtomicBool>,
}

impl MockLiveTransport {
    /// Create a new mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sends: Arc::new(Mutex::new(Vec::new())),
            broadcasts: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent send and broadcast fail with `DispatchFailed`.
    pub fn fail_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of targeted sends to `user_id` on `topic`.
    #[must_use]
    pub fn sent_count(&self, user_id: UserId, topic: Topic) -> usize {
        self.sends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(user, t, _)| *user == user_id && *t == topic)
            .count()
    }

    /// Number of broadcasts on `topic`.
    #[must_use]
    pub fn broadcast_count(&self, topic: Topic) -> usize {
        self.broadcasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(t, _)| *t == topic)
            .count()
    }

    /// Payloads of targeted sends to `user_id` on `topic`, in send order.
    #[must_use]
    pub fn payloads_for(&self, user_id: UserId, topic: Topic) -> Vec<serde_json::Value> {
        self.sends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(user, t, _)| *user == user_id && *t == topic)
            .map(|(_, _, payload)| payload.clone())
            .collect()
    }

    /// Broadcast payloads on `topic`, in publish order.
    #[must_use]
    pub fn broadcast_payloads(&self, topic: Topic) -> Vec<serde_json::Value> {
        self.broadcasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(t, _)| *t == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl Default for MockLiveTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveTransport for MockLiveTransport {
    fn send_to_user(
        &self,
        user_id: UserId,
        topic: Topic,
        payload: &serde_json::Value,
    ) -> impl Future<Output = Result<()>> + Send {
        let sends = Arc::clone(&self.sends);
        let failing = self.failing.load(Ordering::SeqCst);
        let payload = payload.clone();

        async move {
            if failing {
                return Err(ChatError::DispatchFailed(
                    "mock transport failing".to_string(),
                ));
            }
            sends
                .lock()
                .map_err(|_| ChatError::DispatchFailed("mutex poisoned".to_string()))?
                .push((user_id, topic, payload));
            Ok(())
        }
    }

    fn broadcast(
        &self,
        topic: Topic,
        payload: &serde_json::Value,
    ) -> impl Future<Output = Result<()>> + Send {
        let broadcasts = Arc::clone(&self.broadcasts);
        let failing = self.failing.load(Ordering::SeqCst);
        let payload = payload.clone();

        async move {
            if failing {
                return Err(ChatError::DispatchFailed(
                    "mock transport failing".to_string(),
                ));
            }
            broadcasts
                .lock()
                .map_err(|_| ChatError::DispatchFailed("mutex poisoned".to_string()))?
                .push((topic, payload));
            Ok(())
        }
    }
}
