//! Mock push gateway for testing.

use crate::error::{ChatError, Result};
use crate::providers::{PushGateway, PushPayload};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// Recording push gateway with per-channel failure injection.
#[derive(Debug, Clone)]
pub struct MockPushGateway {
    dispatches: Arc<Mutex<Vec<(String, String, PushPayload)>>>,
    failing_channels: Arc<Mutex<HashSet<String>>>,
}

impl MockPushGateway {
    /// Create a new mock gateway.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dispatches: Arc::new(Mutex::new(Vec::new())),
            failing_channels: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Make every dispatch to `channel` fail with `DispatchFailed`.
    pub fn fail_channel(&self, channel: &str) {
        self.failing_channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel.to_string());
    }

    /// Total number of successful dispatches.
    #[must_use]
    pub fn dispatch_count(&self) -> usize {
        self.dispatches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether a dispatch reached `(channel, token)`.
    #[must_use]
    pub fn dispatched_to(&self, channel: &str, token: &str) -> bool {
        self.dispatches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(c, t, _)| c == channel && t == token)
    }

    /// Every dispatched payload, in dispatch order.
    #[must_use]
    pub fn payloads(&self) -> Vec<PushPayload> {
        self.dispatches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, _, payload)| payload.clone())
            .collect()
    }
}

impl Default for MockPushGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl PushGateway for MockPushGateway {
    fn dispatch(
        &self,
        channel: &str,
        token: &str,
        payload: &PushPayload,
    ) -> impl Future<Output = Result<()>> + Send {
        let dispatches = Arc::clone(&self.dispatches);
        let failing = self
            .failing_channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(channel);
        let channel = channel.to_string();
        let token = token.to_string();
        let payload = payload.clone();

        async move {
            if failing {
                return Err(ChatError::DispatchFailed(format!(
                    "mock gateway failing for channel {channel}"
                )));
            }
            dispatches
                .lock()
                .map_err(|_| ChatError::DispatchFailed("mutex poisoned".to_string()))?
                .push((channel, token, payload));
            Ok(())
        }
    }
}
