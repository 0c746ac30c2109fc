//! Mock push subscription store for testing.

use crate::error::{ChatError, Result};
use crate::providers::PushSubscriptionStore;
use crate::state::UserId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// In-memory subscription store with real token TTL expiry.
#[derive(Debug, Clone)]
pub struct MockPushSubscriptionStore {
    /// `user → channel → (token, expiry instant)`.
    tokens: Arc<Mutex<HashMap<UserId, HashMap<String, (String, Instant)>>>>,
    unavailable: Arc<AtomicBool>,
}

impl MockPushSubscriptionStore {
    /// Create a new mock subscription store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(Mutex::new(HashMap::new())),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent operation fail with `StorageUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ChatError::StorageUnavailable(
                "mock subscription store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MockPushSubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PushSubscriptionStore for MockPushSubscriptionStore {
    fn save_token(
        &self,
        user_id: UserId,
        channel: &str,
        token: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<()>> + Send {
        let tokens = Arc::clone(&self.tokens);
        let available = self.check_available();
        let channel = channel.to_string();
        let token = token.to_string();

        async move {
            available?;
            let mut guard = tokens
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;
            guard
                .entry(user_id)
                .or_default()
                .insert(channel, (token, Instant::now() + ttl));
            Ok(())
        }
    }

    fn remove_token(
        &self,
        user_id: UserId,
        channel: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let tokens = Arc::clone(&self.tokens);
        let available = self.check_available();
        let channel = channel.to_string();

        async move {
            available?;
            let mut guard = tokens
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;
            if let Some(channels) = guard.get_mut(&user_id) {
                channels.remove(&channel);
                if channels.is_empty() {
                    guard.remove(&user_id);
                }
            }
            Ok(())
        }
    }

    fn channels(&self, user_id: UserId) -> impl Future<Output = Result<Vec<String>>> + Send {
        let tokens = Arc::clone(&self.tokens);
        let available = self.check_available();

        async move {
            available?;
            let mut guard = tokens
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;

            let now = Instant::now();
            let Some(channels) = guard.get_mut(&user_id) else {
                return Ok(Vec::new());
            };
            // Expired tokens are dropped here, mirroring the lazy cleanup the
            // Redis implementation gets from key TTLs.
            channels.retain(|_, (_, expiry)| *expiry > now);

            let mut names: Vec<String> = channels.keys().cloned().collect();
            names.sort();
            Ok(names)
        }
    }

    fn token(
        &self,
        user_id: UserId,
        channel: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send {
        let tokens = Arc::clone(&self.tokens);
        let available = self.check_available();
        let channel = channel.to_string();

        async move {
            available?;
            let guard = tokens
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;

            let now = Instant::now();
            Ok(guard
                .get(&user_id)
                .and_then(|channels| channels.get(&channel))
                .filter(|(_, expiry)| *expiry > now)
                .map(|(token, _)| token.clone()))
        }
    }
}
