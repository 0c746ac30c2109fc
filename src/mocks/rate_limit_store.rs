//! Mock rate-limit store for testing.

use crate::error::{ChatError, Result};
use crate::providers::RateLimitStore;
use crate::state::UserId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// In-memory sliding-window store.
///
/// Entries are timestamp vectors per `(user, category)`; old entries are only
/// pruned during checks for that specific key, so long-running tests should
/// not rotate through unbounded key sets.
#[derive(Debug, Clone)]
pub struct MockRateLimitStore {
    entries: Arc<Mutex<HashMap<(UserId, String), Vec<Instant>>>>,
    unavailable: Arc<AtomicBool>,
}

impl MockRateLimitStore {
    /// Create a new mock rate-limit store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent operation fail with `StorageUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Raw (unpruned) entry count for a key. Test inspection helper.
    #[must_use]
    pub fn entry_count(&self, user_id: UserId, category: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(user_id, category.to_string()))
            .map_or(0, Vec::len)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ChatError::StorageUnavailable(
                "mock rate-limit store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MockRateLimitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitStore for MockRateLimitStore {
    fn check_and_record(
        &self,
        user_id: UserId,
        category: &str,
        limit: u32,
        window: Duration,
    ) -> impl Future<Output = Result<bool>> + Send {
        let entries = Arc::clone(&self.entries);
        let available = self.check_available();
        let key = (user_id, category.to_string());

        async move {
            available?;
            let mut guard = entries
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;

            let now = Instant::now();
            let timestamps = guard.entry(key).or_default();
            timestamps.retain(|ts| now.duration_since(*ts) < window);

            if timestamps.len() >= limit as usize {
                return Ok(false);
            }

            timestamps.push(now);
            Ok(true)
        }
    }

    fn count(
        &self,
        user_id: UserId,
        category: &str,
        window: Duration,
    ) -> impl Future<Output = Result<u32>> + Send {
        let entries = Arc::clone(&self.entries);
        let available = self.check_available();
        let key = (user_id, category.to_string());

        async move {
            available?;
            let mut guard = entries
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;

            let now = Instant::now();
            let Some(timestamps) = guard.get_mut(&key) else {
                return Ok(0);
            };
            timestamps.retain(|ts| now.duration_since(*ts) < window);

            #[allow(clippy::cast_possible_truncation)]
            Ok(timestamps.len() as u32)
        }
    }
}
