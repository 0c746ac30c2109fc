//! Mock idempotency store for testing.

use crate::error::{ChatError, Result};
use crate::providers::IdempotencyStore;
use crate::state::UserId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// In-memory idempotency store with real TTL expiry.
#[derive(Debug, Clone)]
pub struct MockIdempotencyStore {
    /// `(user, client key) → expiry instant`.
    records: Arc<Mutex<HashMap<(UserId, String), Instant>>>,
    unavailable: Arc<AtomicBool>,
}

impl MockIdempotencyStore {
    /// Create a new mock idempotency store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
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
                "mock idempotency store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MockIdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdempotencyStore for MockIdempotencyStore {
    fn set_if_absent(
        &self,
        user_id: UserId,
        client_key: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool>> + Send {
        let records = Arc::clone(&self.records);
        let available = self.check_available();
        let key = (user_id, client_key.to_string());

        async move {
            available?;
            let mut guard = records
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;

            let now = Instant::now();
            match guard.get(&key) {
                Some(expiry) if *expiry > now => Ok(false),
                _ => {
                    guard.insert(key, now + ttl);
                    Ok(true)
                }
            }
        }
    }

    fn remove(
        &self,
        user_id: UserId,
        client_key: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let records = Arc::clone(&self.records);
        let available = self.check_available();
        let key = (user_id, client_key.to_string());

        async move {
            available?;
            let mut guard = records
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;
            guard.remove(&key);
            Ok(())
        }
    }
}
