//! Mock presence store for testing.

use crate::error::{ChatError, Result};
use crate::providers::{PresenceStore, SessionRegistration, SessionRemoval};
use crate::state::{SessionId, UserId};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory presence store.
///
/// The per-user session sets and the derived online view live under one
/// mutex, so register/remove are trivially atomic. The defensive session TTL
/// is ignored — mock sessions never expire on their own.
#[derive(Debug, Clone)]
pub struct MockPresenceStore {
    sessions: Arc<Mutex<HashMap<UserId, HashSet<SessionId>>>>,
    unavailable: Arc<AtomicBool>,
}

impl MockPresenceStore {
    /// Create a new mock presence store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
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
                "mock presence store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MockPresenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceStore for MockPresenceStore {
    fn register_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
        _ttl: Duration,
    ) -> impl Future<Output = Result<SessionRegistration>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let available = self.check_available();

        async move {
            available?;
            let mut guard = sessions
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;

            let set = guard.entry(user_id).or_default();
            let newly_added = set.insert(session_id);
            Ok(SessionRegistration {
                newly_added,
                session_count: set.len() as u64,
            })
        }
    }

    fn remove_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> impl Future<Output = Result<SessionRemoval>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let available = self.check_available();

        async move {
            available?;
            let mut guard = sessions
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;

            let Some(set) = guard.get_mut(&user_id) else {
                return Ok(SessionRemoval {
                    removed: false,
                    session_count: 0,
                });
            };

            let removed = set.remove(&session_id);
            let session_count = set.len() as u64;
            if set.is_empty() {
                guard.remove(&user_id);
            }

            Ok(SessionRemoval {
                removed,
                session_count,
            })
        }
    }

    fn is_online(&self, user_id: UserId) -> impl Future<Output = Result<bool>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let available = self.check_available();

        async move {
            available?;
            let guard = sessions
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;
            Ok(guard.get(&user_id).is_some_and(|set| !set.is_empty()))
        }
    }

    fn online_users(&self) -> impl Future<Output = Result<HashSet<UserId>>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let available = self.check_available();

        async move {
            available?;
            let guard = sessions
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;
            Ok(guard
                .iter()
                .filter(|(_, set)| !set.is_empty())
                .map(|(user, _)| *user)
                .collect())
        }
    }

    fn session_count(&self, user_id: UserId) -> impl Future<Output = Result<u64>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let available = self.check_available();

        async move {
            available?;
            let guard = sessions
                .lock()
                .map_err(|_| ChatError::StorageUnavailable("mutex poisoned".to_string()))?;
            Ok(guard.get(&user_id).map_or(0, |set| set.len() as u64))
        }
    }
}
