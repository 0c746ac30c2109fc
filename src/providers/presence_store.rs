//! Presence store trait.

use crate::error::Result;
use crate::state::{SessionId, UserId};
use std::collections::HashSet;
use std::time::Duration;

/// Result of atomically registering a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRegistration {
    /// `true` if the session was not already registered.
    pub newly_added: bool,

    /// The user's session count immediately after the registration.
    pub session_count: u64,
}

/// Result of atomically deregistering a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRemoval {
    /// `true` if the session was actually registered before removal.
    pub removed: bool,

    /// The user's session count immediately after the removal.
    pub session_count: u64,
}

/// Shared presence state: a session-id set per user plus a global online-user
/// set.
///
/// # Invariant
///
/// A user is a member of the global online set **iff** their session set is
/// non-empty. Implementations must mutate both structures in a single atomic
/// operation; computing "was the count 0" and "register" as two separate
/// round-trips is a race that produces duplicate or missing presence
/// broadcasts when sessions connect concurrently.
pub trait PresenceStore: Send + Sync {
    /// Register a session and read the resulting session count, atomically.
    ///
    /// The per-user session set carries `ttl` as a defensive expiry so an
    /// abrupt disconnect that never calls [`remove_session`] self-heals.
    ///
    /// [`remove_session`]: PresenceStore::remove_session
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StorageUnavailable`](crate::ChatError::StorageUnavailable)
    /// if the backing store is unreachable.
    fn register_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<SessionRegistration>> + Send;

    /// Deregister a session and read the resulting session count, atomically.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn remove_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<SessionRemoval>> + Send;

    /// O(1) membership query against the global online set.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn is_online(&self, user_id: UserId) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// The full global online set.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable. (The tracker maps
    /// this to an empty set; see
    /// [`PresenceTracker::online_users`](crate::presence::PresenceTracker::online_users).)
    fn online_users(&self) -> impl std::future::Future<Output = Result<HashSet<UserId>>> + Send;

    /// Number of live sessions for a user.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn session_count(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;
}
