//! Idempotency record store trait.

use crate::error::Result;
use crate::state::UserId;
use std::time::Duration;

/// Storage for request deduplication markers keyed by `(user, client key)`.
///
/// Presence of a marker means "already processed"; records self-expire after
/// their TTL.
pub trait IdempotencyStore: Send + Sync {
    /// Atomic set-if-absent with TTL.
    ///
    /// # Returns
    ///
    /// `true` if the record did not previously exist (first time — proceed),
    /// `false` if it already existed (duplicate).
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable. (The guard fails
    /// open on this; see [`IdempotencyGuard`](crate::idempotency::IdempotencyGuard).)
    fn set_if_absent(
        &self,
        user_id: UserId,
        client_key: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn remove(
        &self,
        user_id: UserId,
        client_key: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
