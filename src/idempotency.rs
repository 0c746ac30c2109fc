//! Request-level idempotency guard.
//!
//! Deduplicates retried client requests using a caller-supplied key. A
//! marker is written with an atomic set-if-absent under a short TTL; presence
//! of the marker means "already processed".

use crate::config::IdempotencyConfig;
use crate::providers::IdempotencyStore;
use crate::state::UserId;

/// Deduplicates requests keyed by `(user, client key)`.
#[derive(Clone)]
pub struct IdempotencyGuard<S>
where
    S: IdempotencyStore + Clone,
{
    store: S,
    config: IdempotencyConfig,
}

impl<S> IdempotencyGuard<S>
where
    S: IdempotencyStore + Clone,
{
    /// Create a new idempotency guard.
    #[must_use]
    pub const fn new(store: S, config: IdempotencyConfig) -> Self {
        Self { store, config }
    }

    /// Atomically record `(user, client key)` if unseen.
    ///
    /// # Returns
    ///
    /// - `true` when `client_key` is `None` or empty — the caller explicitly
    ///   opted out of deduplication.
    /// - `true` when the key was not seen within the TTL — first time,
    ///   proceed.
    /// - `false` when the key already exists — duplicate, the caller must
    ///   skip all side effects.
    ///
    /// On storage error this **fails open** (returns `true`): availability of
    /// message delivery outranks strict duplicate suppression, because a
    /// duplicate send is a recoverable UX annoyance rather than data
    /// corruption. The rate limiter makes the opposite call (fails closed);
    /// the asymmetry is intentional — do not harmonize the two.
    pub async fn check_and_set(&self, user_id: UserId, client_key: Option<&str>) -> bool {
        let Some(key) = client_key.filter(|k| !k.is_empty()) else {
            return true;
        };

        match self
            .store
            .set_if_absent(user_id, key, self.config.record_ttl)
            .await
        {
            Ok(is_new) => {
                if !is_new {
                    tracing::info!(
                        user_id = %user_id,
                        client_key = %key,
                        "Duplicate request suppressed"
                    );
                }
                is_new
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    client_key = %key,
                    error = %e,
                    "Idempotency store unavailable, failing open"
                );
                true
            }
        }
    }

    /// Best-effort removal of a dedup record. Storage errors are logged and
    /// absorbed — this never raises.
    pub async fn clear(&self, user_id: UserId, client_key: &str) {
        if client_key.is_empty() {
            return;
        }

        if let Err(e) = self.store.remove(user_id, client_key).await {
            tracing::warn!(
                user_id = %user_id,
                client_key = %client_key,
                error = %e,
                "Failed to clear idempotency record"
            );
        }
    }

    /// Generate a fresh opaque idempotency token for callers that do not
    /// supply their own. 128 bits of randomness — collision-free for
    /// practical purposes.
    #[must_use]
    pub fn generate_key() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::mocks::MockIdempotencyStore;
    use std::time::Duration;

    fn guard(ttl: Duration) -> (IdempotencyGuard<MockIdempotencyStore>, MockIdempotencyStore) {
        let store = MockIdempotencyStore::new();
        let guard = IdempotencyGuard::new(
            store.clone(),
            IdempotencyConfig::new().with_record_ttl(ttl),
        );
        (guard, store)
    }

    #[tokio::test]
    async fn first_call_is_new_second_is_duplicate() {
        let (guard, _) = guard(Duration::from_secs(60));
        let user = UserId::new();

        assert!(guard.check_and_set(user, Some("k1")).await);
        assert!(!guard.check_and_set(user, Some("k1")).await);
    }

    #[tokio::test]
    async fn same_key_different_users_are_independent() {
        let (guard, _) = guard(Duration::from_secs(60));

        assert!(guard.check_and_set(UserId::new(), Some("k1")).await);
        assert!(guard.check_and_set(UserId::new(), Some("k1")).await);
    }

    #[tokio::test]
    async fn missing_or_empty_key_always_passes() {
        let (guard, _) = guard(Duration::from_secs(60));
        let user = UserId::new();

        assert!(guard.check_and_set(user, None).await);
        assert!(guard.check_and_set(user, None).await);
        assert!(guard.check_and_set(user, Some("")).await);
        assert!(guard.check_and_set(user, Some("")).await);
    }

    #[tokio::test]
    async fn record_expires_after_ttl() {
        let (guard, _) = guard(Duration::from_millis(50));
        let user = UserId::new();

        assert!(guard.check_and_set(user, Some("k1")).await);
        assert!(!guard.check_and_set(user, Some("k1")).await);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(guard.check_and_set(user, Some("k1")).await);
    }

    #[tokio::test]
    async fn storage_failure_fails_open() {
        let (guard, store) = guard(Duration::from_secs(60));
        store.set_unavailable(true);

        assert!(guard.check_and_set(UserId::new(), Some("k1")).await);
    }

    #[tokio::test]
    async fn clear_allows_reuse_and_absorbs_failures() {
        let (guard, store) = guard(Duration::from_secs(60));
        let user = UserId::new();

        assert!(guard.check_and_set(user, Some("k1")).await);
        guard.clear(user, "k1").await;
        assert!(guard.check_and_set(user, Some("k1")).await);

        // A failing clear must not panic or raise.
        store.set_unavailable(true);
        guard.clear(user, "k1").await;
    }

    #[test]
    fn generated_keys_are_unique_and_non_empty() {
        let a = IdempotencyGuard::<MockIdempotencyStore>::generate_key();
        let b = IdempotencyGuard::<MockIdempotencyStore>::generate_key();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }
}
