//! Per-destination-category sliding-window rate limiter.
//!
//! Bounds request throughput per `(user, category)` pair. The window store
//! prunes stale entries, counts the remainder, and records a new entry only
//! when the request is within the limit — a denied request leaves no trace.

use crate::config::RateLimitConfig;
use crate::providers::RateLimitStore;
use crate::state::UserId;

/// Sliding-window rate limiter over a shared [`RateLimitStore`].
#[derive(Clone)]
pub struct RateLimiter<S>
where
    S: RateLimitStore + Clone,
{
    store: S,
    config: RateLimitConfig,
}

impl<S> RateLimiter<S>
where
    S: RateLimitStore + Clone,
{
    /// Sentinel remaining-quota value returned while the limiter is disabled.
    pub const UNLIMITED: u32 = u32::MAX;

    /// Create a new rate limiter.
    #[must_use]
    pub const fn new(store: S, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Effective limit for `category`:
    /// `base_rate_per_second × window_seconds × burst_multiplier × category_multiplier`,
    /// floored. Unrecognized categories use multiplier 1.0.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // floored product of small config values
    pub fn limit_for(&self, category: &str) -> u32 {
        let limit = f64::from(self.config.base_rate_per_second)
            * self.config.window.as_secs_f64()
            * self.config.burst_multiplier
            * self.config.category_multiplier(category);
        limit.max(0.0).floor() as u32
    }

    /// Check whether one more request from `user_id` in `category` is within
    /// the limit, recording it if so.
    ///
    /// Always `true` when the limiter is globally disabled.
    ///
    /// On storage error this **fails closed** (returns `false`): unchecked
    /// throughput is a resource-exhaustion risk to the whole system, so the
    /// safe default under uncertainty is to deny. The idempotency guard makes
    /// the opposite call (fails open); the asymmetry is intentional — do not
    /// harmonize the two.
    pub async fn is_allowed(&self, user_id: UserId, category: &str) -> bool {
        if !self.config.enabled {
            return true;
        }

        let limit = self.limit_for(category);

        match self
            .store
            .check_and_record(user_id, category, limit, self.config.window)
            .await
        {
            Ok(allowed) => {
                if !allowed {
                    tracing::warn!(
                        rate_limit_exceeded = true,
                        user_id = %user_id,
                        category = %category,
                        limit = limit,
                        "Rate limit exceeded"
                    );
                }
                allowed
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    category = %category,
                    error = %e,
                    "Rate limit store unavailable, failing closed"
                );
                false
            }
        }
    }

    /// Remaining quota for `(user, category)`: `limit − current count`,
    /// clamped at 0. Returns [`Self::UNLIMITED`] while the limiter is
    /// disabled and 0 on storage error (consistent with failing closed).
    pub async fn remaining_quota(&self, user_id: UserId, category: &str) -> u32 {
        if !self.config.enabled {
            return Self::UNLIMITED;
        }

        let limit = self.limit_for(category);

        match self.store.count(user_id, category, self.config.window).await {
            Ok(count) => limit.saturating_sub(count),
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    category = %category,
                    error = %e,
                    "Rate limit store unavailable, reporting zero quota"
                );
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::mocks::MockRateLimitStore;
    use std::time::Duration;

    fn limiter(config: RateLimitConfig) -> (RateLimiter<MockRateLimitStore>, MockRateLimitStore) {
        let store = MockRateLimitStore::new();
        (RateLimiter::new(store.clone(), config), store)
    }

    #[tokio::test]
    async fn allows_exactly_the_limit_then_denies() {
        let (limiter, _) = limiter(
            RateLimitConfig::new()
                .with_base_rate(5)
                .with_window(Duration::from_secs(1)),
        );
        let user = UserId::new();

        for i in 1..=5 {
            assert!(
                limiter.is_allowed(user, "message").await,
                "request {i} should be allowed"
            );
        }
        assert!(!limiter.is_allowed(user, "message").await);
    }

    #[tokio::test]
    async fn category_multiplier_scales_the_limit() {
        // base 10/sec × window 1s × burst 1.0 × category 1.5 = 15.
        let (limiter, _) = limiter(
            RateLimitConfig::new()
                .with_base_rate(10)
                .with_window(Duration::from_secs(1))
                .with_category_multiplier("message", 1.5),
        );
        let user = UserId::new();

        assert_eq!(limiter.limit_for("message"), 15);

        for i in 1..=15 {
            assert!(
                limiter.is_allowed(user, "message").await,
                "request {i} should be allowed"
            );
        }
        assert!(!limiter.is_allowed(user, "message").await);
    }

    #[tokio::test]
    async fn categories_are_independent() {
        let (limiter, _) = limiter(
            RateLimitConfig::new()
                .with_base_rate(2)
                .with_window(Duration::from_secs(1)),
        );
        let user = UserId::new();

        assert!(limiter.is_allowed(user, "message").await);
        assert!(limiter.is_allowed(user, "message").await);
        assert!(!limiter.is_allowed(user, "message").await);

        // A different category has its own window.
        assert!(limiter.is_allowed(user, "typing").await);
    }

    #[tokio::test]
    async fn window_expiry_re_allows() {
        let (limiter, _) = limiter(
            RateLimitConfig::new()
                .with_base_rate(20)
                .with_window(Duration::from_millis(100)),
        );
        let user = UserId::new();

        while limiter.is_allowed(user, "message").await {}

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(limiter.is_allowed(user, "message").await);
    }

    #[tokio::test]
    async fn denied_requests_record_nothing() {
        let (limiter, store) = limiter(
            RateLimitConfig::new()
                .with_base_rate(2)
                .with_window(Duration::from_secs(1)),
        );
        let user = UserId::new();

        assert!(limiter.is_allowed(user, "message").await);
        assert!(limiter.is_allowed(user, "message").await);
        assert!(!limiter.is_allowed(user, "message").await);
        assert!(!limiter.is_allowed(user, "message").await);

        // Only the two accepted requests left entries.
        let count = store
            .entry_count(user, "message");
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn disabled_limiter_allows_everything() {
        let (limiter, _) = limiter(RateLimitConfig::new().with_enabled(false).with_base_rate(0));
        let user = UserId::new();

        for _ in 0..50 {
            assert!(limiter.is_allowed(user, "message").await);
        }
        assert_eq!(
            limiter.remaining_quota(user, "message").await,
            RateLimiter::<MockRateLimitStore>::UNLIMITED
        );
    }

    #[tokio::test]
    async fn storage_failure_fails_closed() {
        let (limiter, store) = limiter(RateLimitConfig::new());
        store.set_unavailable(true);

        assert!(!limiter.is_allowed(UserId::new(), "message").await);
        assert_eq!(limiter.remaining_quota(UserId::new(), "message").await, 0);
    }

    #[tokio::test]
    async fn remaining_quota_counts_down_and_clamps() {
        let (limiter, _) = limiter(
            RateLimitConfig::new()
                .with_base_rate(3)
                .with_window(Duration::from_secs(1)),
        );
        let user = UserId::new();

        assert_eq!(limiter.remaining_quota(user, "message").await, 3);
        limiter.is_allowed(user, "message").await;
        assert_eq!(limiter.remaining_quota(user, "message").await, 2);

        for _ in 0..5 {
            limiter.is_allowed(user, "message").await;
        }
        assert_eq!(limiter.remaining_quota(user, "message").await, 0);
    }
}
