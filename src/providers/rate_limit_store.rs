//! Rate-limit window store trait.

use crate::error::Result;
use crate::state::UserId;
use std::time::Duration;

/// Storage for sliding-window rate limit entries keyed by `(user, category)`.
///
/// Each accepted request leaves one timestamped entry; entries older than the
/// window are prunable garbage and are cleaned up on every check.
pub trait RateLimitStore: Send + Sync {
    /// Prune entries older than `window`, count the remainder, and — only if
    /// the count is below `limit` — record a new entry. One atomic operation.
    ///
    /// A denied request records nothing, so a saturated key recovers as soon
    /// as the window slides past its oldest entry.
    ///
    /// # Returns
    ///
    /// `true` if the request was within the limit and recorded.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable. (The limiter fails
    /// closed on this; see [`RateLimiter`](crate::rate_limit::RateLimiter).)
    fn check_and_record(
        &self,
        user_id: UserId,
        category: &str,
        limit: u32,
        window: Duration,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// In-window entry count for `(user, category)` after pruning.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn count(
        &self,
        user_id: UserId,
        category: &str,
        window: Duration,
    ) -> impl std::future::Future<Output = Result<u32>> + Send;
}
