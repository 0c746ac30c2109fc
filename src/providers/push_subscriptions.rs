//! Push subscription store trait.

use crate::error::Result;
use crate::state::UserId;
use std::time::Duration;

/// Storage for push notification registrations: `(user, channel) → token`
/// with TTL, plus the per-user set of subscribed channel names.
///
/// Multiple channels per user (e.g. `"mobile"`, `"web"`) are legal and
/// independent.
pub trait PushSubscriptionStore: Send + Sync {
    /// Store (or refresh) the token for `(user, channel)` with `ttl`.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn save_token(
        &self,
        user_id: UserId,
        channel: &str,
        token: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Remove the token for `(user, channel)` and the channel-set entry.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn remove_token(
        &self,
        user_id: UserId,
        channel: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// The user's subscribed channel names.
    ///
    /// Implementations clean up channel entries whose token has expired.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn channels(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// The stored token for `(user, channel)`, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn token(
        &self,
        user_id: UserId,
        channel: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>>> + Send;
}
