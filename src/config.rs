//! Component configuration.
//!
//! Configuration values are provided by the embedding application, not
//! hardcoded in the components. Every config has sensible defaults and
//! builder-style setters.

use std::collections::HashMap;
use std::time::Duration;

/// Presence tracker configuration.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// Defensive TTL on session entries so an abrupt disconnect that never
    /// reaches `set_offline` cannot inflate presence forever.
    ///
    /// Default: 1 hour.
    pub session_ttl: Duration,
}

impl PresenceConfig {
    /// Create a presence configuration with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session_ttl: Duration::from_secs(3600),
        }
    }

    /// Set the defensive session TTL.
    #[must_use]
    pub const fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Idempotency guard configuration.
#[derive(Debug, Clone)]
pub struct IdempotencyConfig {
    /// How long a processed request key is remembered. Retries inside this
    /// window are treated as duplicates.
    ///
    /// Default: 5 minutes.
    pub record_ttl: Duration,
}

impl IdempotencyConfig {
    /// Create an idempotency configuration with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            record_ttl: Duration::from_secs(300),
        }
    }

    /// Set the dedup record TTL.
    #[must_use]
    pub const fn with_record_ttl(mut self, ttl: Duration) -> Self {
        self.record_ttl = ttl;
        self
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate limiter configuration.
///
/// The effective limit for a `(user, category)` pair is
/// `base_rate_per_second × window_seconds × burst_multiplier × category_multiplier`,
/// floored. Categories without an explicit multiplier use `1.0`.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Global kill switch. When `false`, every request is allowed.
    pub enabled: bool,

    /// Base accepted request rate per second.
    ///
    /// Default: 10.
    pub base_rate_per_second: u32,

    /// Sliding window length.
    ///
    /// Default: 1 second.
    pub window: Duration,

    /// Short-burst headroom applied on top of the base rate.
    ///
    /// Default: 1.0 (no headroom).
    pub burst_multiplier: f64,

    /// Per-category multipliers keyed by category name.
    pub category_multipliers: HashMap<String, f64>,
}

impl RateLimitConfig {
    /// Create a rate limit configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: true,
            base_rate_per_second: 10,
            window: Duration::from_secs(1),
            burst_multiplier: 1.0,
            category_multipliers: HashMap::new(),
        }
    }

    /// Enable or disable rate limiting globally.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the base accepted rate per second.
    #[must_use]
    pub fn with_base_rate(mut self, per_second: u32) -> Self {
        self.base_rate_per_second = per_second;
        self
    }

    /// Set the sliding window length.
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the burst multiplier.
    #[must_use]
    pub fn with_burst_multiplier(mut self, multiplier: f64) -> Self {
        self.burst_multiplier = multiplier;
        self
    }

    /// Set the multiplier for one category.
    #[must_use]
    pub fn with_category_multiplier(mut self, category: impl Into<String>, multiplier: f64) -> Self {
        self.category_multipliers.insert(category.into(), multiplier);
        self
    }

    /// Multiplier for `category`; `1.0` for unrecognized categories.
    #[must_use]
    pub fn category_multiplier(&self, category: &str) -> f64 {
        self.category_multipliers.get(category).copied().unwrap_or(1.0)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Push notification dispatcher configuration.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Global feature switch. When `false`, token management and dispatch are
    /// silent no-ops, not errors.
    pub enabled: bool,

    /// TTL on stored push tokens. Stale registrations self-expire.
    ///
    /// Default: 30 days.
    pub token_ttl: Duration,
}

impl PushConfig {
    /// Create a push configuration with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: true,
            token_ttl: Duration::from_secs(30 * 24 * 3600),
        }
    }

    /// Enable or disable push notifications globally.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the push token TTL.
    #[must_use]
    pub const fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_config_builder() {
        let config = RateLimitConfig::new()
            .with_base_rate(10)
            .with_window(Duration::from_secs(1))
            .with_burst_multiplier(1.0)
            .with_category_multiplier("message", 1.5);

        assert!(config.enabled);
        assert_eq!(config.base_rate_per_second, 10);
        assert!((config.category_multiplier("message") - 1.5).abs() < f64::EPSILON);
        // Unrecognized categories fall back to 1.0.
        assert!((config.category_multiplier("unknown") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_ttls() {
        assert_eq!(IdempotencyConfig::default().record_ttl, Duration::from_secs(300));
        assert_eq!(PresenceConfig::default().session_ttl, Duration::from_secs(3600));
        assert!(PushConfig::default().enabled);
    }
}
