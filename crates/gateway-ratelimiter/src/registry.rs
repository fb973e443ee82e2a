//! A rate limiter instance per `(provider, tenant)` pair, the shape the
//! gateway actually needs: one tenant's burst against one provider must
//! not starve that same tenant against a different provider, nor another
//! tenant against the same provider.

use std::time::Duration;

use gateway_core::Registry;

use crate::config::RateLimiterConfig;
use crate::error::RateLimiterError;
use crate::limiter::SharedRateLimiter;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimiterKey {
    pub provider_id: String,
    pub tenant_id: String,
}

impl RateLimiterKey {
    pub fn new(provider_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            tenant_id: tenant_id.into(),
        }
    }
}

/// Lazily creates and caches one [`SharedRateLimiter`] per key, all
/// sharing the same `RateLimiterConfig` template. Built on
/// `gateway_core::Registry`, the same copy-on-write map the circuit
/// breaker registry uses, so neither needs a mutex-guarded `HashMap` of
/// its own.
pub struct TenantRateLimiterRegistry {
    config: RateLimiterConfig,
    limiters: Registry<RateLimiterKey, SharedRateLimiter>,
}

impl TenantRateLimiterRegistry {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            limiters: Registry::new(),
        }
    }

    /// Attempts to acquire a permit for `key` without blocking. On
    /// rejection, the `RateLimiterError` converts into a
    /// `GatewayError::RateLimited` carrying the wait hint as `retry_after`.
    pub fn try_acquire(&self, key: RateLimiterKey) -> Result<(), RateLimiterError> {
        self.try_acquire_n(key, 1)
    }

    /// Attempts to acquire `permits` permits for `key` without blocking.
    pub fn try_acquire_n(&self, key: RateLimiterKey, permits: usize) -> Result<(), RateLimiterError> {
        let limiter = self.limiter_for(key);
        limiter
            .try_acquire_now(permits)
            .map_err(|_wait| RateLimiterError::RateLimitExceeded)
    }

    pub fn available_permits(&self, key: RateLimiterKey) -> usize {
        self.limiter_for(key).available_permits()
    }

    /// Drops the cached limiter for `key`, so the next access starts a
    /// fresh window. Used when a tenant's plan changes mid-flight.
    pub fn reset(&self, key: &RateLimiterKey) {
        self.limiters.remove(key);
    }

    fn limiter_for(&self, key: RateLimiterKey) -> std::sync::Arc<SharedRateLimiter> {
        let window_type = self.config.window_type;
        let limit = self.config.limit_for_period;
        let refresh = self.config.refresh_period;
        let timeout = self.config.timeout_duration;
        self.limiters
            .get_or_insert_with(key, move || SharedRateLimiter::new(window_type, limit, refresh, timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[test]
    fn separate_keys_get_separate_budgets() {
        let cfg = RateLimiterConfig {
            window_type: crate::WindowType::TokenBucket,
            limit_for_period: 1,
            refresh_period: StdDuration::from_secs(10),
            timeout_duration: StdDuration::from_millis(0),
            event_listeners: gateway_core::events::EventListeners::new(),
            name: "test".into(),
        };
        let registry = TenantRateLimiterRegistry::new(cfg);

        let a = RateLimiterKey::new("openai", "acme");
        let b = RateLimiterKey::new("openai", "globex");

        assert!(registry.try_acquire(a.clone()).is_ok());
        assert!(registry.try_acquire(a).is_err());
        // Different tenant, same provider: untouched budget.
        assert!(registry.try_acquire(b).is_ok());
    }

    #[test]
    fn reset_restores_budget() {
        let cfg = RateLimiterConfig {
            window_type: crate::WindowType::TokenBucket,
            limit_for_period: 1,
            refresh_period: StdDuration::from_secs(10),
            timeout_duration: StdDuration::from_millis(0),
            event_listeners: gateway_core::events::EventListeners::new(),
            name: "test".into(),
        };
        let registry = TenantRateLimiterRegistry::new(cfg);
        let key = RateLimiterKey::new("openai", "acme");

        assert!(registry.try_acquire(key.clone()).is_ok());
        assert!(registry.try_acquire(key.clone()).is_err());

        registry.reset(&key);
        assert!(registry.try_acquire(key).is_ok());
    }
}
