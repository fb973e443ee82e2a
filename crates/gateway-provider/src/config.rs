//! Configuration for the provider registry's background health probing.

use std::time::Duration;

use gateway_core::events::{EventListeners, FnListener};

use crate::events::ProviderEvent;

/// Tunables for [`crate::registry::ProviderRegistry`]'s probe loop.
#[derive(Clone)]
pub struct ProviderRegistryConfig {
    pub(crate) interval: Duration,
    pub(crate) initial_delay: Duration,
    pub(crate) timeout: Duration,
    pub(crate) success_threshold: u32,
    pub(crate) failure_threshold: u32,
    pub(crate) event_listeners: EventListeners<ProviderEvent>,
}

impl Default for ProviderRegistryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            initial_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(3),
            success_threshold: 1,
            failure_threshold: 2,
            event_listeners: EventListeners::new(),
        }
    }
}

impl ProviderRegistryConfig {
    pub fn builder() -> ProviderRegistryConfigBuilder {
        ProviderRegistryConfigBuilder::default()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn success_threshold(&self) -> u32 {
        self.success_threshold
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }
}

/// Builder for [`ProviderRegistryConfig`].
#[derive(Default)]
pub struct ProviderRegistryConfigBuilder {
    interval: Option<Duration>,
    initial_delay: Option<Duration>,
    timeout: Option<Duration>,
    success_threshold: Option<u32>,
    failure_threshold: Option<u32>,
    event_listeners: EventListeners<ProviderEvent>,
}

impl ProviderRegistryConfigBuilder {
    /// Default: 10 seconds.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Default: 500 milliseconds.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Default: 3 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Default: 1.
    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = Some(threshold);
        self
    }

    /// Default: 2.
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    /// Registers a callback invoked whenever a provider's health status
    /// changes, receiving `(provider_id, old_status, new_status)`.
    pub fn on_health_changed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, crate::health::HealthStatus, crate::health::HealthStatus) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ProviderEvent::HealthChanged {
                provider_id,
                from,
                to,
                ..
            } = event
            {
                f(provider_id, *from, *to);
            }
        }));
        self
    }

    pub fn build(self) -> ProviderRegistryConfig {
        let default = ProviderRegistryConfig::default();
        ProviderRegistryConfig {
            interval: self.interval.unwrap_or(default.interval),
            initial_delay: self.initial_delay.unwrap_or(default.initial_delay),
            timeout: self.timeout.unwrap_or(default.timeout),
            success_threshold: self.success_threshold.unwrap_or(default.success_threshold),
            failure_threshold: self.failure_threshold.unwrap_or(default.failure_threshold),
            event_listeners: self.event_listeners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ProviderRegistryConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(10));
        assert_eq!(config.initial_delay(), Duration::from_millis(500));
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.success_threshold(), 1);
        assert_eq!(config.failure_threshold(), 2);
    }

    #[test]
    fn builder_overrides_only_set_fields() {
        let config = ProviderRegistryConfig::builder()
            .interval(Duration::from_secs(30))
            .failure_threshold(5)
            .build();

        assert_eq!(config.interval(), Duration::from_secs(30));
        assert_eq!(config.failure_threshold(), 5);
        assert_eq!(config.timeout(), Duration::from_secs(3));
    }
}
