//! Routing configuration: pools, weights, and the strategy used absent a
//! per-request override. Reloadable at runtime — [`crate::router::Router`]
//! holds this behind an `ArcSwap` so a config reload takes effect on the
//! next routing call without locking out in-flight ones.

use std::collections::HashMap;
use std::time::Duration;

use gateway_core::events::{EventListeners, FnListener};

use crate::decision::RoutingStrategy;
use crate::events::RouterEvent;

/// Tunables for [`crate::router::Router`].
#[derive(Clone)]
pub struct RoutingConfig {
    pub(crate) default_strategy: RoutingStrategy,
    /// Pool id to member provider ids.
    pub(crate) pools: HashMap<String, Vec<String>>,
    /// Per-provider weight, consulted by WEIGHTED_RANDOM and SCORED.
    pub(crate) weights: HashMap<String, f64>,
    pub(crate) auto_failover: bool,
    pub(crate) max_retries: u32,
    pub(crate) retry_delay: Duration,
    pub(crate) health_interval: Duration,
    pub(crate) prefer_local: bool,
    pub(crate) event_listeners: EventListeners<RouterEvent>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_strategy: RoutingStrategy::default(),
            pools: HashMap::new(),
            weights: HashMap::new(),
            auto_failover: true,
            max_retries: 2,
            retry_delay: Duration::from_millis(200),
            health_interval: Duration::from_secs(10),
            prefer_local: false,
            event_listeners: EventListeners::new(),
        }
    }
}

impl RoutingConfig {
    pub fn builder() -> RoutingConfigBuilder {
        RoutingConfigBuilder::default()
    }

    pub fn default_strategy(&self) -> RoutingStrategy {
        self.default_strategy
    }

    pub fn pool(&self, pool_id: &str) -> Option<&[String]> {
        self.pools.get(pool_id).map(|v| v.as_slice())
    }

    pub fn weight_of(&self, provider_id: &str) -> Option<f64> {
        self.weights.get(provider_id).copied()
    }

    pub fn auto_failover(&self) -> bool {
        self.auto_failover
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn health_interval(&self) -> Duration {
        self.health_interval
    }

    pub fn prefer_local(&self) -> bool {
        self.prefer_local
    }
}

/// Builder for [`RoutingConfig`].
#[derive(Default)]
pub struct RoutingConfigBuilder {
    default_strategy: Option<RoutingStrategy>,
    pools: HashMap<String, Vec<String>>,
    weights: HashMap<String, f64>,
    auto_failover: Option<bool>,
    max_retries: Option<u32>,
    retry_delay: Option<Duration>,
    health_interval: Option<Duration>,
    prefer_local: Option<bool>,
    event_listeners: EventListeners<RouterEvent>,
}

impl RoutingConfigBuilder {
    /// Default: [`RoutingStrategy::Scored`].
    pub fn default_strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.default_strategy = Some(strategy);
        self
    }

    /// Defines (or replaces) a pool's membership list.
    pub fn pool(mut self, pool_id: impl Into<String>, provider_ids: Vec<String>) -> Self {
        self.pools.insert(pool_id.into(), provider_ids);
        self
    }

    /// Sets a provider's weight. Must be `>= 0.0`; enforced by [`Self::build`].
    pub fn weight(mut self, provider_id: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(provider_id.into(), weight);
        self
    }

    /// Default: `true`.
    pub fn auto_failover(mut self, auto_failover: bool) -> Self {
        self.auto_failover = Some(auto_failover);
        self
    }

    /// Default: 2. Must be `>= 0`.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Default: 200 milliseconds.
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = Some(retry_delay);
        self
    }

    /// Default: 10 seconds.
    pub fn health_interval(mut self, health_interval: Duration) -> Self {
        self.health_interval = Some(health_interval);
        self
    }

    /// Default: `false`.
    pub fn prefer_local(mut self, prefer_local: bool) -> Self {
        self.prefer_local = Some(prefer_local);
        self
    }

    /// Registers a callback invoked after every successful routing
    /// decision, receiving `(model_id, provider_id, score)`.
    pub fn on_decision<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str, f64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RouterEvent::DecisionMade {
                model_id,
                provider_id,
                score,
                ..
            } = event
            {
                f(model_id, provider_id, *score);
            }
        }));
        self
    }

    /// Panics-free; invalid weights are clamped to `0.0` rather than
    /// rejected, since a config reload should never be able to crash the
    /// router mid-flight.
    pub fn build(self) -> RoutingConfig {
        let default = RoutingConfig::default();
        let weights = self
            .weights
            .into_iter()
            .map(|(provider_id, weight)| (provider_id, weight.max(0.0)))
            .collect();

        RoutingConfig {
            default_strategy: self.default_strategy.unwrap_or(default.default_strategy),
            pools: self.pools,
            weights,
            auto_failover: self.auto_failover.unwrap_or(default.auto_failover),
            max_retries: self.max_retries.unwrap_or(default.max_retries),
            retry_delay: self.retry_delay.unwrap_or(default.retry_delay),
            health_interval: self.health_interval.unwrap_or(default.health_interval),
            prefer_local: self.prefer_local.unwrap_or(default.prefer_local),
            event_listeners: self.event_listeners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RoutingConfig::default();
        assert_eq!(config.default_strategy(), RoutingStrategy::Scored);
        assert!(config.auto_failover());
        assert_eq!(config.max_retries(), 2);
        assert_eq!(config.retry_delay(), Duration::from_millis(200));
        assert_eq!(config.health_interval(), Duration::from_secs(10));
        assert!(!config.prefer_local());
    }

    #[test]
    fn negative_weights_are_clamped_to_zero() {
        let config = RoutingConfig::builder().weight("p1", -5.0).build();
        assert_eq!(config.weight_of("p1"), Some(0.0));
    }

    #[test]
    fn pools_round_trip() {
        let config = RoutingConfig::builder()
            .pool("pool-a", vec!["p1".into(), "p2".into()])
            .build();
        assert_eq!(
            config.pool("pool-a"),
            Some(["p1".to_string(), "p2".to_string()].as_slice())
        );
        assert!(config.pool("missing").is_none());
    }
}
