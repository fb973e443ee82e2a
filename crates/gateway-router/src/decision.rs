//! Selection strategies and the routing decisions they produce.

use std::time::Instant;

/// A pluggable provider-selection strategy. Each variant is a pure
/// function of `(candidates, context, config)` — see [`crate::strategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RoutingStrategy {
    RoundRobin,
    Random,
    WeightedRandom,
    LeastLoaded,
    CostOptimized,
    LatencyOptimized,
    Failover,
    #[default]
    Scored,
    UserSelected,
}

/// The outcome of one routing call: who got picked, how, and who's next
/// if the pick fails.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub selected_provider_id: String,
    pub pool_id: Option<String>,
    pub strategy: RoutingStrategy,
    /// The strategy's score for the selected provider. Meaningful for
    /// `Scored`; other strategies report `0.0`.
    pub score: f64,
    /// Up to 2 next-best candidates by the same strategy, disjoint from
    /// `selected_provider_id`.
    pub fallback_provider_ids: Vec<String>,
    pub timestamp: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_strategy_is_scored() {
        assert_eq!(RoutingStrategy::default(), RoutingStrategy::Scored);
    }
}
