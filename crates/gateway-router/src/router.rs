//! The router itself: filters a candidate set and applies the effective
//! strategy to produce a [`RoutingDecision`].

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use gateway_core::error::GatewayError;

use crate::candidate::RoutingCandidate;
use crate::config::RoutingConfig;
use crate::context::RoutingContext;
use crate::decision::RoutingDecision;
use crate::events::RouterEvent;
use crate::strategy::rank;

fn filter_candidates(
    candidates: Vec<RoutingCandidate>,
    context: &RoutingContext,
    config: &RoutingConfig,
) -> Vec<RoutingCandidate> {
    candidates
        .into_iter()
        .filter(|c| match &context.pool_id {
            Some(pool_id) => config
                .pool(pool_id)
                .map(|members| members.contains(&c.provider_id))
                .unwrap_or(false),
            None => true,
        })
        .filter(|c| !context.excluded_providers.contains(&c.provider_id))
        .filter(|c| c.health.is_usable())
        .collect()
}

/// Resolves a candidate set into a [`RoutingDecision`]. Holds its config
/// behind an `ArcSwap` so [`Router::reload_config`] takes effect on the
/// very next call without blocking callers already mid-route.
pub struct Router {
    config: ArcSwap<RoutingConfig>,
    round_robin_counter: AtomicUsize,
}

impl Router {
    pub fn new(config: RoutingConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            round_robin_counter: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> Arc<RoutingConfig> {
        self.config.load_full()
    }

    pub fn reload_config(&self, config: RoutingConfig) {
        self.config.store(Arc::new(config));
    }

    /// Filters `candidates` (by pool, exclusion list, and health), applies
    /// the effective strategy (the context's override, or the config
    /// default), and returns a decision naming the selected provider and
    /// up to 2 ordered fallbacks.
    ///
    /// Fails with [`GatewayError::NoCompatibleProvider`] if no candidate
    /// survives filtering, or with the strategy's own error (currently
    /// only `UserSelected` can fail that way).
    pub fn route(
        &self,
        model_id: &str,
        candidates: Vec<RoutingCandidate>,
        context: &RoutingContext,
    ) -> Result<RoutingDecision, GatewayError> {
        let config = self.config.load_full();
        let filtered = filter_candidates(candidates, context, &config);

        if filtered.is_empty() {
            config.event_listeners.emit(&RouterEvent::NoCandidates {
                model_id: model_id.to_string(),
                timestamp: Instant::now(),
            });
            return Err(GatewayError::NoCompatibleProvider {
                model_id: model_id.to_string(),
            });
        }

        let strategy = context.strategy.unwrap_or_else(|| config.default_strategy());
        let ranked = rank(
            strategy,
            &filtered,
            context,
            &config,
            &self.round_robin_counter,
        )?;

        let selected = ranked
            .first()
            .expect("non-empty filtered set yields at least one ranked candidate");

        let fallback_provider_ids = ranked
            .iter()
            .skip(1)
            .take(2)
            .map(|r| r.candidate.provider_id.clone())
            .collect();

        let decision = RoutingDecision {
            selected_provider_id: selected.candidate.provider_id.clone(),
            pool_id: context.pool_id.clone(),
            strategy,
            score: selected.score,
            fallback_provider_ids,
            timestamp: Instant::now(),
        };

        config.event_listeners.emit(&RouterEvent::DecisionMade {
            model_id: model_id.to_string(),
            provider_id: decision.selected_provider_id.clone(),
            strategy,
            score: decision.score,
            timestamp: decision.timestamp,
        });

        Ok(decision)
    }
}
