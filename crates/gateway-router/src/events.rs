//! Observability events emitted by [`crate::router::Router`].

use std::time::Instant;

use gateway_core::events::GatewayEvent;

use crate::decision::RoutingStrategy;

/// Lifecycle events emitted by a routing call.
#[derive(Debug, Clone)]
pub enum RouterEvent {
    /// A routing decision was made successfully.
    DecisionMade {
        model_id: String,
        provider_id: String,
        strategy: RoutingStrategy,
        score: f64,
        timestamp: Instant,
    },
    /// No candidate survived filtering; routing failed before a strategy
    /// even ran.
    NoCandidates { model_id: String, timestamp: Instant },
}

impl GatewayEvent for RouterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RouterEvent::DecisionMade { .. } => "decision_made",
            RouterEvent::NoCandidates { .. } => "no_candidates",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RouterEvent::DecisionMade { timestamp, .. }
            | RouterEvent::NoCandidates { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RouterEvent::DecisionMade { model_id, .. }
            | RouterEvent::NoCandidates { model_id, .. } => model_id,
        }
    }
}
