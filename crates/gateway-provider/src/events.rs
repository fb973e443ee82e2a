//! Observability events emitted by [`crate::registry::ProviderRegistry`].

use std::time::Instant;

use gateway_core::events::GatewayEvent;

use crate::health::HealthStatus;

/// Lifecycle events emitted by the provider registry's probe loop.
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    /// A provider's reported health status changed.
    HealthChanged {
        provider_id: String,
        timestamp: Instant,
        from: HealthStatus,
        to: HealthStatus,
    },
    /// A health probe failed to complete within the configured timeout.
    ProbeTimedOut {
        provider_id: String,
        timestamp: Instant,
    },
}

impl GatewayEvent for ProviderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProviderEvent::HealthChanged { .. } => "health_changed",
            ProviderEvent::ProbeTimedOut { .. } => "probe_timed_out",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ProviderEvent::HealthChanged { timestamp, .. }
            | ProviderEvent::ProbeTimedOut { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            ProviderEvent::HealthChanged { provider_id, .. }
            | ProviderEvent::ProbeTimedOut { provider_id, .. } => provider_id,
        }
    }
}
