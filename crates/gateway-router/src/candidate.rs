//! The neutral view of a provider the router's strategies operate over.
//!
//! Strategies never see a live [`gateway_provider::ProviderAdapter`] — the
//! caller (the orchestrator) snapshots whatever it needs from the provider
//! registry into one of these first, which is what keeps each strategy a
//! pure function of `(candidates, context, config)`.

use std::time::Duration;

use gateway_provider::{HealthStatus, VendorTag};

/// One routable provider, as observed at the moment routing runs.
#[derive(Debug, Clone)]
pub struct RoutingCandidate {
    pub provider_id: String,
    /// Pool this provider belongs to, if pools are in use.
    pub pool_id: Option<String>,
    pub health: HealthStatus,
    pub vendor_tag: VendorTag,
    /// Static weight, used by WEIGHTED_RANDOM absent a config override.
    pub weight: f64,
    /// Count of requests this provider is currently serving, used by
    /// LEAST_LOADED.
    pub active_requests: u64,
    /// Observed P95 latency, used by LATENCY_OPTIMIZED.
    pub p95_latency: Duration,
}

impl RoutingCandidate {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            pool_id: None,
            health: HealthStatus::Healthy,
            vendor_tag: VendorTag::Unknown,
            weight: 1.0,
            active_requests: 0,
            p95_latency: Duration::ZERO,
        }
    }

    pub fn with_pool(mut self, pool_id: impl Into<String>) -> Self {
        self.pool_id = Some(pool_id.into());
        self
    }

    pub fn with_health(mut self, health: HealthStatus) -> Self {
        self.health = health;
        self
    }

    pub fn with_vendor_tag(mut self, vendor_tag: VendorTag) -> Self {
        self.vendor_tag = vendor_tag;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_active_requests(mut self, active_requests: u64) -> Self {
        self.active_requests = active_requests;
        self
    }

    pub fn with_p95_latency(mut self, p95_latency: Duration) -> Self {
        self.p95_latency = p95_latency;
        self
    }
}
