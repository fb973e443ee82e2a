//! Per-request routing inputs, distinct from the long-lived [`crate::config::RoutingConfig`].

use gateway_core::tenant::TenantId;

use crate::decision::RoutingStrategy;

/// Everything about this particular request that might influence which
/// provider gets picked, beyond the model id itself.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    pub tenant_id: TenantId,
    /// Overrides `config.default_strategy` for this call when set.
    pub strategy: Option<RoutingStrategy>,
    pub preferred_provider: Option<String>,
    pub excluded_providers: Vec<String>,
    pub device_hint: Option<String>,
    pub cost_sensitive: bool,
    pub prefer_local: bool,
    pub priority: i32,
    pub pool_id: Option<String>,
}

impl RoutingContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            strategy: None,
            preferred_provider: None,
            excluded_providers: Vec::new(),
            device_hint: None,
            cost_sensitive: false,
            prefer_local: false,
            priority: 0,
            pool_id: None,
        }
    }

    pub fn with_strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_preferred_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.preferred_provider = Some(provider_id.into());
        self
    }

    pub fn exclude(mut self, provider_id: impl Into<String>) -> Self {
        self.excluded_providers.push(provider_id.into());
        self
    }

    pub fn with_pool(mut self, pool_id: impl Into<String>) -> Self {
        self.pool_id = Some(pool_id.into());
        self
    }

    pub fn with_cost_sensitive(mut self, cost_sensitive: bool) -> Self {
        self.cost_sensitive = cost_sensitive;
        self
    }

    pub fn with_prefer_local(mut self, prefer_local: bool) -> Self {
        self.prefer_local = prefer_local;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_set_fields() {
        let ctx = RoutingContext::new(TenantId::new("acme"))
            .with_strategy(RoutingStrategy::Failover)
            .with_preferred_provider("p1")
            .exclude("p2")
            .with_pool("pool-a")
            .with_cost_sensitive(true)
            .with_prefer_local(true)
            .with_priority(5);

        assert_eq!(ctx.strategy, Some(RoutingStrategy::Failover));
        assert_eq!(ctx.preferred_provider.as_deref(), Some("p1"));
        assert_eq!(ctx.excluded_providers, vec!["p2".to_string()]);
        assert_eq!(ctx.pool_id.as_deref(), Some("pool-a"));
        assert!(ctx.cost_sensitive);
        assert!(ctx.prefer_local);
        assert_eq!(ctx.priority, 5);
    }
}
