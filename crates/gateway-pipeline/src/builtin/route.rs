//! ROUTE: resolves the provider registry's current candidates for the
//! requested model into a [`RoutingDecision`], produced as the
//! `routing_decision` / `selected_provider_id` context variables.

use std::sync::Arc;

use gateway_core::error::GatewayError;
use gateway_provider::ProviderRegistry;
use gateway_router::{Router, RoutingCandidate, RoutingContext, RoutingDecision};

use crate::context::PipelineContext;
use crate::phase::Phase;
use crate::plugin::Plugin;

/// Snapshots the provider registry's usable candidates for the request's
/// model and hands them to the router. Neither the registry nor the
/// router is owned by this plugin; both are shared with the orchestrator
/// (and, for the registry, the background health prober).
pub struct RouteBuiltin {
    providers: Arc<ProviderRegistry>,
    router: Arc<Router>,
}

impl RouteBuiltin {
    pub fn new(providers: Arc<ProviderRegistry>, router: Arc<Router>) -> Self {
        Self { providers, router }
    }
}

#[async_trait::async_trait]
impl Plugin for RouteBuiltin {
    fn id(&self) -> &str {
        "builtin.route"
    }

    fn phase(&self) -> Phase {
        Phase::Route
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<(), GatewayError> {
        let model_id = ctx.request.model_id.clone();
        let adapters = self.providers.candidates_for(&model_id);

        if adapters.is_empty() {
            return Err(GatewayError::NoCompatibleProvider {
                model_id: model_id.clone(),
            });
        }

        let candidates: Vec<RoutingCandidate> = adapters
            .iter()
            .map(|adapter| {
                let descriptor = adapter.descriptor();
                let health = self
                    .providers
                    .health(&descriptor.provider_id)
                    .unwrap_or(gateway_provider::HealthStatus::Healthy);
                RoutingCandidate::new(descriptor.provider_id.clone())
                    .with_vendor_tag(descriptor.vendor_tag)
                    .with_health(health)
            })
            .collect();

        let routing_context = RoutingContext::new(ctx.execution.tenant.tenant_id.clone());
        let decision: RoutingDecision = self.router.route(&model_id, candidates, &routing_context)?;

        ctx.variables
            .set("selected_provider_id", decision.selected_provider_id.clone())
            .map_err(|e| GatewayError::Internal { message: e.to_string() })?;
        ctx.variables
            .set("routing_decision", decision)
            .map_err(|e| GatewayError::Internal { message: e.to_string() })?;

        Ok(())
    }
}
