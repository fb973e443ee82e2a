//! INFERENCE: invokes the routed provider's unary `infer`. The
//! streaming variant is the orchestrator's job (it owns the transport
//! layer in `gateway-streaming`); this plugin only ever drives the unary
//! path, so it's safe to run even for a streaming-capable provider when
//! the request doesn't ask for streaming.

use std::sync::Arc;

use gateway_core::error::GatewayError;
use gateway_provider::ProviderRegistry;

use crate::context::PipelineContext;
use crate::phase::Phase;
use crate::plugin::Plugin;

/// Looks up `selected_provider_id` (left by [`crate::builtin::RouteBuiltin`])
/// and invokes it. Circuit breaking and rate limiting around this call
/// are the orchestrator's responsibility — wrapping them here would hide
/// the retry/failover decision point the orchestrator needs.
pub struct InferenceBuiltin {
    providers: Arc<ProviderRegistry>,
}

impl InferenceBuiltin {
    pub fn new(providers: Arc<ProviderRegistry>) -> Self {
        Self { providers }
    }
}

#[async_trait::async_trait]
impl Plugin for InferenceBuiltin {
    fn id(&self) -> &str {
        "builtin.inference"
    }

    fn phase(&self) -> Phase {
        Phase::Inference
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<(), GatewayError> {
        let provider_id = ctx
            .variables
            .get::<String>("selected_provider_id")
            .cloned()
            .ok_or_else(|| GatewayError::Internal {
                message: "inference phase ran without a routing decision".into(),
            })?;

        let adapter = self.providers.get(&provider_id).ok_or_else(|| {
            GatewayError::NoCompatibleProvider {
                model_id: ctx.request.model_id.clone(),
            }
        })?;

        let response = adapter.infer(&ctx.request).await?;
        ctx.response = Some(response);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::request::{InferenceRequest, Message};
    use gateway_core::tenant::TenantContext;
    use gateway_provider::adapter::test_util::echo_adapter;
    use gateway_provider::ProviderRegistryConfig;

    fn ctx() -> PipelineContext {
        let request = InferenceRequest::new("gpt-4", vec![Message::user("hi")]);
        PipelineContext::new(request, TenantContext::new("acme", 100), None)
    }

    #[tokio::test]
    async fn invokes_the_selected_provider_and_records_the_response() {
        let providers = Arc::new(ProviderRegistry::new(ProviderRegistryConfig::default()));
        providers.register(echo_adapter("p1"));
        let plugin = InferenceBuiltin::new(providers);

        let mut ctx = ctx();
        ctx.variables.set("selected_provider_id", "p1".to_string()).unwrap();

        plugin.execute(&mut ctx).await.unwrap();
        assert_eq!(ctx.response.unwrap().message.content, "echo: hi");
    }

    #[tokio::test]
    async fn missing_routing_decision_is_an_internal_error() {
        let providers = Arc::new(ProviderRegistry::new(ProviderRegistryConfig::default()));
        let plugin = InferenceBuiltin::new(providers);

        let result = plugin.execute(&mut ctx()).await;
        assert!(matches!(result, Err(GatewayError::Internal { .. })));
    }

    #[tokio::test]
    async fn unknown_provider_id_is_a_no_compatible_provider_error() {
        let providers = Arc::new(ProviderRegistry::new(ProviderRegistryConfig::default()));
        let plugin = InferenceBuiltin::new(providers);

        let mut ctx = ctx();
        ctx.variables.set("selected_provider_id", "missing".to_string()).unwrap();

        let result = plugin.execute(&mut ctx).await;
        assert!(matches!(result, Err(GatewayError::NoCompatibleProvider { .. })));
    }
}
