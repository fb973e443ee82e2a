//! AUTHORIZE: tenant quota and model-entitlement check.

use gateway_core::error::GatewayError;

use crate::context::PipelineContext;
use crate::phase::Phase;
use crate::plugin::Plugin;

/// Debits one unit of the tenant's quota and rejects the request if the
/// tenant has no remaining budget or isn't entitled to the requested
/// model. Crediting the unit back on a later failure is the
/// orchestrator's job (it owns the whole request lifetime), not this
/// plugin's.
pub struct AuthorizeBuiltin;

#[async_trait::async_trait]
impl Plugin for AuthorizeBuiltin {
    fn id(&self) -> &str {
        "builtin.authorize"
    }

    fn phase(&self) -> Phase {
        Phase::Authorize
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<(), GatewayError> {
        if !ctx.execution.tenant.is_model_allowed(&ctx.request.model_id) {
            return Err(GatewayError::Authorization {
                message: format!(
                    "tenant {} is not entitled to model {}",
                    ctx.execution.tenant.tenant_id, ctx.request.model_id
                ),
            });
        }

        if ctx.execution.tenant.quota.debit(1) < 0 {
            return Err(GatewayError::Authorization {
                message: format!("tenant {} has exhausted its quota", ctx.execution.tenant.tenant_id),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::request::{InferenceRequest, Message};
    use gateway_core::tenant::TenantContext;

    fn ctx(tenant: TenantContext) -> PipelineContext {
        let request = InferenceRequest::new("gpt-4", vec![Message::user("hi")]);
        PipelineContext::new(request, tenant, None)
    }

    #[tokio::test]
    async fn exhausted_quota_is_rejected() {
        let tenant = TenantContext::new("acme", 0);
        let mut c = ctx(tenant);
        assert!(AuthorizeBuiltin.execute(&mut c).await.is_err());
    }

    #[tokio::test]
    async fn disallowed_model_is_rejected() {
        let tenant = TenantContext::new("acme", 100).with_allowed_models(vec!["claude-3".into()]);
        let mut c = ctx(tenant);
        assert!(AuthorizeBuiltin.execute(&mut c).await.is_err());
    }

    #[tokio::test]
    async fn entitled_tenant_with_quota_passes() {
        let tenant = TenantContext::new("acme", 10);
        let mut c = ctx(tenant);
        assert!(AuthorizeBuiltin.execute(&mut c).await.is_ok());
        assert_eq!(c.execution.tenant.quota.remaining(), 9);
    }
}
