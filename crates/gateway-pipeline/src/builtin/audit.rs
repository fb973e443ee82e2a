//! AUDIT: emits a hash-chained [`AuditPayload`] for the request, always
//! swallowing its own failures (see [`crate::phase::Phase::is_audit`]).

use chrono::Utc;

use gateway_core::audit::{Actor, AuditPayload, Level};
use gateway_core::error::GatewayError;

use crate::context::PipelineContext;
use crate::phase::Phase;
use crate::plugin::Plugin;

/// Where emitted audit entries go. Kept as a trait (rather than hardwiring
/// a channel or file) so deployments can fan them out to whatever durable
/// store or bus they already run, matching how the provider adapter
/// contract stays out of this crate's business.
pub trait AuditSink: Send + Sync {
    fn record(&self, payload: AuditPayload);
}

/// Chains one entry per request onto `sink`, using `audit_previous_hash`
/// (set by this same plugin on the prior phase run) to link entries
/// within a single request's own trail.
pub struct AuditBuiltin {
    sink: std::sync::Arc<dyn AuditSink>,
    node_id: String,
}

impl AuditBuiltin {
    pub fn new(sink: std::sync::Arc<dyn AuditSink>, node_id: impl Into<String>) -> Self {
        Self {
            sink,
            node_id: node_id.into(),
        }
    }
}

#[async_trait::async_trait]
impl Plugin for AuditBuiltin {
    fn id(&self) -> &str {
        "builtin.audit"
    }

    fn phase(&self) -> Phase {
        Phase::Audit
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<(), GatewayError> {
        let (level, event) = match &ctx.error {
            Some(err) => (Level::Warn, format!("request_failed:{}", err.code())),
            None => (Level::Info, "request_completed".to_string()),
        };

        let previous_hash = ctx
            .variables
            .get::<String>("audit_previous_hash")
            .cloned();

        let payload = AuditPayload::next(
            ctx.request_id(),
            self.node_id.clone(),
            Actor::orchestrator(),
            level,
            event,
            Utc::now(),
            previous_hash.as_deref(),
        );

        ctx.variables.overwrite("audit_previous_hash", payload.hash.clone());
        self.sink.record(payload);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::request::{InferenceRequest, Message};
    use gateway_core::tenant::TenantContext;
    use std::sync::{Arc, Mutex};

    struct CollectingSink(Mutex<Vec<AuditPayload>>);

    impl AuditSink for CollectingSink {
        fn record(&self, payload: AuditPayload) {
            self.0.lock().unwrap().push(payload);
        }
    }

    #[tokio::test]
    async fn successful_request_emits_an_info_entry() {
        let sink = Arc::new(CollectingSink(Mutex::new(Vec::new())));
        let plugin = AuditBuiltin::new(sink.clone(), "node-1");

        let request = InferenceRequest::new("gpt-4", vec![Message::user("hi")]);
        let mut ctx = PipelineContext::new(request, TenantContext::new("acme", 100), None);

        plugin.execute(&mut ctx).await.unwrap();

        let entries = sink.0.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, "request_completed");
        assert!(entries[0].verify(None));
    }

    #[tokio::test]
    async fn failed_request_emits_a_warn_entry_naming_the_error_code() {
        let sink = Arc::new(CollectingSink(Mutex::new(Vec::new())));
        let plugin = AuditBuiltin::new(sink.clone(), "node-1");

        let request = InferenceRequest::new("gpt-4", vec![Message::user("hi")]);
        let mut ctx = PipelineContext::new(request, TenantContext::new("acme", 100), None);
        ctx.fail(GatewayError::Validation {
            message: "bad request".into(),
        });

        plugin.execute(&mut ctx).await.unwrap();

        let entries = sink.0.lock().unwrap();
        assert_eq!(entries[0].level, Level::Warn);
        assert!(entries[0].event.starts_with("request_failed:"));
    }
}
