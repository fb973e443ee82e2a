//! The mutable context threaded through one request's walk across
//! phases: identity/timing (borrowed from `gateway-core`), the
//! request/response pair, the current [`ExecutionStatus`], and the
//! type-erased [`Variables`] plugins use to pass data forward.

use gateway_core::error::GatewayError;
use gateway_core::execution::ExecutionContext;
use gateway_core::request::InferenceRequest;
use gateway_core::response::InferenceResponse;
use gateway_core::tenant::TenantContext;
use gateway_state::{ExecutionStatus, IllegalStateTransition, Signal};
use uuid::Uuid;

use crate::variables::Variables;

/// Everything one request's plugins read and mutate as they cross
/// phases. Owned by a single task at a time; plugins never see a clone
/// they could mutate independently of the orchestrator's copy.
#[derive(Debug)]
pub struct PipelineContext {
    pub execution: ExecutionContext,
    pub request: InferenceRequest,
    pub response: Option<InferenceResponse>,
    pub status: ExecutionStatus,
    pub error: Option<GatewayError>,
    pub variables: Variables,
}

impl PipelineContext {
    /// `timeout` becomes the context's deadline (`Instant::now() +
    /// timeout`), mirroring the normalized request's `timeout` field
    /// (spec §6); `None` means the request carries no deadline.
    pub fn new(
        request: InferenceRequest,
        tenant: TenantContext,
        timeout: Option<std::time::Duration>,
    ) -> Self {
        let request_id = request.request_id;
        let deadline = timeout.map(|d| std::time::Instant::now() + d);

        Self {
            execution: ExecutionContext::new(request_id, tenant, deadline),
            request,
            response: None,
            status: ExecutionStatus::Created,
            error: None,
            variables: Variables::new(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.execution.request_id
    }

    /// Advances `status` via the state machine, returning the same error
    /// the machine produced on an illegal signal. The context's status
    /// is left unchanged on rejection.
    pub fn apply(&mut self, signal: Signal) -> Result<(), IllegalStateTransition> {
        self.status = self.status.next(&signal)?;
        Ok(())
    }

    /// Records a failure and drives `status` to `FAILED`, picking the
    /// transition the current state actually allows: `RetryExhausted`
    /// from `Retrying`, `Rejected` from `Waiting`, `TerminalFailure`
    /// otherwise. Every orchestrator-driven request reaches one of those
    /// three states before a phase can fail, so this is legal in
    /// practice even though the state machine doesn't make it universal.
    pub fn fail(&mut self, error: GatewayError) {
        let signal = match self.status {
            ExecutionStatus::Retrying => Signal::RetryExhausted(error.clone()),
            ExecutionStatus::Waiting => Signal::Rejected(error.clone()),
            _ => Signal::TerminalFailure(error.clone()),
        };
        self.error = Some(error);
        let _ = self.apply(signal);
    }

    pub fn is_expired(&self) -> bool {
        self.execution.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::request::Message;

    fn context() -> PipelineContext {
        let request = InferenceRequest::new("gpt-4", vec![Message::user("hi")]);
        PipelineContext::new(request, TenantContext::new("acme", 100), None)
    }

    #[test]
    fn starts_created() {
        let ctx = context();
        assert_eq!(ctx.status, ExecutionStatus::Created);
        assert!(ctx.error.is_none());
    }

    #[test]
    fn apply_advances_status() {
        let mut ctx = context();
        ctx.apply(Signal::Start).unwrap();
        assert_eq!(ctx.status, ExecutionStatus::Running);
    }

    #[test]
    fn fail_while_running_records_the_error_via_terminal_failure() {
        let mut ctx = context();
        ctx.apply(Signal::Start).unwrap();
        ctx.fail(GatewayError::Internal {
            message: "boom".into(),
        });
        assert_eq!(ctx.status, ExecutionStatus::Failed);
        assert!(ctx.error.is_some());
    }

    #[test]
    fn fail_while_retrying_uses_retry_exhausted() {
        let mut ctx = context();
        ctx.apply(Signal::Start).unwrap();
        ctx.apply(Signal::ExecutionFailure(GatewayError::Internal {
            message: "transient".into(),
        }))
        .unwrap();
        assert_eq!(ctx.status, ExecutionStatus::Retrying);

        ctx.fail(GatewayError::Internal {
            message: "exhausted".into(),
        });
        assert_eq!(ctx.status, ExecutionStatus::Failed);
    }

    #[test]
    fn variables_round_trip_through_the_context() {
        let mut ctx = context();
        ctx.variables.set("k", 42i32).unwrap();
        assert_eq!(ctx.variables.get::<i32>("k"), Some(&42));
    }
}
