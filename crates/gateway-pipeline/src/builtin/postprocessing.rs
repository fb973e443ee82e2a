//! POST_PROCESSING: tool-call marker detection and conversation-history
//! update. Failures here are logged, never fatal — see
//! [`crate::phase::Phase::is_best_effort`].

use gateway_core::error::GatewayError;

use crate::context::PipelineContext;
use crate::phase::Phase;
use crate::plugin::Plugin;

const TOOL_CALL_MARKERS: &[&str] = &["\"tool_call\"", "\"function_call\"", "<tool_call>"];

/// Appends the provider's response onto the request's message history
/// (so a later plugin or a subsequent turn sees the full conversation)
/// and flags whether the response looks like a tool call, for a
/// downstream tool-execution plugin to act on.
pub struct PostProcessingBuiltin;

#[async_trait::async_trait]
impl Plugin for PostProcessingBuiltin {
    fn id(&self) -> &str {
        "builtin.post_processing"
    }

    fn phase(&self) -> Phase {
        Phase::PostProcessing
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<(), GatewayError> {
        let Some(response) = ctx.response.clone() else {
            return Ok(());
        };

        let looks_like_tool_call = TOOL_CALL_MARKERS
            .iter()
            .any(|marker| response.message.content.contains(marker));
        ctx.variables.overwrite("tool_call_detected", looks_like_tool_call);

        ctx.request.messages.push(response.message);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::request::{InferenceRequest, Message, Role};
    use gateway_core::response::{FinishReason, InferenceResponse, Usage};
    use gateway_core::tenant::TenantContext;

    fn ctx_with_response(content: &str) -> PipelineContext {
        let request = InferenceRequest::new("gpt-4", vec![Message::user("hi")]);
        let mut ctx = PipelineContext::new(request, TenantContext::new("acme", 100), None);
        ctx.response = Some(InferenceResponse {
            request_id: ctx.request_id(),
            provider_id: "p1".into(),
            model_id: "gpt-4".into(),
            message: Message {
                role: Role::Assistant,
                content: content.into(),
                tool_call_id: None,
            },
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
            metadata: Default::default(),
        });
        ctx
    }

    #[tokio::test]
    async fn response_is_appended_to_history() {
        let mut ctx = ctx_with_response("hello back");
        PostProcessingBuiltin.execute(&mut ctx).await.unwrap();
        assert_eq!(ctx.request.messages.len(), 2);
        assert_eq!(ctx.request.messages[1].content, "hello back");
    }

    #[tokio::test]
    async fn tool_call_marker_is_detected() {
        let mut ctx = ctx_with_response(r#"{"tool_call": {"name": "lookup"}}"#);
        PostProcessingBuiltin.execute(&mut ctx).await.unwrap();
        assert_eq!(ctx.variables.get::<bool>("tool_call_detected"), Some(&true));
    }

    #[tokio::test]
    async fn plain_text_is_not_flagged_as_a_tool_call() {
        let mut ctx = ctx_with_response("just chatting");
        PostProcessingBuiltin.execute(&mut ctx).await.unwrap();
        assert_eq!(ctx.variables.get::<bool>("tool_call_detected"), Some(&false));
    }

    #[tokio::test]
    async fn no_response_is_a_no_op() {
        let request = InferenceRequest::new("gpt-4", vec![Message::user("hi")]);
        let mut ctx = PipelineContext::new(request, TenantContext::new("acme", 100), None);
        PostProcessingBuiltin.execute(&mut ctx).await.unwrap();
        assert_eq!(ctx.request.messages.len(), 1);
    }
}
