//! VALIDATE: schema shape + content-safety keyword/pattern matching.

use gateway_core::error::GatewayError;

use crate::context::PipelineContext;
use crate::phase::Phase;
use crate::plugin::Plugin;

/// Rejects requests with no messages, an empty model id, or message
/// content matching a configured blocked pattern (plain substrings,
/// case-insensitive — the keyword/pattern list spec §4.5 calls for).
pub struct ValidateBuiltin {
    blocked_patterns: Vec<String>,
}

impl ValidateBuiltin {
    pub fn new(blocked_patterns: Vec<String>) -> Self {
        Self {
            blocked_patterns: blocked_patterns
                .into_iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl Plugin for ValidateBuiltin {
    fn id(&self) -> &str {
        "builtin.validate"
    }

    fn phase(&self) -> Phase {
        Phase::Validate
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<(), GatewayError> {
        if ctx.request.model_id.trim().is_empty() {
            return Err(GatewayError::Validation {
                message: "model id must not be empty".into(),
            });
        }
        if ctx.request.messages.is_empty() {
            return Err(GatewayError::Validation {
                message: "request must carry at least one message".into(),
            });
        }

        for message in &ctx.request.messages {
            let lower = message.content.to_lowercase();
            if let Some(pattern) = self.blocked_patterns.iter().find(|p| lower.contains(p.as_str())) {
                return Err(GatewayError::Validation {
                    message: format!("message content matches blocked pattern '{pattern}'"),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::request::{InferenceRequest, Message};
    use gateway_core::tenant::TenantContext;

    fn ctx(messages: Vec<Message>) -> PipelineContext {
        let request = InferenceRequest::new("gpt-4", messages);
        PipelineContext::new(request, TenantContext::new("acme", 100), None)
    }

    #[tokio::test]
    async fn empty_messages_fail_validation() {
        let plugin = ValidateBuiltin::new(vec![]);
        let mut c = ctx(vec![]);
        assert!(plugin.execute(&mut c).await.is_err());
    }

    #[tokio::test]
    async fn blocked_pattern_fails_validation() {
        let plugin = ValidateBuiltin::new(vec!["forbidden".into()]);
        let mut c = ctx(vec![Message::user("this is FORBIDDEN content")]);
        assert!(plugin.execute(&mut c).await.is_err());
    }

    #[tokio::test]
    async fn clean_request_passes() {
        let plugin = ValidateBuiltin::new(vec!["forbidden".into()]);
        let mut c = ctx(vec![Message::user("hello there")]);
        assert!(plugin.execute(&mut c).await.is_ok());
    }
}
