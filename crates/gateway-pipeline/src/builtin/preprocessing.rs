//! PRE_PROCESSING: prompt templating and context-window management.
//! RAG retrieval/rerank injection is deliberately not seeded here — it
//! needs an external retriever collaborator this crate has no opinion
//! on; integrators add it as their own PRE_PROCESSING plugin.

use gateway_core::error::GatewayError;
use gateway_core::request::{Message, Role};

use crate::context::PipelineContext;
use crate::phase::Phase;
use crate::plugin::Plugin;

/// How the context-window manager keeps the message list under its
/// configured budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextWindowPolicy {
    /// Drop the oldest non-system message until under budget.
    TruncateOldest,
    /// Keep only the most recent `max_messages`, preserving any leading
    /// system message.
    SlidingWindow,
}

/// Injects a system prompt (if configured and not already present) and
/// enforces `max_messages` via the configured policy.
pub struct PreProcessingBuiltin {
    system_prompt: Option<String>,
    max_messages: usize,
    policy: ContextWindowPolicy,
}

impl PreProcessingBuiltin {
    pub fn new(max_messages: usize, policy: ContextWindowPolicy) -> Self {
        Self {
            system_prompt: None,
            max_messages,
            policy,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

#[async_trait::async_trait]
impl Plugin for PreProcessingBuiltin {
    fn id(&self) -> &str {
        "builtin.pre_processing"
    }

    fn phase(&self) -> Phase {
        Phase::PreProcessing
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<(), GatewayError> {
        if let Some(prompt) = &self.system_prompt {
            let has_system = ctx.request.messages.iter().any(|m| m.role == Role::System);
            if !has_system {
                ctx.request.messages.insert(0, Message::system(prompt.clone()));
            }
        }

        match self.policy {
            ContextWindowPolicy::TruncateOldest => {
                while ctx.request.messages.len() > self.max_messages {
                    let drop_at = ctx
                        .request
                        .messages
                        .iter()
                        .position(|m| m.role != Role::System)
                        .unwrap_or(0);
                    ctx.request.messages.remove(drop_at);
                }
            }
            ContextWindowPolicy::SlidingWindow => {
                if ctx.request.messages.len() > self.max_messages {
                    let system: Vec<Message> = ctx
                        .request
                        .messages
                        .iter()
                        .filter(|m| m.role == Role::System)
                        .cloned()
                        .collect();
                    let keep = self.max_messages.saturating_sub(system.len());
                    let tail_start = ctx.request.messages.len().saturating_sub(keep);
                    let mut kept: Vec<Message> = system;
                    kept.extend(ctx.request.messages.drain(tail_start..));
                    ctx.request.messages = kept;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::request::InferenceRequest;
    use gateway_core::tenant::TenantContext;

    fn ctx(messages: Vec<Message>) -> PipelineContext {
        let request = InferenceRequest::new("gpt-4", messages);
        PipelineContext::new(request, TenantContext::new("acme", 100), None)
    }

    #[tokio::test]
    async fn system_prompt_is_injected_once() {
        let plugin = PreProcessingBuiltin::new(10, ContextWindowPolicy::TruncateOldest)
            .with_system_prompt("be helpful");
        let mut c = ctx(vec![Message::user("hi")]);
        plugin.execute(&mut c).await.unwrap();

        assert_eq!(c.request.messages.len(), 2);
        assert_eq!(c.request.messages[0].role, Role::System);

        plugin.execute(&mut c).await.unwrap();
        assert_eq!(c.request.messages.len(), 2);
    }

    #[tokio::test]
    async fn truncate_oldest_drops_earliest_non_system_message() {
        let plugin = PreProcessingBuiltin::new(2, ContextWindowPolicy::TruncateOldest);
        let mut c = ctx(vec![
            Message::user("first"),
            Message::user("second"),
            Message::user("third"),
        ]);
        plugin.execute(&mut c).await.unwrap();

        assert_eq!(c.request.messages.len(), 2);
        assert_eq!(c.request.messages[0].content, "second");
        assert_eq!(c.request.messages[1].content, "third");
    }

    #[tokio::test]
    async fn sliding_window_preserves_leading_system_message() {
        let plugin = PreProcessingBuiltin::new(2, ContextWindowPolicy::SlidingWindow);
        let mut c = ctx(vec![
            Message::system("rules"),
            Message::user("first"),
            Message::user("second"),
            Message::user("third"),
        ]);
        plugin.execute(&mut c).await.unwrap();

        assert_eq!(c.request.messages.len(), 2);
        assert_eq!(c.request.messages[0].role, Role::System);
        assert_eq!(c.request.messages[1].content, "third");
    }
}
