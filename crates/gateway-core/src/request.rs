//! The normalized inference request, shared by every provider adapter.

use std::collections::HashMap;

use uuid::Uuid;

/// Chat message role, normalized across providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single turn in the conversation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Present when `role` is `Tool`, identifying which call this responds to.
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_call_id: None,
        }
    }
}

/// Decoding/sampling parameters, normalized across providers. Providers
/// that don't support a given parameter silently ignore it rather than
/// erroring, per the provider adapter contract.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stop: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: None,
            top_p: None,
            max_tokens: None,
            stop: Vec::new(),
        }
    }
}

/// A single normalized request entering the gateway. Constructed once at
/// the edge and threaded read-only through routing, the plugin pipeline,
/// and the orchestrator.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub request_id: Uuid,
    pub model_id: String,
    pub messages: Vec<Message>,
    pub params: GenerationParams,
    pub stream: bool,
    /// Free-form metadata plugins may read or annotate (e.g. user agent,
    /// trace ids injected by an upstream gateway).
    pub metadata: HashMap<String, String>,
}

impl InferenceRequest {
    pub fn new(model_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            model_id: model_id.into(),
            messages,
            params: GenerationParams::default(),
            stream: false,
            metadata: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_gets_a_unique_id() {
        let a = InferenceRequest::new("gpt-4", vec![Message::user("hi")]);
        let b = InferenceRequest::new("gpt-4", vec![Message::user("hi")]);
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn default_generation_params_are_unset() {
        let params = GenerationParams::default();
        assert!(params.temperature.is_none());
        assert!(params.stop.is_empty());
    }
}
