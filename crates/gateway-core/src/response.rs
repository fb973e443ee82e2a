//! The normalized inference response, produced by the orchestrator from
//! whatever shape the winning provider adapter returned.

use std::collections::HashMap;

use uuid::Uuid;

use crate::request::Message;

/// Why generation stopped, normalized across providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Cancelled,
}

/// Token accounting, used for quota debiting and audit.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A completed (unary) inference response.
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub request_id: Uuid,
    pub provider_id: String,
    pub model_id: String,
    pub message: Message,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    pub metadata: HashMap<String, String>,
}
