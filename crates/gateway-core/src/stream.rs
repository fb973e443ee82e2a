//! The streamed-response data model. Transport-level backpressure and
//! cancellation live in `gateway-streaming`; this is just the chunk shape
//! both that crate and provider adapters produce/consume.

use uuid::Uuid;

use crate::response::{FinishReason, Usage};

/// One increment of a streamed response. `index` is monotone within a
/// single stream and starts at zero, regardless of how many chunks the
/// upstream provider actually emitted per gateway chunk.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// A content delta. `index` increases by exactly one per delta.
    Delta {
        request_id: Uuid,
        index: u64,
        content: String,
    },
    /// The model began or continued emitting a tool call; adapters surface
    /// this distinctly from content so the pipeline can react without
    /// scanning text for markers.
    ToolCall {
        request_id: Uuid,
        index: u64,
        tool_call_id: String,
        name: Option<String>,
        arguments_delta: String,
    },
    /// Terminal chunk. No further chunks follow for this `request_id`.
    Done {
        request_id: Uuid,
        index: u64,
        finish_reason: FinishReason,
        usage: Usage,
    },
    /// Terminal chunk emitted when the stream ends abnormally (provider
    /// error, cancellation, idle timeout).
    Error {
        request_id: Uuid,
        index: u64,
        message: String,
    },
}

impl StreamChunk {
    pub fn request_id(&self) -> Uuid {
        match self {
            StreamChunk::Delta { request_id, .. }
            | StreamChunk::ToolCall { request_id, .. }
            | StreamChunk::Done { request_id, .. }
            | StreamChunk::Error { request_id, .. } => *request_id,
        }
    }

    pub fn index(&self) -> u64 {
        match self {
            StreamChunk::Delta { index, .. }
            | StreamChunk::ToolCall { index, .. }
            | StreamChunk::Done { index, .. }
            | StreamChunk::Error { index, .. } => *index,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamChunk::Done { .. } | StreamChunk::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_chunk_is_terminal() {
        let chunk = StreamChunk::Done {
            request_id: Uuid::new_v4(),
            index: 3,
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        };
        assert!(chunk.is_terminal());
    }

    #[test]
    fn delta_chunk_is_not_terminal() {
        let chunk = StreamChunk::Delta {
            request_id: Uuid::new_v4(),
            index: 0,
            content: "hi".into(),
        };
        assert!(!chunk.is_terminal());
    }
}
