//! Observability events emitted by [`crate::transport::StreamTransport`].
//!
//! `Started`/`Cancelled`/`Completed`/`Error` double as the spec's terminal
//! `onCancel`/`onComplete`/`onError` callbacks: the transport guarantees
//! exactly one of `Cancelled`, `Completed`, `Error` fires per stream.

use std::time::Instant;

use gateway_core::events::GatewayEvent;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The transport began consuming the provider's chunk source.
    Started { request_id: Uuid, timestamp: Instant },
    /// One chunk was forwarded to the consumer, post-reindexing.
    ChunkEmitted {
        request_id: Uuid,
        index: u64,
        timestamp: Instant,
    },
    /// A partial tool-call marker was newly observed in the accumulated
    /// text (each marker fires at most once per stream).
    ToolCallMarkerDetected {
        request_id: Uuid,
        index: u64,
        marker: &'static str,
        timestamp: Instant,
    },
    /// The configured backpressure mode dropped or overwrote an unread
    /// chunk to make room for a newer one.
    BackpressureDropped {
        request_id: Uuid,
        mode: &'static str,
        timestamp: Instant,
    },
    /// An external cancel signal ended the stream. Terminal.
    Cancelled {
        request_id: Uuid,
        reason: String,
        timestamp: Instant,
    },
    /// The stream ended normally. Terminal.
    Completed {
        request_id: Uuid,
        total_chunks: u64,
        timestamp: Instant,
    },
    /// The stream ended abnormally (idle timeout, backpressure overflow,
    /// malformed source). Terminal.
    Error {
        request_id: Uuid,
        message: String,
        timestamp: Instant,
    },
}

impl GatewayEvent for StreamEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StreamEvent::Started { .. } => "started",
            StreamEvent::ChunkEmitted { .. } => "chunk_emitted",
            StreamEvent::ToolCallMarkerDetected { .. } => "tool_call_marker_detected",
            StreamEvent::BackpressureDropped { .. } => "backpressure_dropped",
            StreamEvent::Cancelled { .. } => "cancelled",
            StreamEvent::Completed { .. } => "completed",
            StreamEvent::Error { .. } => "error",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            StreamEvent::Started { timestamp, .. }
            | StreamEvent::ChunkEmitted { timestamp, .. }
            | StreamEvent::ToolCallMarkerDetected { timestamp, .. }
            | StreamEvent::BackpressureDropped { timestamp, .. }
            | StreamEvent::Cancelled { timestamp, .. }
            | StreamEvent::Completed { timestamp, .. }
            | StreamEvent::Error { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        "streaming"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_matches_variant() {
        let event = StreamEvent::Completed {
            request_id: Uuid::nil(),
            total_chunks: 3,
            timestamp: Instant::now(),
        };
        assert_eq!(event.event_type(), "completed");
    }
}
