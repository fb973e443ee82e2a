//! Errors local to the streaming transport, plus their conversion into
//! the gateway's unified [`GatewayError`] taxonomy.

use gateway_core::error::GatewayError;
use thiserror::Error;

/// Raised by [`crate::config::StreamingConfigBuilder::build`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamConfigError {
    #[error("streaming config requires an explicit backpressure mode")]
    MissingBackpressureMode,
    #[error("backpressure capacity must be greater than zero")]
    ZeroCapacity,
    #[error("idle timeout must be greater than zero")]
    ZeroIdleTimeout,
}

/// Terminal failures of an in-flight stream. The transport never returns
/// these directly — it encodes them as a final `StreamChunk::Error` so
/// the chunk stream's monotone-index/exactly-one-final invariant always
/// holds, but callers that need the structured reason (e.g. to decide
/// whether to retry) can recover it from here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamTransportError {
    /// No chunk arrived within the configured idle window.
    #[error("stream idle timeout exceeded")]
    IdleTimeout,
    /// An external cancel signal ended the stream.
    #[error("stream cancelled: {reason}")]
    Cancelled { reason: String },
    /// The backpressure buffer overflowed under `BackpressureMode::Error`.
    #[error("backpressure buffer overflowed (capacity {capacity})")]
    BackpressureOverflow { capacity: usize },
    /// The source stream ended without ever emitting a terminal chunk.
    #[error("stream ended without a terminal chunk")]
    NoTerminalChunk,
}

impl From<StreamTransportError> for GatewayError {
    fn from(err: StreamTransportError) -> Self {
        match err {
            StreamTransportError::IdleTimeout => GatewayError::Timeout,
            StreamTransportError::Cancelled { reason } => GatewayError::Cancelled { reason },
            StreamTransportError::BackpressureOverflow { capacity } => GatewayError::Internal {
                message: format!("stream backpressure overflow at capacity {capacity}"),
            },
            StreamTransportError::NoTerminalChunk => GatewayError::Internal {
                message: "stream ended without a terminal chunk".to_string(),
            },
        }
    }
}
