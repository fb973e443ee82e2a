//! Streaming transport for the inference gateway (spec §4.7).
//!
//! Provider adapters hand back a lazy sequence of
//! [`gateway_core::stream::StreamChunk`]; this crate is what turns that
//! raw, potentially misbehaving sequence into the well-formed stream the
//! edge transport can safely forward to a client: chunk indices
//! reindexed monotonically from zero, at most one backpressure policy
//! applied, an idle timeout enforced, tool-call markers watched for, and
//! external cancellation honored — with exactly one of `Cancelled` /
//! `Completed` / `Error` firing per stream, mirroring the "coroutine →
//! producer/consumer channel with explicit backpressure" redesign flag.
//!
//! # Example
//!
//! ```
//! use futures::stream::StreamExt;
//! use gateway_core::response::{FinishReason, Usage};
//! use gateway_core::stream::StreamChunk;
//! use gateway_streaming::{BackpressureMode, CancelHandle, StreamTransport, StreamingConfig};
//! use uuid::Uuid;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let request_id = Uuid::new_v4();
//! let source = tokio_stream::iter(vec![
//!     StreamChunk::Delta { request_id, index: 0, content: "hi".into() },
//!     StreamChunk::Done {
//!         request_id,
//!         index: 1,
//!         finish_reason: FinishReason::Stop,
//!         usage: Usage::default(),
//!     },
//! ])
//! .boxed();
//!
//! let config = StreamingConfig::builder()
//!     .backpressure(BackpressureMode::Buffer(16))
//!     .build()
//!     .unwrap();
//!
//! let mut out = StreamTransport::new(config).run(request_id, source, CancelHandle::new());
//! while let Some(chunk) = out.next().await {
//!     assert_eq!(chunk.request_id(), request_id);
//! }
//! # }
//! ```

mod buffer;
mod cancel;
mod config;
mod error;
mod events;
mod toolcall;
mod transport;

pub use cancel::CancelHandle;
pub use config::{BackpressureMode, StreamingConfig, StreamingConfigBuilder};
pub use error::{StreamConfigError, StreamTransportError};
pub use events::StreamEvent;
pub use toolcall::ToolCallDetector;
pub use transport::{ChunkStream, StreamTransport};
