//! Core data model, error taxonomy, and event infrastructure shared by
//! every gateway crate:
//! - the normalized request/response/message types
//! - tenant identity and quota counters
//! - the unified [`error::GatewayError`] taxonomy
//! - the per-request [`execution::ExecutionContext`] and phase timings
//! - the hash-chained [`audit::AuditPayload`] trail
//! - the streamed-response chunk model
//! - a generic copy-on-write [`registry::Registry`] used by the circuit
//!   breaker and rate limiter crates
//! - the [`events::GatewayEvent`] observability trait

pub mod audit;
pub mod error;
pub mod events;
pub mod execution;
pub mod registry;
pub mod request;
pub mod response;
pub mod stream;
pub mod tenant;

pub use error::{ErrorCode, GatewayError, StructuredError};
pub use events::{EventListener, EventListeners, GatewayEvent};
pub use execution::{ExecutionContext, PhaseTimer, PhaseTimings};
pub use registry::Registry;
pub use request::{GenerationParams, InferenceRequest, Message, Role};
pub use response::{FinishReason, InferenceResponse, Usage};
pub use stream::StreamChunk;
pub use tenant::{QuotaCounter, TenantContext, TenantId};
