//! The provider adapter contract: the one trait every concrete LLM
//! backend integration implements to become routable.

use futures::stream::BoxStream;
use gateway_core::error::GatewayError;
use gateway_core::request::InferenceRequest;
use gateway_core::response::InferenceResponse;
use gateway_core::stream::StreamChunk;

use crate::descriptor::ProviderDescriptor;
use crate::health::ProviderHealth;

/// A stream of chunks for one in-flight streaming request. Ends after the
/// first terminal chunk (`Done`/`Error`); callers must not expect further
/// items past it.
pub type ChunkStream = BoxStream<'static, StreamChunk>;

/// Implemented once per backend (OpenAI-compatible HTTP, local GGUF
/// runtime, embeddings-only service, …). The registry holds adapters
/// behind `Arc<dyn ProviderAdapter>` so the orchestrator and router never
/// need to know the concrete backend.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Static identity and capability advertisement for this adapter.
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Whether this adapter claims to serve `request`, beyond the plain
    /// model-glob match — e.g. a multimodal request against a
    /// text-only provider should return `false` even if the glob matches.
    fn supports(&self, request: &InferenceRequest) -> bool {
        self.descriptor().supports_model(&request.model_id)
    }

    /// Probe current health. Called periodically by the registry's
    /// background loop; must not block indefinitely (the registry wraps
    /// it in a timeout).
    async fn check_health(&self) -> ProviderHealth;

    /// Unary inference.
    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResponse, GatewayError>;

    /// Streaming inference. Adapters that advertise `capabilities.streaming
    /// == false` may still implement this (e.g. by chunking a unary
    /// response into a single `Delta` + `Done`), since the orchestrator
    /// decides whether to call it based on the request's `stream` flag,
    /// not the capability flag alone.
    async fn infer_stream(
        &self,
        request: &InferenceRequest,
    ) -> Result<ChunkStream, GatewayError>;
}

/// An in-memory [`ProviderAdapter`] for tests: deterministic responses,
/// no network, configurable health and failure behavior.
#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;

    use futures::StreamExt;
    use gateway_core::response::{FinishReason, Usage};

    use super::*;
    use crate::health::HealthStatus;

    /// A provider adapter that echoes the last user message back, useful
    /// for exercising routing/orchestration without a real backend.
    pub struct InMemoryProviderAdapter {
        descriptor: ProviderDescriptor,
        healthy: AtomicBool,
        calls: AtomicU64,
    }

    impl InMemoryProviderAdapter {
        pub fn new(descriptor: ProviderDescriptor) -> Self {
            Self {
                descriptor,
                healthy: AtomicBool::new(true),
                calls: AtomicU64::new(0),
            }
        }

        /// Flip this adapter's simulated health for failure-path tests.
        pub fn set_healthy(&self, healthy: bool) {
            self.healthy.store(healthy, Ordering::SeqCst);
        }

        pub fn call_count(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ProviderAdapter for InMemoryProviderAdapter {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.descriptor
        }

        async fn check_health(&self) -> ProviderHealth {
            if self.healthy.load(Ordering::SeqCst) {
                ProviderHealth::new(HealthStatus::Healthy, "in-memory adapter ok")
            } else {
                ProviderHealth::new(HealthStatus::Unhealthy, "in-memory adapter forced down")
            }
        }

        async fn infer(
            &self,
            request: &InferenceRequest,
        ) -> Result<InferenceResponse, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if !self.healthy.load(Ordering::SeqCst) {
                return Err(GatewayError::TransientProvider {
                    provider_id: self.descriptor.provider_id.clone(),
                    message: "adapter forced down".into(),
                });
            }

            let reply = request
                .messages
                .last()
                .map(|m| format!("echo: {}", m.content))
                .unwrap_or_default();

            Ok(InferenceResponse {
                request_id: request.request_id,
                provider_id: self.descriptor.provider_id.clone(),
                model_id: request.model_id.clone(),
                message: gateway_core::request::Message {
                    role: gateway_core::request::Role::Assistant,
                    content: reply,
                    tool_call_id: None,
                },
                finish_reason: FinishReason::Stop,
                usage: Usage {
                    prompt_tokens: request.messages.len() as u32,
                    completion_tokens: 1,
                },
                metadata: Default::default(),
            })
        }

        async fn infer_stream(
            &self,
            request: &InferenceRequest,
        ) -> Result<ChunkStream, GatewayError> {
            let response = self.infer(request).await?;
            let request_id = request.request_id;

            let delta = StreamChunk::Delta {
                request_id,
                index: 0,
                content: response.message.content,
            };
            let done = StreamChunk::Done {
                request_id,
                index: 1,
                finish_reason: response.finish_reason,
                usage: response.usage,
            };

            Ok(tokio_stream::iter(vec![delta, done]).boxed())
        }
    }

    /// Convenience constructor mirroring [`InMemoryProviderAdapter::new`]
    /// but taking just an id, defaulting to a catch-all model glob.
    pub fn echo_adapter(provider_id: impl Into<String>) -> Arc<InMemoryProviderAdapter> {
        Arc::new(InMemoryProviderAdapter::new(ProviderDescriptor::new(
            provider_id,
            "*",
        )))
    }

}
