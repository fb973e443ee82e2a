//! A multi-tenant LLM inference gateway: resilient routing, circuit
//! breaking, rate limiting, retries with failover, and chunked streaming
//! over a pluggable set of provider adapters.
//!
//! `gateway` bundles the individual `gateway-*` crates behind feature
//! flags, the same way [`tower-resilience`](https://docs.rs/tower-resilience)
//! bundles its resilience patterns. Each concern is available as both a
//! standalone crate and a feature here.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! gateway = { version = "0.1", features = ["orchestrator", "streaming"] }
//! ```
//!
//! # Modules
//!
//! - **[`core`]** — request/response types, the unified [`GatewayError`]
//!   taxonomy, and the event system every other module builds on. Always
//!   available.
//! - **[`state`]** *(feature `state`)* — the request execution state
//!   machine: `Created → … → Completed/Failed`, with `Suspended`/
//!   `Compensated` reachable but undriven by any built-in plugin.
//! - **[`provider`]** *(feature `provider`)* — the [`ProviderAdapter`]
//!   trait and registry, with background health probing.
//! - **[`router`]** *(feature `router`)* — weighted, health- and
//!   capability-aware provider selection, producing a primary plus
//!   ordered fallback list.
//! - **[`circuitbreaker`]** *(feature `circuitbreaker`)* — per-provider
//!   CLOSED/OPEN/HALF_OPEN tracking over a sliding window.
//! - **[`ratelimiter`]** *(feature `ratelimiter`)* — per-(provider,
//!   tenant) sliding-window or token-bucket quotas.
//! - **[`retry`]** *(feature `retry`)* — exponential-backoff interval
//!   functions shared by the orchestrator's failover loop.
//! - **[`pipeline`]** *(feature `pipeline`)* — the phase-ordered plugin
//!   executor driving VALIDATE → AUTHORIZE → PRE_PROCESSING → ROUTE →
//!   INFERENCE → POST_PROCESSING → AUDIT.
//! - **[`streaming`]** *(feature `streaming`)* — chunk reindexing,
//!   backpressure, idle-timeout detection, and cancellation for
//!   `stream: true` requests.
//! - **[`orchestrator`]** *(feature `orchestrator`)* — binds all of the
//!   above into the one entry point a server process calls per request:
//!   [`orchestrator::Orchestrator::handle`] for unary requests,
//!   [`orchestrator::Orchestrator::handle_stream`] for streaming ones.
//!
//! [`GatewayError`]: core::error::GatewayError
//! [`ProviderAdapter`]: provider::ProviderAdapter
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "orchestrator")]
//! # {
//! use gateway::core::request::{InferenceRequest, Message};
//! use gateway::core::tenant::TenantContext;
//! use gateway::orchestrator::Orchestrator;
//!
//! # async fn example(orchestrator: Orchestrator) {
//! let request = InferenceRequest::new("gpt-4", vec![Message::user("hello")]);
//! let tenant = TenantContext::new("acme", 100);
//!
//! let response = orchestrator.handle(request, tenant, None).await;
//! # let _ = response;
//! # }
//! # }
//! ```

// Core is always included.
pub use gateway_core as core;

#[cfg(feature = "circuitbreaker")]
pub use gateway_circuitbreaker as circuitbreaker;

#[cfg(feature = "orchestrator")]
pub use gateway_orchestrator as orchestrator;

#[cfg(feature = "pipeline")]
pub use gateway_pipeline as pipeline;

#[cfg(feature = "provider")]
pub use gateway_provider as provider;

#[cfg(feature = "ratelimiter")]
pub use gateway_ratelimiter as ratelimiter;

#[cfg(feature = "retry")]
pub use gateway_retry as retry;

#[cfg(feature = "router")]
pub use gateway_router as router;

#[cfg(feature = "state")]
pub use gateway_state as state;

#[cfg(feature = "streaming")]
pub use gateway_streaming as streaming;
