//! Phase-ordered plugin execution for the inference gateway.
//!
//! A request walks [`Phase::ALL`] in order: `VALIDATE → AUTHORIZE →
//! PRE_PROCESSING → ROUTE → INFERENCE → POST_PROCESSING → AUDIT`. Within
//! a phase its registered [`Plugin`]s run in ascending `order`. Each
//! phase has its own error policy (see [`Phase::is_fail_fast`],
//! [`Phase::is_best_effort`], [`Phase::is_audit`]), enforced by
//! [`executor::Pipeline::run`] — the executor itself doesn't decide
//! retry/failover, that's the orchestrator's job once a phase error
//! propagates out of `run`.
//!
//! [`builtin`] ships one reference plugin per phase, wired against
//! `gateway-provider`/`gateway-router` where a phase needs them (ROUTE,
//! INFERENCE); the rest are pure context transforms.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use gateway_core::events::EventListeners;
//! use gateway_core::request::{InferenceRequest, Message};
//! use gateway_core::tenant::TenantContext;
//! use gateway_pipeline::builtin::ValidateBuiltin;
//! use gateway_pipeline::{PipelineContext, PluginRegistry, Pipeline};
//!
//! let registry = PluginRegistry::new();
//! registry.register_all(vec![Arc::new(ValidateBuiltin::new(vec!["blocked".into()]))]);
//! let pipeline = Pipeline::new(registry, EventListeners::new());
//!
//! let request = InferenceRequest::new("gpt-4", vec![Message::user("hello")]);
//! let ctx = PipelineContext::new(request, TenantContext::new("acme", 100), None);
//!
//! // `pipeline.run(&mut ctx)` is async; call it from within a tokio runtime,
//! // as the orchestrator does for every incoming request.
//! assert_eq!(ctx.status, gateway_state::ExecutionStatus::Created);
//! ```

pub mod builtin;
mod context;
mod events;
mod executor;
mod phase;
mod plugin;
mod registry;
mod variables;

pub use context::PipelineContext;
pub use events::PipelineEvent;
pub use executor::Pipeline;
pub use phase::Phase;
pub use plugin::Plugin;
pub use registry::PluginRegistry;
pub use variables::{VariableAlreadySet, Variables};
