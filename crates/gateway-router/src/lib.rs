//! Provider selection for the inference gateway.
//!
//! [`Router`] resolves a tenant's inference request to a provider: it
//! filters a candidate set handed to it by the orchestrator (already
//! narrowed to providers claiming the requested model) by pool
//! membership, exclusion list, and health, then ranks what's left with
//! the configured strategy. The strategy itself never touches the
//! provider registry or model repository — see [`strategy::rank`] — which
//! is what keeps each one independently testable.
//!
//! Failover across a `RoutingDecision`'s fallback list, and retrying
//! routing with an expanded exclusion list after a `QuotaExhausted`, are
//! the orchestrator's job, not this crate's; see spec §4.4's failover
//! loop.
//!
//! # Examples
//!
//! ```
//! use gateway_router::{Router, RoutingConfig, RoutingContext, RoutingCandidate, RoutingStrategy};
//! use gateway_core::tenant::TenantId;
//!
//! let router = Router::new(RoutingConfig::default());
//! let candidates = vec![
//!     RoutingCandidate::new("openai"),
//!     RoutingCandidate::new("local-llama"),
//! ];
//! let context = RoutingContext::new(TenantId::new("acme"))
//!     .with_strategy(RoutingStrategy::Failover);
//!
//! let decision = router.route("gpt-4", candidates, &context).unwrap();
//! assert!(!decision.selected_provider_id.is_empty());
//! ```

mod candidate;
mod config;
mod context;
mod decision;
mod events;
mod router;
mod strategy;

pub use candidate::RoutingCandidate;
pub use config::{RoutingConfig, RoutingConfigBuilder};
pub use context::RoutingContext;
pub use decision::{RoutingDecision, RoutingStrategy};
pub use events::RouterEvent;
pub use router::Router;
pub use strategy::{rank, RankedCandidate};
