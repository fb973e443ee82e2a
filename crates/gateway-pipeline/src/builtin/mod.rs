//! Reference plugin implementations, one per phase, per spec §4.5's
//! built-in plugin seeds. All but `route`/`inference`/`validate` are
//! optional in a real deployment; they're wired up here so the pipeline
//! is useful out of the box and so downstream integrators have a worked
//! example to replace piecemeal.

mod audit;
mod authorize;
mod inference;
mod postprocessing;
mod preprocessing;
mod route;
mod validate;

pub use audit::{AuditBuiltin, AuditSink};
pub use authorize::AuthorizeBuiltin;
pub use inference::InferenceBuiltin;
pub use postprocessing::PostProcessingBuiltin;
pub use preprocessing::{ContextWindowPolicy, PreProcessingBuiltin};
pub use route::RouteBuiltin;
pub use validate::ValidateBuiltin;
