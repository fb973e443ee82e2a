//! The plugin contract: a unit of behavior bound to exactly one phase.

use gateway_core::error::GatewayError;

use crate::context::PipelineContext;
use crate::phase::Phase;

/// A pure collaborator the pipeline invokes once per request, provided
/// [`Plugin::should_execute`] returns `true`. Implementors mutate the
/// context's variables/metadata; they never talk to each other directly
/// except through values left in [`crate::variables::Variables`].
#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
    /// Stable identifier. Used as the tiebreaker when two plugins in the
    /// same phase share an `order`, and to name the plugin in
    /// `PluginFailure` errors.
    fn id(&self) -> &str;

    /// The single phase this plugin is bound to.
    fn phase(&self) -> Phase;

    /// Execution rank within `phase`. Lower runs first; ties broken by
    /// `id` lexicographically.
    fn order(&self) -> i64 {
        0
    }

    /// A pure predicate deciding whether this plugin runs at all for
    /// `ctx`. Defaults to always-run.
    fn should_execute(&self, ctx: &PipelineContext) -> bool {
        let _ = ctx;
        true
    }

    /// Runs the plugin's behavior, mutating `ctx` as needed.
    async fn execute(&self, ctx: &mut PipelineContext) -> Result<(), GatewayError>;
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// A plugin whose `execute` is a caller-supplied closure, for
    /// exercising the executor without a bespoke struct per test.
    pub struct FnPlugin<F> {
        pub id: String,
        pub phase: Phase,
        pub order: i64,
        pub exec: F,
    }

    #[async_trait::async_trait]
    impl<F> Plugin for FnPlugin<F>
    where
        F: Fn(&mut PipelineContext) -> Result<(), GatewayError> + Send + Sync,
    {
        fn id(&self) -> &str {
            &self.id
        }

        fn phase(&self) -> Phase {
            self.phase
        }

        fn order(&self) -> i64 {
            self.order
        }

        async fn execute(&self, ctx: &mut PipelineContext) -> Result<(), GatewayError> {
            (self.exec)(ctx)
        }
    }
}
