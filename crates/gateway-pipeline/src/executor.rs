//! Runs the phase-ordered plugin pipeline against one [`PipelineContext`].

use std::sync::Arc;
use std::time::Instant;

use gateway_core::error::GatewayError;
use gateway_core::events::EventListeners;
#[cfg(feature = "metrics")]
use metrics::counter;

use crate::context::PipelineContext;
use crate::events::PipelineEvent;
use crate::phase::Phase;
use crate::registry::PluginRegistry;
use gateway_state::Signal;

/// The engine: a plugin registry plus the observers watching it run.
/// Stateless across requests beyond the registry itself — safe to share
/// behind an `Arc` across concurrently executing requests, since each
/// gets its own [`PipelineContext`].
pub struct Pipeline {
    registry: PluginRegistry,
    event_listeners: EventListeners<PipelineEvent>,
}

impl Pipeline {
    pub fn new(registry: PluginRegistry, event_listeners: EventListeners<PipelineEvent>) -> Self {
        Self {
            registry,
            event_listeners,
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Walks [`Phase::ALL`] in order, running each phase's enabled
    /// plugins in `(order, id)` sequence against `ctx`.
    ///
    /// VALIDATE/AUTHORIZE/PRE_PROCESSING/ROUTE/INFERENCE propagate the
    /// first plugin error verbatim — callers (the orchestrator) decide
    /// whether it's terminal or retriable via [`GatewayError::triggers_failover`].
    /// POST_PROCESSING failures are reported via the `PluginFailed` event
    /// and otherwise swallowed. AUDIT failures are always swallowed.
    ///
    /// Drives `ctx`'s execution state from `CREATED` to `RUNNING` before
    /// the first phase, and from `RUNNING` to `COMPLETED`/`FAILED` once
    /// the walk finishes, per the request lifecycle every orchestrator
    /// path follows.
    pub async fn run(&self, ctx: &mut PipelineContext) -> Result<(), GatewayError> {
        ctx.apply(Signal::Start)
            .map_err(|e| GatewayError::IllegalStateTransition(e.to_string()))?;

        let snapshot = self.registry.snapshot();

        for phase in Phase::ALL {
            if let Err(err) = self.run_phase_inner(phase, &snapshot, ctx).await {
                ctx.fail(err.clone());
                return Err(err);
            }
        }

        ctx.apply(Signal::ExecutionSuccess)
            .map_err(|e| GatewayError::IllegalStateTransition(e.to_string()))?;

        Ok(())
    }

    /// Runs a single phase in isolation, against a freshly loaded plugin
    /// snapshot. The orchestrator uses this instead of [`Pipeline::run`]
    /// so it can interleave its own circuit-breaker/rate-limiter/retry
    /// handling around INFERENCE while still reusing this executor's
    /// per-phase error policy and event emission for every other phase.
    /// Unlike `run`, a returned error does not itself drive `ctx` to
    /// `FAILED` — the caller decides, since a retriable INFERENCE failure
    /// must not terminate the request.
    pub async fn run_phase(&self, phase: Phase, ctx: &mut PipelineContext) -> Result<(), GatewayError> {
        let snapshot = self.registry.snapshot();
        self.run_phase_inner(phase, &snapshot, ctx).await
    }

    async fn run_phase_inner(
        &self,
        phase: Phase,
        snapshot: &std::collections::HashMap<Phase, Vec<Arc<dyn crate::plugin::Plugin>>>,
        ctx: &mut PipelineContext,
    ) -> Result<(), GatewayError> {
        let started = Instant::now();
        self.event_listeners.emit(&PipelineEvent::PhaseStarted {
            phase,
            timestamp: started,
        });

        let plugins = snapshot.get(&phase).map(|v| v.as_slice()).unwrap_or(&[]);

        for plugin in plugins {
            if !plugin.should_execute(ctx) {
                continue;
            }

            if let Err(err) = plugin.execute(ctx).await {
                self.event_listeners.emit(&PipelineEvent::PluginFailed {
                    plugin_id: plugin.id().to_string(),
                    phase,
                    timestamp: Instant::now(),
                });

                #[cfg(feature = "tracing")]
                tracing::warn!(plugin_id = plugin.id(), phase = %phase, error = %err, "plugin failed");
                #[cfg(feature = "metrics")]
                counter!("gateway_plugin_failures_total", "phase" => phase.as_str()).increment(1);

                if phase.is_audit() || phase.is_best_effort() {
                    continue;
                }
                return Err(err);
            }
        }

        let elapsed = started.elapsed();
        ctx.execution.timings.record(phase.as_str(), elapsed);
        self.event_listeners.emit(&PipelineEvent::PhaseCompleted {
            phase,
            elapsed,
            timestamp: Instant::now(),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::test_util::FnPlugin;
    use gateway_core::request::{InferenceRequest, Message};
    use gateway_core::tenant::TenantContext;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context() -> PipelineContext {
        let request = InferenceRequest::new("gpt-4", vec![Message::user("hi")]);
        PipelineContext::new(request, TenantContext::new("acme", 100), None)
    }

    #[tokio::test]
    async fn all_phases_run_for_a_fully_passing_pipeline() {
        let calls: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
        let registry = PluginRegistry::new();
        let plugins: Vec<Arc<dyn crate::plugin::Plugin>> = Phase::ALL
            .iter()
            .map(|&phase| {
                let calls = Arc::clone(&calls);
                Arc::new(FnPlugin {
                    id: format!("{phase}-seed"),
                    phase,
                    order: 0,
                    exec: move |_ctx| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    },
                }) as Arc<dyn crate::plugin::Plugin>
            })
            .collect();
        registry.register_all(plugins);

        let pipeline = Pipeline::new(registry, EventListeners::new());
        let mut ctx = context();
        pipeline.run(&mut ctx).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), Phase::ALL.len());
    }

    #[tokio::test]
    async fn validate_failure_short_circuits_the_pipeline() {
        let calls: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
        let registry = PluginRegistry::new();
        registry.register_all(vec![
            Arc::new(FnPlugin {
                id: "v1".into(),
                phase: Phase::Validate,
                order: 0,
                exec: |_ctx| {
                    Err(GatewayError::Validation {
                        message: "bad input".into(),
                    })
                },
            }) as Arc<dyn crate::plugin::Plugin>,
            {
                let calls = Arc::clone(&calls);
                Arc::new(FnPlugin {
                    id: "a1".into(),
                    phase: Phase::Authorize,
                    order: 0,
                    exec: move |_ctx| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    },
                }) as Arc<dyn crate::plugin::Plugin>
            },
        ]);

        let pipeline = Pipeline::new(registry, EventListeners::new());
        let mut ctx = context();
        let result = pipeline.run(&mut ctx).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.status, gateway_state::ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn post_processing_failure_does_not_fail_the_request() {
        let registry = PluginRegistry::new();
        registry.register_all(vec![Arc::new(FnPlugin {
            id: "p1".into(),
            phase: Phase::PostProcessing,
            order: 0,
            exec: |_ctx| {
                Err(GatewayError::Internal {
                    message: "tool exec blew up".into(),
                })
            },
        }) as Arc<dyn crate::plugin::Plugin>]);

        let pipeline = Pipeline::new(registry, EventListeners::new());
        let mut ctx = context();
        let result = pipeline.run(&mut ctx).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn audit_failure_is_always_swallowed() {
        let registry = PluginRegistry::new();
        registry.register_all(vec![Arc::new(FnPlugin {
            id: "aud1".into(),
            phase: Phase::Audit,
            order: 0,
            exec: |_ctx| {
                Err(GatewayError::Internal {
                    message: "sink unreachable".into(),
                })
            },
        }) as Arc<dyn crate::plugin::Plugin>]);

        let pipeline = Pipeline::new(registry, EventListeners::new());
        let mut ctx = context();
        let result = pipeline.run(&mut ctx).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn should_execute_false_skips_the_plugin() {
        let calls: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));

        struct SkipAlways(Arc<AtomicUsize>);

        #[async_trait::async_trait]
        impl crate::plugin::Plugin for SkipAlways {
            fn id(&self) -> &str {
                "skip"
            }
            fn phase(&self) -> Phase {
                Phase::Validate
            }
            fn should_execute(&self, _ctx: &PipelineContext) -> bool {
                false
            }
            async fn execute(&self, _ctx: &mut PipelineContext) -> Result<(), GatewayError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let registry = PluginRegistry::new();
        registry.register_all(vec![
            Arc::new(SkipAlways(Arc::clone(&calls))) as Arc<dyn crate::plugin::Plugin>
        ]);

        let pipeline = Pipeline::new(registry, EventListeners::new());
        let mut ctx = context();
        pipeline.run(&mut ctx).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
