//! The request-handling loop: walks the plugin pipeline through
//! VALIDATE/AUTHORIZE/PRE_PROCESSING/ROUTE, owns the retry/failover loop
//! around INFERENCE under circuit-breaker and rate-limiter control, then
//! hands back to the pipeline for POST_PROCESSING/AUDIT.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::StreamExt;
use gateway_core::stream::StreamChunk;

use gateway_circuitbreaker::CircuitBreakerRegistry;
use gateway_core::error::GatewayError;
use gateway_core::request::InferenceRequest;
use gateway_core::response::InferenceResponse;
use gateway_core::tenant::{TenantContext, TenantId};
use gateway_pipeline::{Phase, Pipeline, PipelineContext};
use gateway_provider::{ChunkStream, HealthStatus, ProviderRegistry};
use gateway_ratelimiter::{RateLimiterKey, TenantRateLimiterRegistry};
use gateway_retry::{ExponentialRandomBackoff, IntervalFunction};
use gateway_router::{Router, RoutingCandidate, RoutingContext, RoutingDecision};
use gateway_state::Signal;
use gateway_streaming::{CancelHandle, StreamTransport, StreamingConfig};

use crate::config::OrchestratorConfig;
use crate::events::OrchestratorEvent;

/// Binds the state machine, pipeline, router, provider registry, circuit
/// breaker registry, and rate limiter registry into one entry point.
/// Stateless itself beyond `config` — safe to share behind an `Arc` across
/// concurrently handled requests, the same way `Pipeline` is. `Clone` is
/// cheap (every field is an `Arc` or already `Clone`) and is what lets
/// [`Orchestrator::handle_stream`] hand a copy into the background task
/// that drives POST_PROCESSING/AUDIT after the stream itself has been
/// returned to the caller.
#[derive(Clone)]
pub struct Orchestrator {
    pipeline: Arc<Pipeline>,
    router: Arc<Router>,
    providers: Arc<ProviderRegistry>,
    circuit_breakers: Arc<CircuitBreakerRegistry>,
    rate_limiters: Arc<TenantRateLimiterRegistry>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        pipeline: Arc<Pipeline>,
        router: Arc<Router>,
        providers: Arc<ProviderRegistry>,
        circuit_breakers: Arc<CircuitBreakerRegistry>,
        rate_limiters: Arc<TenantRateLimiterRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            pipeline,
            router,
            providers,
            circuit_breakers,
            rate_limiters,
            config,
        }
    }

    /// Runs one request end to end. The returned error is whatever
    /// ultimately terminated the request; AUDIT always runs first,
    /// win or lose.
    pub async fn handle(
        &self,
        request: InferenceRequest,
        tenant: TenantContext,
        timeout: Option<Duration>,
    ) -> Result<InferenceResponse, GatewayError> {
        let model_id = request.model_id.clone();
        let tenant_id = tenant.tenant_id.clone();
        let started = Instant::now();

        self.config.event_listeners.emit(&OrchestratorEvent::Started {
            request_id: request.request_id,
            model_id: model_id.clone(),
            tenant_id: tenant_id.clone(),
            timestamp: Instant::now(),
        });

        let mut ctx = PipelineContext::new(request, tenant, timeout);
        if let Err(err) = ctx.apply(Signal::Start) {
            let err = GatewayError::IllegalStateTransition(err.to_string());
            return Err(self.finish_failure(&mut ctx, err, started).await);
        }

        if let Err(err) = self.run_prelude(&mut ctx).await {
            return Err(self.finish_failure(&mut ctx, err, started).await);
        }

        match self
            .run_inference_with_failover(&mut ctx, &model_id, &tenant_id)
            .await
        {
            Ok(response) => Ok(self.finish_success(&mut ctx, response, started).await),
            Err(err) => Err(self.finish_failure(&mut ctx, err, started).await),
        }
    }

    /// VALIDATE, AUTHORIZE, PRE_PROCESSING, ROUTE, in order. These all run
    /// while `ctx` sits in the single `Running` state — the execution
    /// state machine only distinguishes `Running`/`Retrying`/terminal, not
    /// individual phases; per-phase progress is tracked by
    /// `ExecutionContext`'s phase timings instead.
    async fn run_prelude(&self, ctx: &mut PipelineContext) -> Result<(), GatewayError> {
        const STEPS: [Phase; 4] = [Phase::Validate, Phase::Authorize, Phase::PreProcessing, Phase::Route];

        for phase in STEPS {
            self.pipeline.run_phase(phase, ctx).await?;

            self.config.event_listeners.emit(&OrchestratorEvent::PhaseCompleted {
                request_id: ctx.request_id(),
                phase,
                timestamp: Instant::now(),
            });
        }

        Ok(())
    }

    /// The INFERENCE retry/failover loop. On `QuotaExhausted`, re-routes
    /// with the failed provider excluded and consumes a retry. On
    /// `CircuitOpen`, skips straight to the next fallback without
    /// consuming one. `max_retries == 0` disables failover entirely: the
    /// first retriable failure on the initial provider is terminal.
    ///
    /// Every attempt that will be retried cycles `ctx` `Running ->
    /// Retrying -> Running`; if the budget is exhausted mid-cycle, `ctx`
    /// is left in `Retrying` so `finish_failure`'s `ctx.fail` resolves it
    /// to `FAILED` via `RetryExhausted`, matching the state machine.
    async fn run_inference_with_failover(
        &self,
        ctx: &mut PipelineContext,
        model_id: &str,
        tenant_id: &TenantId,
    ) -> Result<InferenceResponse, GatewayError> {
        let decision = ctx
            .variables
            .get::<RoutingDecision>("routing_decision")
            .cloned()
            .ok_or_else(|| GatewayError::Internal {
                message: "inference retry loop ran without a routing decision".into(),
            })?;

        let mut current_provider_id = decision.selected_provider_id;
        let mut fallback_queue: VecDeque<String> = decision.fallback_provider_ids.into_iter().collect();
        let mut excluded: Vec<String> = Vec::new();
        let mut retries_used: usize = 0;
        let mut attempt: usize = 0;

        let backoff = ExponentialRandomBackoff::new(self.config.retry_delay())
            .with_max_interval(Duration::from_secs(30))
            .with_randomization_factor(0.2);

        loop {
            attempt += 1;
            ctx.variables.overwrite("orchestrator_attempts", attempt);

            self.config.event_listeners.emit(&OrchestratorEvent::ProviderInvoked {
                request_id: ctx.request_id(),
                provider_id: current_provider_id.clone(),
                attempt,
                timestamp: Instant::now(),
            });

            let err = match self.invoke_provider(ctx, &current_provider_id).await {
                Ok(response) => {
                    ctx.apply(Signal::ExecutionSuccess)
                        .map_err(|e| GatewayError::IllegalStateTransition(e.to_string()))?;
                    return Ok(response);
                }
                Err(err) => err,
            };

            if !err.triggers_failover() || self.config.max_retries() == 0 {
                return Err(err);
            }

            ctx.apply(Signal::ExecutionFailure(err.clone()))
                .map_err(|e| GatewayError::IllegalStateTransition(e.to_string()))?;

            excluded.push(current_provider_id.clone());

            // CircuitOpen skips to the next fallback without counting
            // against max_retries; every other failover-triggering error
            // consumes one.
            if !matches!(err, GatewayError::CircuitOpen { .. }) {
                retries_used += 1;
                if retries_used > self.config.max_retries() {
                    return Err(GatewayError::AllProvidersExhausted {
                        model_id: model_id.to_string(),
                    });
                }
                tokio::time::sleep(backoff.interval(retries_used - 1)).await;
            }

            current_provider_id = self
                .next_candidate(ctx, model_id, tenant_id, &mut fallback_queue, &excluded)
                .await?;

            ctx.apply(Signal::Start)
                .map_err(|e| GatewayError::IllegalStateTransition(e.to_string()))?;
        }
    }

    /// Pops the next not-yet-excluded fallback, or re-routes from scratch
    /// with `excluded` applied when the fallback list is spent.
    async fn next_candidate(
        &self,
        ctx: &mut PipelineContext,
        model_id: &str,
        tenant_id: &TenantId,
        fallback_queue: &mut VecDeque<String>,
        excluded: &[String],
    ) -> Result<String, GatewayError> {
        while let Some(candidate) = fallback_queue.pop_front() {
            if !excluded.contains(&candidate) {
                ctx.variables.overwrite("selected_provider_id", candidate.clone());
                return Ok(candidate);
            }
        }

        let candidates = self.build_candidates(model_id);
        let routing_context = excluded
            .iter()
            .fold(RoutingContext::new(tenant_id.clone()), |rc, id| rc.exclude(id.clone()));

        let decision = self.router.route(model_id, candidates, &routing_context)?;
        *fallback_queue = decision.fallback_provider_ids.iter().cloned().collect();

        ctx.variables.overwrite("selected_provider_id", decision.selected_provider_id.clone());
        ctx.variables.overwrite("routing_decision", decision.clone());

        Ok(decision.selected_provider_id)
    }

    /// Acquires the circuit breaker and rate limiter permits for
    /// `provider_id`, then runs INFERENCE. Duration is measured from just
    /// before the phase runs (which is just before the provider call,
    /// since INFERENCE does no other work) to completion, per spec.
    async fn invoke_provider(
        &self,
        ctx: &mut PipelineContext,
        provider_id: &str,
    ) -> Result<InferenceResponse, GatewayError> {
        if !self.circuit_breakers.try_acquire(provider_id) {
            return Err(GatewayError::CircuitOpen {
                provider_id: provider_id.to_string(),
            });
        }

        let rate_limit_key = RateLimiterKey::new(
            provider_id.to_string(),
            ctx.execution.tenant.tenant_id.as_str().to_string(),
        );
        if self.rate_limiters.try_acquire(rate_limit_key).is_err() {
            return Err(GatewayError::QuotaExhausted {
                provider_id: provider_id.to_string(),
                retry_after: None,
            });
        }

        let invoked_at = Instant::now();
        let result = self.pipeline.run_phase(Phase::Inference, ctx).await;
        let elapsed = invoked_at.elapsed();

        match result {
            Ok(()) => {
                self.circuit_breakers.record_success(provider_id, elapsed);
                ctx.response.clone().ok_or_else(|| GatewayError::Internal {
                    message: "inference phase succeeded without producing a response".into(),
                })
            }
            Err(err) => {
                self.circuit_breakers.record_failure(provider_id, elapsed);
                Err(err)
            }
        }
    }

    /// Streaming counterpart to [`Orchestrator::handle`]. Runs the same
    /// VALIDATE/AUTHORIZE/PRE_PROCESSING/ROUTE prelude and the same
    /// circuit-breaker/rate-limiter-gated failover loop as the unary path,
    /// but calls the provider's `infer_stream` instead of driving the
    /// INFERENCE phase, and hands the raw chunk sequence through a
    /// [`StreamTransport`] before returning it. Because the request
    /// outcome isn't known until the stream itself terminates,
    /// POST_PROCESSING/AUDIT can't run inline here the way they do in
    /// `finish_success`/`finish_failure` — instead this spawns a
    /// background task that watches the transported stream for its
    /// terminal chunk and runs them there. Returns the transported
    /// stream plus a [`CancelHandle`] the caller can use to cut the
    /// stream short (honored by the transport's consumer loop, not by
    /// this method).
    pub async fn handle_stream(
        &self,
        request: InferenceRequest,
        tenant: TenantContext,
        timeout: Option<Duration>,
        streaming_config: StreamingConfig,
    ) -> Result<(gateway_streaming::ChunkStream, CancelHandle), GatewayError> {
        let model_id = request.model_id.clone();
        let tenant_id = tenant.tenant_id.clone();
        let started = Instant::now();

        self.config.event_listeners.emit(&OrchestratorEvent::Started {
            request_id: request.request_id,
            model_id: model_id.clone(),
            tenant_id: tenant_id.clone(),
            timestamp: Instant::now(),
        });

        let mut ctx = PipelineContext::new(request, tenant, timeout);
        if let Err(err) = ctx.apply(Signal::Start) {
            let err = GatewayError::IllegalStateTransition(err.to_string());
            self.finish_failure(&mut ctx, err.clone(), started).await;
            return Err(err);
        }

        if let Err(err) = self.run_prelude(&mut ctx).await {
            self.finish_failure(&mut ctx, err.clone(), started).await;
            return Err(err);
        }

        let request_id = ctx.request_id();
        let (raw_stream, provider_id, attempts) =
            match self.acquire_stream_with_failover(&mut ctx, &model_id, &tenant_id).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.finish_failure(&mut ctx, err.clone(), started).await;
                    return Err(err);
                }
            };

        let cancel = CancelHandle::new();
        let transport = StreamTransport::new(streaming_config);
        let transported = transport.run(request_id, raw_stream, cancel.clone());

        let orchestrator = self.clone();
        let watched = watch_stream_for_terminal_chunk(transported, move |succeeded| async move {
            let mut ctx = ctx;
            ctx.variables.overwrite("orchestrator_attempts", attempts);

            if succeeded {
                let _ = ctx.apply(Signal::ExecutionSuccess);
                let _ = orchestrator.pipeline.run_phase(Phase::PostProcessing, &mut ctx).await;
                let _ = orchestrator.pipeline.run_phase(Phase::Audit, &mut ctx).await;
                orchestrator.config.event_listeners.emit(&OrchestratorEvent::Succeeded {
                    request_id: ctx.request_id(),
                    provider_id,
                    attempts,
                    elapsed: started.elapsed(),
                    timestamp: Instant::now(),
                });
            } else {
                let err = GatewayError::Internal {
                    message: "stream ended without a terminal chunk".into(),
                };
                orchestrator.finish_failure(&mut ctx, err, started).await;
            }
        });

        Ok((watched, cancel))
    }

    /// Like [`Orchestrator::run_inference_with_failover`] but acquires a
    /// [`ChunkStream`] instead of driving the INFERENCE phase. Returns the
    /// stream together with the provider id that ultimately served it and
    /// the number of attempts taken, since both are needed once the
    /// stream's terminal chunk is observed. Cycles `ctx` through
    /// `Retrying` on every retried attempt exactly like the unary path.
    async fn acquire_stream_with_failover(
        &self,
        ctx: &mut PipelineContext,
        model_id: &str,
        tenant_id: &TenantId,
    ) -> Result<(ChunkStream, String, usize), GatewayError> {
        let decision = ctx
            .variables
            .get::<RoutingDecision>("routing_decision")
            .cloned()
            .ok_or_else(|| GatewayError::Internal {
                message: "streaming retry loop ran without a routing decision".into(),
            })?;

        let mut current_provider_id = decision.selected_provider_id;
        let mut fallback_queue: VecDeque<String> = decision.fallback_provider_ids.into_iter().collect();
        let mut excluded: Vec<String> = Vec::new();
        let mut retries_used: usize = 0;
        let mut attempt: usize = 0;

        let backoff = ExponentialRandomBackoff::new(self.config.retry_delay())
            .with_max_interval(Duration::from_secs(30))
            .with_randomization_factor(0.2);

        loop {
            attempt += 1;

            self.config.event_listeners.emit(&OrchestratorEvent::ProviderInvoked {
                request_id: ctx.request_id(),
                provider_id: current_provider_id.clone(),
                attempt,
                timestamp: Instant::now(),
            });

            let err = match self.invoke_provider_stream(ctx, &current_provider_id).await {
                Ok(stream) => return Ok((stream, current_provider_id, attempt)),
                Err(err) => err,
            };

            if !err.triggers_failover() || self.config.max_retries() == 0 {
                return Err(err);
            }

            ctx.apply(Signal::ExecutionFailure(err.clone()))
                .map_err(|e| GatewayError::IllegalStateTransition(e.to_string()))?;

            excluded.push(current_provider_id.clone());

            if !matches!(err, GatewayError::CircuitOpen { .. }) {
                retries_used += 1;
                if retries_used > self.config.max_retries() {
                    return Err(GatewayError::AllProvidersExhausted {
                        model_id: model_id.to_string(),
                    });
                }
                tokio::time::sleep(backoff.interval(retries_used - 1)).await;
            }

            current_provider_id = self
                .next_candidate(ctx, model_id, tenant_id, &mut fallback_queue, &excluded)
                .await?;

            ctx.apply(Signal::Start)
                .map_err(|e| GatewayError::IllegalStateTransition(e.to_string()))?;
        }
    }

    /// Acquires the circuit breaker and rate limiter permits for
    /// `provider_id`, then asks its adapter for a [`ChunkStream`] directly
    /// — the INFERENCE phase is unary-only (see
    /// `gateway_pipeline::builtin::InferenceBuiltin`), so streaming bypasses
    /// it and talks to the provider registry itself.
    async fn invoke_provider_stream(
        &self,
        ctx: &mut PipelineContext,
        provider_id: &str,
    ) -> Result<ChunkStream, GatewayError> {
        if !self.circuit_breakers.try_acquire(provider_id) {
            return Err(GatewayError::CircuitOpen {
                provider_id: provider_id.to_string(),
            });
        }

        let rate_limit_key = RateLimiterKey::new(
            provider_id.to_string(),
            ctx.execution.tenant.tenant_id.as_str().to_string(),
        );
        if self.rate_limiters.try_acquire(rate_limit_key).is_err() {
            return Err(GatewayError::QuotaExhausted {
                provider_id: provider_id.to_string(),
                retry_after: None,
            });
        }

        let adapter = self.providers.get(provider_id).ok_or_else(|| GatewayError::NoCompatibleProvider {
            model_id: ctx.request.model_id.clone(),
        })?;

        let invoked_at = Instant::now();
        let result = adapter.infer_stream(&ctx.request).await;
        let elapsed = invoked_at.elapsed();

        match result {
            Ok(stream) => {
                self.circuit_breakers.record_success(provider_id, elapsed);
                Ok(stream)
            }
            Err(err) => {
                self.circuit_breakers.record_failure(provider_id, elapsed);
                Err(err)
            }
        }
    }

    /// Builds routing candidates the same way `RouteBuiltin` does, since
    /// that logic is private to the pipeline plugin and re-routing mid
    /// failover needs it too.
    fn build_candidates(&self, model_id: &str) -> Vec<RoutingCandidate> {
        self.providers
            .candidates_for(model_id)
            .iter()
            .map(|adapter| {
                let descriptor = adapter.descriptor();
                let health = self
                    .providers
                    .health(&descriptor.provider_id)
                    .unwrap_or(HealthStatus::Healthy);
                RoutingCandidate::new(descriptor.provider_id.clone())
                    .with_vendor_tag(descriptor.vendor_tag)
                    .with_health(health)
            })
            .collect()
    }

    async fn finish_success(
        &self,
        ctx: &mut PipelineContext,
        response: InferenceResponse,
        started: Instant,
    ) -> InferenceResponse {
        let _ = self.pipeline.run_phase(Phase::PostProcessing, ctx).await;
        let _ = self.pipeline.run_phase(Phase::Audit, ctx).await;

        let attempts = ctx.variables.get::<usize>("orchestrator_attempts").copied().unwrap_or(1);
        self.config.event_listeners.emit(&OrchestratorEvent::Succeeded {
            request_id: ctx.request_id(),
            provider_id: response.provider_id.clone(),
            attempts,
            elapsed: started.elapsed(),
            timestamp: Instant::now(),
        });

        response
    }

    /// Marks `ctx` failed (so AUDIT reads the right level), emits `Failed`,
    /// then always runs AUDIT before returning the error to the caller.
    async fn finish_failure(&self, ctx: &mut PipelineContext, err: GatewayError, started: Instant) -> GatewayError {
        if !ctx.status.is_terminal() {
            ctx.fail(err.clone());
        }

        let attempts = ctx.variables.get::<usize>("orchestrator_attempts").copied().unwrap_or(0);
        self.config.event_listeners.emit(&OrchestratorEvent::Failed {
            request_id: ctx.request_id(),
            code: err.code(),
            attempts,
            elapsed: started.elapsed(),
            timestamp: Instant::now(),
        });

        let _ = self.pipeline.run_phase(Phase::Audit, ctx).await;

        err
    }
}

/// Wraps `stream` so every chunk still passes through untouched, but once
/// the terminal chunk is seen (or the source ends without ever producing
/// one) `on_terminal` is spawned exactly once with whether the stream
/// succeeded (a `Done` chunk) or not (an `Error` chunk, or no terminal
/// chunk at all). Spawning rather than awaiting inline means a slow
/// caller that stops polling this stream early still gets POST_PROCESSING
/// /AUDIT run — the callback doesn't wait on the consumer.
fn watch_stream_for_terminal_chunk<F, Fut>(
    stream: gateway_streaming::ChunkStream,
    on_terminal: F,
) -> gateway_streaming::ChunkStream
where
    F: FnOnce(bool) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let on_terminal = Arc::new(Mutex::new(Some(on_terminal)));

    futures::stream::unfold((stream, on_terminal), |(mut stream, on_terminal)| async move {
        match stream.next().await {
            Some(chunk) => {
                if chunk.is_terminal() {
                    let succeeded = !matches!(chunk, StreamChunk::Error { .. });
                    if let Some(f) = on_terminal.lock().unwrap().take() {
                        tokio::spawn(f(succeeded));
                    }
                }
                Some((chunk, (stream, on_terminal)))
            }
            None => {
                if let Some(f) = on_terminal.lock().unwrap().take() {
                    tokio::spawn(f(false));
                }
                None
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_circuitbreaker::CircuitBreakerConfig;
    use gateway_core::request::Message;
    use gateway_pipeline::builtin::{AuditBuiltin, AuthorizeBuiltin, InferenceBuiltin, RouteBuiltin, ValidateBuiltin};
    use gateway_pipeline::{Plugin, PluginRegistry};
    use gateway_provider::adapter::test_util::echo_adapter;
    use gateway_provider::ProviderRegistryConfig;
    use gateway_ratelimiter::RateLimiterConfig;
    use gateway_router::RoutingConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingAuditSink {
        events: Mutex<Vec<String>>,
    }

    impl RecordingAuditSink {
        fn new() -> Arc<Self> {
            Arc::new(Self { events: Mutex::new(Vec::new()) })
        }
    }

    impl gateway_pipeline::builtin::AuditSink for RecordingAuditSink {
        fn record(&self, payload: gateway_core::audit::AuditPayload) {
            self.events.lock().unwrap().push(payload.event);
        }
    }

    fn providers(ids: &[&str]) -> Arc<ProviderRegistry> {
        let registry = Arc::new(ProviderRegistry::new(ProviderRegistryConfig::default()));
        for id in ids {
            registry.register(echo_adapter(*id));
        }
        registry
    }

    fn build_orchestrator(
        providers: Arc<ProviderRegistry>,
        config: OrchestratorConfig,
        sink: Arc<RecordingAuditSink>,
    ) -> Orchestrator {
        let router = Arc::new(Router::new(RoutingConfig::default()));
        let registry = PluginRegistry::new();
        registry.register_all(vec![
            Arc::new(ValidateBuiltin::new(1_000_000)) as Arc<dyn Plugin>,
            Arc::new(AuthorizeBuiltin::new()) as Arc<dyn Plugin>,
            Arc::new(RouteBuiltin::new(Arc::clone(&providers), Arc::clone(&router))) as Arc<dyn Plugin>,
            Arc::new(InferenceBuiltin::new(Arc::clone(&providers))) as Arc<dyn Plugin>,
            Arc::new(AuditBuiltin::new(sink, "node-1")) as Arc<dyn Plugin>,
        ]);
        let pipeline = Arc::new(Pipeline::new(registry, gateway_core::events::EventListeners::new()));

        let circuit_breakers = Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig::builder().build_config()));
        let rate_limiters = Arc::new(TenantRateLimiterRegistry::new(RateLimiterConfig {
            window_type: gateway_ratelimiter::WindowType::TokenBucket,
            limit_for_period: 1000,
            refresh_period: Duration::from_secs(60),
            timeout_duration: Duration::from_millis(0),
            event_listeners: gateway_core::events::EventListeners::new(),
            name: "test".into(),
        }));

        Orchestrator::new(pipeline, router, providers, circuit_breakers, rate_limiters, config)
    }

    fn request() -> InferenceRequest {
        InferenceRequest::new("gpt-4", vec![Message::user("hi")])
    }

    #[tokio::test]
    async fn successful_request_runs_audit_and_returns_response() {
        let sink = RecordingAuditSink::new();
        let orchestrator = build_orchestrator(providers(&["p1"]), OrchestratorConfig::default(), Arc::clone(&sink));

        let response = orchestrator
            .handle(request(), TenantContext::new("acme", 100), None)
            .await
            .unwrap();

        assert_eq!(response.provider_id, "p1");
        assert_eq!(sink.events.lock().unwrap().as_slice(), ["request_completed"]);
    }

    #[tokio::test]
    async fn no_compatible_provider_is_terminal_and_still_audited() {
        let sink = RecordingAuditSink::new();
        let orchestrator = build_orchestrator(providers(&[]), OrchestratorConfig::default(), Arc::clone(&sink));

        let err = orchestrator
            .handle(request(), TenantContext::new("acme", 100), None)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::NoCompatibleProvider { .. }));
        assert_eq!(sink.events.lock().unwrap().len(), 1);
        assert!(sink.events.lock().unwrap()[0].starts_with("request_failed"));
    }

    #[tokio::test]
    async fn circuit_open_fails_over_without_consuming_a_retry() {
        let sink = RecordingAuditSink::new();
        let providers = providers(&["p1", "p2"]);
        let orchestrator = build_orchestrator(
            Arc::clone(&providers),
            OrchestratorConfig::builder().max_retries(1).build(),
            Arc::clone(&sink),
        );

        orchestrator.circuit_breakers.reset("p1");
        for _ in 0..10 {
            orchestrator.circuit_breakers.record_failure("p1", Duration::from_millis(1));
        }
        assert_eq!(
            orchestrator.circuit_breakers.state("p1"),
            gateway_circuitbreaker::CircuitState::Open
        );

        let response = orchestrator
            .handle(request(), TenantContext::new("acme", 100), None)
            .await
            .unwrap();

        assert_eq!(response.provider_id, "p2");
    }

    #[tokio::test]
    async fn max_retries_zero_disables_failover() {
        let sink = RecordingAuditSink::new();
        let providers = providers(&["p1", "p2"]);
        let orchestrator = build_orchestrator(
            Arc::clone(&providers),
            OrchestratorConfig::builder().max_retries(0).build(),
            Arc::clone(&sink),
        );

        orchestrator.circuit_breakers.reset("p1");
        for _ in 0..10 {
            orchestrator.circuit_breakers.record_failure("p1", Duration::from_millis(1));
        }

        let err = orchestrator
            .handle(request(), TenantContext::new("acme", 100), None)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::CircuitOpen { .. }));
    }

    #[tokio::test]
    async fn started_and_succeeded_events_fire() {
        let sink = RecordingAuditSink::new();
        let started_count = Arc::new(AtomicUsize::new(0));
        let succeeded_count = Arc::new(AtomicUsize::new(0));
        let sc = Arc::clone(&started_count);
        let xc = Arc::clone(&succeeded_count);

        let config = OrchestratorConfig::builder()
            .on_start(move |_| {
                sc.fetch_add(1, Ordering::SeqCst);
            })
            .on_success(move |_| {
                xc.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let orchestrator = build_orchestrator(providers(&["p1"]), config, sink);
        orchestrator
            .handle(request(), TenantContext::new("acme", 100), None)
            .await
            .unwrap();

        assert_eq!(started_count.load(Ordering::SeqCst), 1);
        assert_eq!(succeeded_count.load(Ordering::SeqCst), 1);
    }

    fn buffered_streaming_config() -> gateway_streaming::StreamingConfig {
        gateway_streaming::StreamingConfig::builder()
            .backpressure(gateway_streaming::BackpressureMode::Buffer(8))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn streaming_request_yields_a_terminal_chunk_and_runs_audit() {
        let sink = RecordingAuditSink::new();
        let orchestrator = build_orchestrator(providers(&["p1"]), OrchestratorConfig::default(), Arc::clone(&sink));

        let (mut stream, _cancel) = orchestrator
            .handle_stream(request(), TenantContext::new("acme", 100), None, buffered_streaming_config())
            .await
            .unwrap();

        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk);
        }

        assert!(!chunks.is_empty());
        assert!(chunks.last().unwrap().is_terminal());

        for _ in 0..50 {
            if !sink.events.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(sink.events.lock().unwrap().as_slice(), ["request_completed"]);
    }

    #[tokio::test]
    async fn streaming_request_with_no_compatible_provider_is_terminal() {
        let sink = RecordingAuditSink::new();
        let orchestrator = build_orchestrator(providers(&[]), OrchestratorConfig::default(), Arc::clone(&sink));

        let err = orchestrator
            .handle_stream(request(), TenantContext::new("acme", 100), None, buffered_streaming_config())
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::NoCompatibleProvider { .. }));
    }

    #[tokio::test]
    async fn streaming_request_fails_over_on_circuit_open() {
        let sink = RecordingAuditSink::new();
        let providers = providers(&["p1", "p2"]);
        let orchestrator = build_orchestrator(
            Arc::clone(&providers),
            OrchestratorConfig::builder().max_retries(1).build(),
            Arc::clone(&sink),
        );

        orchestrator.circuit_breakers.reset("p1");
        for _ in 0..10 {
            orchestrator.circuit_breakers.record_failure("p1", Duration::from_millis(1));
        }

        let (mut stream, _cancel) = orchestrator
            .handle_stream(request(), TenantContext::new("acme", 100), None, buffered_streaming_config())
            .await
            .unwrap();

        let mut last = None;
        while let Some(chunk) = stream.next().await {
            last = Some(chunk);
        }
        assert!(last.unwrap().is_terminal());
    }
}
