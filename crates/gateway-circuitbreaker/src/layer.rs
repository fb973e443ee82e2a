use crate::config::CircuitBreakerConfig;
use crate::CircuitBreaker;
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that applies circuit breaker behavior to an inner service.
///
/// # Example
///
/// ```rust
/// use tower::{ServiceBuilder, service_fn};
/// use gateway_circuitbreaker::CircuitBreakerLayer;
///
/// let layer = CircuitBreakerLayer::<String, std::io::Error>::builder()
///     .failure_rate_threshold(0.5)
///     .build();
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) }));
/// ```
#[derive(Clone)]
pub struct CircuitBreakerLayer<Res, Err> {
    config: Arc<CircuitBreakerConfig<Res, Err>>,
}

impl<Res, Err> CircuitBreakerLayer<Res, Err> {
    /// Creates a new `CircuitBreakerLayer` from the given configuration.
    pub(crate) fn new(config: CircuitBreakerConfig<Res, Err>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a circuit breaker layer.
    pub fn builder() -> crate::CircuitBreakerConfigBuilder<Res, Err> {
        crate::CircuitBreakerConfigBuilder::new()
    }

    // =========================================================================
    // Presets
    // =========================================================================

    /// Preset: standard balanced circuit breaker configuration.
    ///
    /// 50% failure rate threshold, 100-call sliding window, 30 second wait
    /// duration in open, 3 permitted calls in half-open.
    pub fn standard() -> crate::CircuitBreakerConfigBuilder<Res, Err> {
        use std::time::Duration;
        Self::builder()
            .failure_rate_threshold(0.5)
            .sliding_window_size(100)
            .wait_duration_in_open(Duration::from_secs(30))
            .permitted_calls_in_half_open(3)
    }

    /// Preset: fast-fail circuit breaker for latency-sensitive scenarios.
    ///
    /// 25% failure rate threshold, 20-call window, 10 second wait in open,
    /// 1 permitted call in half-open.
    pub fn fast_fail() -> crate::CircuitBreakerConfigBuilder<Res, Err> {
        use std::time::Duration;
        Self::builder()
            .failure_rate_threshold(0.25)
            .sliding_window_size(20)
            .wait_duration_in_open(Duration::from_secs(10))
            .permitted_calls_in_half_open(1)
    }

    /// Preset: tolerant circuit breaker for flaky downstreams.
    ///
    /// 75% failure rate threshold, 200-call window, 60 second wait in open,
    /// 5 permitted calls in half-open.
    pub fn tolerant() -> crate::CircuitBreakerConfigBuilder<Res, Err> {
        use std::time::Duration;
        Self::builder()
            .failure_rate_threshold(0.75)
            .sliding_window_size(200)
            .wait_duration_in_open(Duration::from_secs(60))
            .permitted_calls_in_half_open(5)
    }
}

impl<S, Req, Res, Err> Layer<S> for CircuitBreakerLayer<Res, Err>
where
    S: tower::Service<Req, Response = Res, Error = Err>,
{
    type Service = crate::CircuitBreaker<S, Req, Res, Err>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(service, Arc::clone(&self.config))
    }
}
