//! One circuit breaker per provider, the shape the gateway actually needs:
//! a run of failures against one provider must not trip the breaker for a
//! different provider the same request could fail over to.

use std::sync::atomic::AtomicU8;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gateway_core::Registry;

use crate::circuit::{Circuit, CircuitState};
use crate::config::CircuitBreakerConfig;

/// One provider's breaker state, guarded by a blocking mutex. Held for the
/// duration of a single state read or outcome record, never across an
/// await point, so a `std::sync::Mutex` is the right tool rather than
/// `tokio::sync::Mutex`.
struct ProviderBreaker {
    circuit: Mutex<Circuit>,
    config: Arc<CircuitBreakerConfig<(), ()>>,
}

impl ProviderBreaker {
    fn new(config: Arc<CircuitBreakerConfig<(), ()>>) -> Self {
        Self {
            circuit: Mutex::new(Circuit::new_with_atomic(Arc::new(AtomicU8::new(
                CircuitState::Closed as u8,
            )))),
            config,
        }
    }

    fn try_acquire(&self) -> bool {
        self.circuit.lock().unwrap().try_acquire(&self.config)
    }

    fn record_success(&self, duration: Duration) {
        self.circuit
            .lock()
            .unwrap()
            .record_success(&self.config, duration);
    }

    fn record_failure(&self, duration: Duration) {
        self.circuit
            .lock()
            .unwrap()
            .record_failure(&self.config, duration);
    }

    fn state(&self) -> CircuitState {
        self.circuit.lock().unwrap().state()
    }

    fn reset(&self) {
        self.circuit.lock().unwrap().reset(&self.config);
    }
}

/// Lazily creates and caches one breaker per provider id, all sharing the
/// same `CircuitBreakerConfig` template. Built on `gateway_core::Registry`,
/// the same copy-on-write map the rate limiter registry uses.
pub struct CircuitBreakerRegistry {
    config: Arc<CircuitBreakerConfig<(), ()>>,
    breakers: Registry<String, ProviderBreaker>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig<(), ()>) -> Self {
        Self {
            config: Arc::new(config),
            breakers: Registry::new(),
        }
    }

    /// Returns whether a call to `provider_id` is currently permitted. Does
    /// not itself record an outcome; callers report the result via
    /// [`record_success`](Self::record_success)/[`record_failure`](Self::record_failure).
    pub fn try_acquire(&self, provider_id: &str) -> bool {
        self.breaker_for(provider_id).try_acquire()
    }

    pub fn record_success(&self, provider_id: &str, duration: Duration) {
        self.breaker_for(provider_id).record_success(duration);
    }

    pub fn record_failure(&self, provider_id: &str, duration: Duration) {
        self.breaker_for(provider_id).record_failure(duration);
    }

    pub fn state(&self, provider_id: &str) -> CircuitState {
        self.breaker_for(provider_id).state()
    }

    /// Forces the named provider's breaker back to closed with a clean
    /// window, without dropping its cached instance (unlike the rate
    /// limiter registry's `reset`, which discards the entry entirely).
    pub fn reset(&self, provider_id: &str) {
        self.breaker_for(provider_id).reset();
    }

    fn breaker_for(&self, provider_id: &str) -> Arc<ProviderBreaker> {
        let config = Arc::clone(&self.config);
        self.breakers
            .get_or_insert_with(provider_id.to_string(), move || {
                ProviderBreaker::new(Arc::clone(&config))
            })
    }
}
