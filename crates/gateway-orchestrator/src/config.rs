//! Builder for [`OrchestratorConfig`], following the same
//! `xxxConfigBuilder` shape used across every other gateway-* crate.

use std::time::Duration;

use gateway_core::events::{EventListeners, FnListener};

use crate::events::OrchestratorEvent;

/// Tunables for the retry/failover loop around `INFERENCE`. Everything
/// else about the loop (which errors trigger failover, which consume a
/// retry) is fixed by `GatewayError::triggers_failover` and is not
/// configurable per-orchestrator.
#[derive(Clone)]
pub struct OrchestratorConfig {
    pub(crate) max_retries: usize,
    pub(crate) retry_delay: Duration,
    pub(crate) event_listeners: EventListeners<OrchestratorEvent>,
    pub(crate) name: String,
}

impl OrchestratorConfig {
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::default()
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfigBuilder::default().build()
    }
}

/// Builds an [`OrchestratorConfig`]. `max_retries` defaults to 3,
/// `retry_delay` (the base interval before exponential doubling) to 500ms.
/// `max_retries = 0` disables failover entirely: the first retriable
/// failure on the initial provider is surfaced as terminal.
pub struct OrchestratorConfigBuilder {
    max_retries: usize,
    retry_delay: Duration,
    event_listeners: EventListeners<OrchestratorEvent>,
    name: String,
}

impl Default for OrchestratorConfigBuilder {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }
}

impl OrchestratorConfigBuilder {
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register a callback for `onStart`.
    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&OrchestratorEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(
            move |event: &OrchestratorEvent| {
                if matches!(event, OrchestratorEvent::Started { .. }) {
                    f(event);
                }
            },
        ));
        self
    }

    /// Register a callback for `onPhase`.
    pub fn on_phase<F>(mut self, f: F) -> Self
    where
        F: Fn(&OrchestratorEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(
            move |event: &OrchestratorEvent| {
                if matches!(event, OrchestratorEvent::PhaseCompleted { .. }) {
                    f(event);
                }
            },
        ));
        self
    }

    /// Register a callback for `onProviderInvoke`.
    pub fn on_provider_invoke<F>(mut self, f: F) -> Self
    where
        F: Fn(&OrchestratorEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(
            move |event: &OrchestratorEvent| {
                if matches!(event, OrchestratorEvent::ProviderInvoked { .. }) {
                    f(event);
                }
            },
        ));
        self
    }

    /// Register a callback for `onSuccess`.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&OrchestratorEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(
            move |event: &OrchestratorEvent| {
                if matches!(event, OrchestratorEvent::Succeeded { .. }) {
                    f(event);
                }
            },
        ));
        self
    }

    /// Register a callback for `onFailure`.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&OrchestratorEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(
            move |event: &OrchestratorEvent| {
                if matches!(event, OrchestratorEvent::Failed { .. }) {
                    f(event);
                }
            },
        ));
        self
    }

    pub fn build(self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
