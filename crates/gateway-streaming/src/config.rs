//! Streaming transport configuration.
//!
//! Mirrors the teacher's `*ConfigBuilder` convention (see
//! `gateway-circuitbreaker::config`, `gateway-ratelimiter::config`):
//! a builder with sensible defaults whose `build()` validates invariants
//! and returns a `Result` rather than panicking. The one deliberate
//! exception is [`BackpressureMode`] itself, which has no default —
//! per the spec's Open Questions resolution, the gateway must never
//! silently pick BUFFER or LATEST; callers choose explicitly or
//! `build()` fails.

use std::time::Duration;

use gateway_core::events::{EventListener, EventListeners};

use crate::error::StreamConfigError;
use crate::events::StreamEvent;

/// The backpressure policy applied when a stream producer outruns its
/// consumer (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressureMode {
    /// Bounded buffer of `capacity` chunks; the producer blocks once full.
    Buffer(usize),
    /// Ring buffer of `capacity` chunks; a full buffer drops the oldest
    /// unread chunk to make room for the newest.
    DropOldest(usize),
    /// Single-slot buffer; a new chunk always overwrites whatever hasn't
    /// been read yet.
    Latest,
    /// Bounded buffer of `capacity` chunks; a full buffer fails the
    /// stream instead of blocking or dropping.
    Error(usize),
}

impl BackpressureMode {
    pub fn label(&self) -> &'static str {
        match self {
            BackpressureMode::Buffer(_) => "buffer",
            BackpressureMode::DropOldest(_) => "drop_oldest",
            BackpressureMode::Latest => "latest",
            BackpressureMode::Error(_) => "error",
        }
    }

    fn capacity(&self) -> Option<usize> {
        match self {
            BackpressureMode::Buffer(n) | BackpressureMode::DropOldest(n) | BackpressureMode::Error(n) => Some(*n),
            BackpressureMode::Latest => None,
        }
    }
}

/// Validated streaming transport configuration.
#[derive(Clone)]
pub struct StreamingConfig {
    pub(crate) backpressure: BackpressureMode,
    pub(crate) idle_timeout: Duration,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<StreamEvent>,
}

impl StreamingConfig {
    pub fn builder() -> StreamingConfigBuilder {
        StreamingConfigBuilder::new()
    }

    pub fn backpressure(&self) -> BackpressureMode {
        self.backpressure
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`StreamingConfig`].
pub struct StreamingConfigBuilder {
    backpressure: Option<BackpressureMode>,
    idle_timeout: Duration,
    name: String,
    event_listeners: EventListeners<StreamEvent>,
}

impl StreamingConfigBuilder {
    fn new() -> Self {
        Self {
            backpressure: None,
            idle_timeout: Duration::from_secs(30),
            name: "streaming".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Required. No default — see the module docs.
    pub fn backpressure(mut self, mode: BackpressureMode) -> Self {
        self.backpressure = Some(mode);
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_event<L>(mut self, listener: L) -> Self
    where
        L: EventListener<StreamEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    pub fn build(self) -> Result<StreamingConfig, StreamConfigError> {
        let backpressure = self.backpressure.ok_or(StreamConfigError::MissingBackpressureMode)?;

        if let Some(0) = backpressure.capacity() {
            return Err(StreamConfigError::ZeroCapacity);
        }
        if self.idle_timeout.is_zero() {
            return Err(StreamConfigError::ZeroIdleTimeout);
        }

        Ok(StreamingConfig {
            backpressure,
            idle_timeout: self.idle_timeout,
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_backpressure_mode_is_rejected() {
        let err = StreamingConfig::builder().build().unwrap_err();
        assert!(matches!(err, StreamConfigError::MissingBackpressureMode));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = StreamingConfig::builder()
            .backpressure(BackpressureMode::Buffer(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, StreamConfigError::ZeroCapacity));
    }

    #[test]
    fn zero_idle_timeout_is_rejected() {
        let err = StreamingConfig::builder()
            .backpressure(BackpressureMode::Latest)
            .idle_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, StreamConfigError::ZeroIdleTimeout));
    }

    #[test]
    fn valid_config_builds() {
        let config = StreamingConfig::builder()
            .backpressure(BackpressureMode::DropOldest(8))
            .idle_timeout(Duration::from_secs(5))
            .name("test-stream")
            .build()
            .unwrap();
        assert_eq!(config.backpressure(), BackpressureMode::DropOldest(8));
        assert_eq!(config.name(), "test-stream");
    }
}
