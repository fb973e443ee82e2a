use std::time::{Duration, Instant};

use gateway_core::events::GatewayEvent;

use crate::circuit::CircuitState;

/// Events emitted by a circuit breaker instance.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The circuit moved from one state to another.
    StateTransition {
        pattern_name: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// A call was allowed through.
    CallPermitted {
        pattern_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call was rejected because the circuit is open.
    CallRejected {
        pattern_name: String,
        timestamp: Instant,
    },
    /// A call completed successfully and was recorded in the window.
    SuccessRecorded {
        pattern_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call failed and was recorded in the window.
    FailureRecorded {
        pattern_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call exceeded the slow-call duration threshold.
    SlowCallDetected {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
        state: CircuitState,
    },
}

impl GatewayEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "StateTransition",
            CircuitBreakerEvent::CallPermitted { .. } => "CallPermitted",
            CircuitBreakerEvent::CallRejected { .. } => "CallRejected",
            CircuitBreakerEvent::SuccessRecorded { .. } => "SuccessRecorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "FailureRecorded",
            CircuitBreakerEvent::SlowCallDetected { .. } => "SlowCallDetected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. }
            | CircuitBreakerEvent::SlowCallDetected { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { pattern_name, .. }
            | CircuitBreakerEvent::CallPermitted { pattern_name, .. }
            | CircuitBreakerEvent::CallRejected { pattern_name, .. }
            | CircuitBreakerEvent::SuccessRecorded { pattern_name, .. }
            | CircuitBreakerEvent::FailureRecorded { pattern_name, .. }
            | CircuitBreakerEvent::SlowCallDetected { pattern_name, .. } => pattern_name,
        }
    }
}
