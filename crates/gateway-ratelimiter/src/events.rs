use std::time::{Duration, Instant};

use gateway_core::events::GatewayEvent;

/// Events emitted by the rate limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A permit was acquired, either immediately or after waiting.
    PermitAcquired {
        pattern_name: String,
        timestamp: Instant,
        wait_duration: Duration,
    },
    /// A permit request was rejected because no permit became available
    /// within the configured timeout.
    PermitRejected {
        pattern_name: String,
        timestamp: Instant,
        timeout_duration: Duration,
    },
    /// The limiter's window rolled over and permits were replenished.
    PermitsRefreshed {
        pattern_name: String,
        timestamp: Instant,
        available_permits: usize,
    },
}

impl GatewayEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::PermitAcquired { .. } => "PermitAcquired",
            RateLimiterEvent::PermitRejected { .. } => "PermitRejected",
            RateLimiterEvent::PermitsRefreshed { .. } => "PermitsRefreshed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::PermitAcquired { timestamp, .. }
            | RateLimiterEvent::PermitRejected { timestamp, .. }
            | RateLimiterEvent::PermitsRefreshed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RateLimiterEvent::PermitAcquired { pattern_name, .. }
            | RateLimiterEvent::PermitRejected { pattern_name, .. }
            | RateLimiterEvent::PermitsRefreshed { pattern_name, .. } => pattern_name,
        }
    }
}
