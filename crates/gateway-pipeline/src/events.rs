//! Observability events emitted by [`crate::executor::Pipeline`].

use std::time::{Duration, Instant};

use gateway_core::events::GatewayEvent;

use crate::phase::Phase;

/// Lifecycle events emitted once per phase/plugin, synchronously on the
/// executing task — observers must not block, per spec §4.6.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    PhaseStarted {
        phase: Phase,
        timestamp: Instant,
    },
    PhaseCompleted {
        phase: Phase,
        elapsed: Duration,
        timestamp: Instant,
    },
    PluginFailed {
        plugin_id: String,
        phase: Phase,
        timestamp: Instant,
    },
}

impl GatewayEvent for PipelineEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::PhaseStarted { .. } => "phase_started",
            PipelineEvent::PhaseCompleted { .. } => "phase_completed",
            PipelineEvent::PluginFailed { .. } => "plugin_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            PipelineEvent::PhaseStarted { timestamp, .. }
            | PipelineEvent::PhaseCompleted { timestamp, .. }
            | PipelineEvent::PluginFailed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            PipelineEvent::PhaseStarted { phase, .. }
            | PipelineEvent::PhaseCompleted { phase, .. }
            | PipelineEvent::PluginFailed { phase, .. } => phase.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_matches_variant() {
        let event = PipelineEvent::PhaseStarted {
            phase: Phase::Validate,
            timestamp: Instant::now(),
        };
        assert_eq!(event.event_type(), "phase_started");
        assert_eq!(event.pattern_name(), "validate");
    }
}
