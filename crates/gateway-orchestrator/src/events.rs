//! Lifecycle events the orchestrator emits once per request, per
//! spec §4.6 step 5: `onStart`, `onPhase`, `onProviderInvoke`,
//! `onSuccess`/`onFailure`. Emitted synchronously on the handling task,
//! same contract as [`gateway_pipeline::PipelineEvent`] — observers must
//! not block.

use std::time::{Duration, Instant};

use gateway_core::error::ErrorCode;
use gateway_core::events::GatewayEvent;
use gateway_core::tenant::TenantId;
use gateway_pipeline::Phase;
use uuid::Uuid;

/// One request's lifecycle, from acceptance through its terminal outcome.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    Started {
        request_id: Uuid,
        model_id: String,
        tenant_id: TenantId,
        timestamp: Instant,
    },
    PhaseCompleted {
        request_id: Uuid,
        phase: Phase,
        timestamp: Instant,
    },
    ProviderInvoked {
        request_id: Uuid,
        provider_id: String,
        attempt: usize,
        timestamp: Instant,
    },
    Succeeded {
        request_id: Uuid,
        provider_id: String,
        attempts: usize,
        elapsed: Duration,
        timestamp: Instant,
    },
    Failed {
        request_id: Uuid,
        code: ErrorCode,
        attempts: usize,
        elapsed: Duration,
        timestamp: Instant,
    },
}

impl GatewayEvent for OrchestratorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrchestratorEvent::Started { .. } => "started",
            OrchestratorEvent::PhaseCompleted { .. } => "phase_completed",
            OrchestratorEvent::ProviderInvoked { .. } => "provider_invoked",
            OrchestratorEvent::Succeeded { .. } => "succeeded",
            OrchestratorEvent::Failed { .. } => "failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            OrchestratorEvent::Started { timestamp, .. }
            | OrchestratorEvent::PhaseCompleted { timestamp, .. }
            | OrchestratorEvent::ProviderInvoked { timestamp, .. }
            | OrchestratorEvent::Succeeded { timestamp, .. }
            | OrchestratorEvent::Failed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        "orchestrator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_matches_variant() {
        let event = OrchestratorEvent::Started {
            request_id: Uuid::new_v4(),
            model_id: "gpt-4".into(),
            tenant_id: TenantId::new("acme"),
            timestamp: Instant::now(),
        };
        assert_eq!(event.event_type(), "started");
        assert_eq!(event.pattern_name(), "orchestrator");
    }
}
