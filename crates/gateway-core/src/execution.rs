//! Per-request execution bookkeeping: phase timings and the context
//! threaded through the orchestrator. The state machine itself
//! (`ExecutionStatus` and its transitions) lives in `gateway-state`; this
//! module only holds the data the state machine and the pipeline both
//! need to read and write.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::tenant::TenantContext;

/// Wall-clock duration spent in each named phase, recorded in the order
/// phases complete. Used for both `gateway_phase_duration_seconds` metrics
/// and the audit trail.
#[derive(Debug, Clone, Default)]
pub struct PhaseTimings {
    entries: Vec<(&'static str, Duration)>,
}

impl PhaseTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, phase: &'static str, elapsed: Duration) {
        self.entries.push((phase, elapsed));
    }

    pub fn total(&self) -> Duration {
        self.entries.iter().map(|(_, d)| *d).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, Duration)> {
        self.entries.iter()
    }
}

/// A small RAII stopwatch for timing a phase and recording it on drop-free
/// completion (callers call `finish` explicitly rather than relying on
/// `Drop`, so a short-circuited phase doesn't silently record zero time).
pub struct PhaseTimer {
    phase: &'static str,
    started: Instant,
}

impl PhaseTimer {
    pub fn start(phase: &'static str) -> Self {
        Self {
            phase,
            started: Instant::now(),
        }
    }

    pub fn finish(self, timings: &mut PhaseTimings) {
        timings.record(self.phase, self.started.elapsed());
    }
}

/// The mutable-but-single-owner context the orchestrator carries through
/// one request's lifetime: identity, deadline, and accumulated timings.
/// Plugins and the router receive a shared reference to this, never a
/// clone they could mutate independently, per the one-way-ownership
/// design.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub request_id: Uuid,
    pub tenant: TenantContext,
    pub deadline: Option<Instant>,
    pub timings: PhaseTimings,
    pub attributes: HashMap<String, String>,
}

impl ExecutionContext {
    pub fn new(request_id: Uuid, tenant: TenantContext, deadline: Option<Instant>) -> Self {
        Self {
            request_id,
            tenant,
            deadline,
            timings: PhaseTimings::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_timer_records_elapsed_on_finish() {
        let mut timings = PhaseTimings::new();
        let timer = PhaseTimer::start("route");
        std::thread::sleep(Duration::from_millis(1));
        timer.finish(&mut timings);
        assert_eq!(timings.iter().count(), 1);
        assert!(timings.total() >= Duration::from_millis(1));
    }

    #[test]
    fn expired_context_reports_is_expired() {
        let ctx = ExecutionContext::new(
            Uuid::new_v4(),
            TenantContext::new("acme", 100),
            Some(Instant::now() - Duration::from_secs(1)),
        );
        assert!(ctx.is_expired());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn no_deadline_never_expires() {
        let ctx = ExecutionContext::new(Uuid::new_v4(), TenantContext::new("acme", 100), None);
        assert!(!ctx.is_expired());
        assert_eq!(ctx.remaining(), None);
    }
}
