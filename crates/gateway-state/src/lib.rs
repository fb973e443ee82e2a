//! The execution state machine a single request moves through, from
//! acceptance to terminal completion, failure, or cancellation.
//!
//! Unlike the circuit breaker's `Circuit` (which derives its next state
//! from accumulated call statistics), [`ExecutionStatus::next`] is driven
//! by an explicit [`Signal`] the orchestrator emits — the transition
//! table is a pure function, not something with hidden internal counters.

use gateway_core::GatewayError;

mod transition;

pub use transition::IllegalStateTransition;

/// Where a single request currently stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Created,
    Running,
    /// Reserved: paused pending an external approval (`WAIT_REQUESTED`).
    /// No built-in plugin or orchestrator path drives a request into this
    /// state; it exists so a custom plugin can do so without extending
    /// the enum.
    Waiting,
    /// Reserved: paused pending an external resume signal. No built-in
    /// plugin or orchestrator path drives a request into this state
    /// either.
    Suspended,
    /// Between a retriable failure and the next attempt. The orchestrator
    /// cycles `Running -> Retrying -> Running` once per failover attempt.
    Retrying,
    Completed,
    Failed,
    Cancelled,
    /// A completed-but-since-reversed request (e.g. a refunded charge).
    /// Not terminal: it always resolves back to `Completed` via
    /// `COMPENSATION_DONE`. No built-in path drives a request into this
    /// state either.
    Compensated,
}

/// An event that advances a request's execution state.
#[derive(Debug, Clone)]
pub enum Signal {
    /// `CREATED -> RUNNING`, and, reused, `RETRYING -> RUNNING` ("retry
    /// START").
    Start,
    /// Legal from every state but `Compensated`; always `-> CANCELLED`.
    Cancel,
    /// `RUNNING -> WAITING`.
    WaitRequested,
    /// `WAITING -> RUNNING`.
    Approved,
    /// `WAITING -> RUNNING`, and `SUSPENDED -> RUNNING`.
    Resume,
    /// `WAITING -> FAILED`.
    Rejected(GatewayError),
    /// `RUNNING -> SUSPENDED`.
    Suspend,
    /// `RUNNING -> COMPENSATED`.
    Compensate,
    /// `COMPENSATED -> COMPLETED`.
    CompensationDone,
    /// `RUNNING -> RETRYING`.
    PhaseFailure(GatewayError),
    /// `RUNNING -> RETRYING`.
    ExecutionFailure(GatewayError),
    /// `RUNNING -> COMPLETED`.
    ExecutionSuccess,
    /// `RUNNING -> FAILED`.
    TerminalFailure(GatewayError),
    /// `RETRYING -> FAILED`.
    RetryExhausted(GatewayError),
}

impl ExecutionStatus {
    /// True once a request can no longer transition further, except for
    /// the idempotent redelivery of the signal that produced it.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    /// Computes the next state for `signal`, or an error if `signal` is
    /// not legal from the current state. A terminal state only accepts
    /// redelivery of the signal that reached it (treated as an identity,
    /// not a silent no-op of something else) — every other signal on a
    /// terminal state is illegal, so bugs surface immediately.
    pub fn next(self, signal: &Signal) -> Result<ExecutionStatus, IllegalStateTransition> {
        transition::next(self, signal)
    }
}
