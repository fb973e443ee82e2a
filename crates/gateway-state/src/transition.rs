use std::fmt;

use thiserror::Error;

use crate::{ExecutionStatus, Signal};

/// A signal was sent to a state that cannot legally accept it.
#[derive(Debug, Error, Clone)]
#[error("cannot apply {signal} to state {from:?}")]
pub struct IllegalStateTransition {
    pub from: ExecutionStatus,
    pub signal: SignalKind,
}

/// The discriminant of a [`Signal`], used in error messages so
/// `IllegalStateTransition` doesn't need to carry a full (possibly
/// expensive-to-clone) `GatewayError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Start,
    Cancel,
    WaitRequested,
    Approved,
    Resume,
    Rejected,
    Suspend,
    Compensate,
    CompensationDone,
    PhaseFailure,
    ExecutionFailure,
    ExecutionSuccess,
    TerminalFailure,
    RetryExhausted,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

fn kind(signal: &Signal) -> SignalKind {
    match signal {
        Signal::Start => SignalKind::Start,
        Signal::Cancel => SignalKind::Cancel,
        Signal::WaitRequested => SignalKind::WaitRequested,
        Signal::Approved => SignalKind::Approved,
        Signal::Resume => SignalKind::Resume,
        Signal::Rejected(_) => SignalKind::Rejected,
        Signal::Suspend => SignalKind::Suspend,
        Signal::Compensate => SignalKind::Compensate,
        Signal::CompensationDone => SignalKind::CompensationDone,
        Signal::PhaseFailure(_) => SignalKind::PhaseFailure,
        Signal::ExecutionFailure(_) => SignalKind::ExecutionFailure,
        Signal::ExecutionSuccess => SignalKind::ExecutionSuccess,
        Signal::TerminalFailure(_) => SignalKind::TerminalFailure,
        Signal::RetryExhausted(_) => SignalKind::RetryExhausted,
    }
}

fn illegal(from: ExecutionStatus, signal: &Signal) -> IllegalStateTransition {
    IllegalStateTransition {
        from,
        signal: kind(signal),
    }
}

/// The canonical transition table: `CREATED, RUNNING, WAITING, SUSPENDED,
/// RETRYING, COMPLETED, FAILED, CANCELLED, COMPENSATED`. `COMPENSATED` is
/// deliberately not in the terminal set below — it always resolves onward
/// to `COMPLETED`.
pub(crate) fn next(
    from: ExecutionStatus,
    signal: &Signal,
) -> Result<ExecutionStatus, IllegalStateTransition> {
    use ExecutionStatus::*;
    use Signal::*;

    match (from, signal) {
        // CREATED
        (Created, Start) => Ok(Running),
        (Created, Cancel) => Ok(Cancelled),

        // RUNNING
        (Running, WaitRequested) => Ok(Waiting),
        (Running, PhaseFailure(_)) => Ok(Retrying),
        (Running, ExecutionFailure(_)) => Ok(Retrying),
        (Running, ExecutionSuccess) => Ok(Completed),
        (Running, TerminalFailure(_)) => Ok(Failed),
        (Running, Suspend) => Ok(Suspended),
        (Running, Cancel) => Ok(Cancelled),
        (Running, Compensate) => Ok(Compensated),

        // WAITING
        (Waiting, Approved) => Ok(Running),
        (Waiting, Resume) => Ok(Running),
        (Waiting, Rejected(_)) => Ok(Failed),
        (Waiting, Cancel) => Ok(Cancelled),

        // SUSPENDED
        (Suspended, Resume) => Ok(Running),
        (Suspended, Cancel) => Ok(Cancelled),

        // RETRYING
        (Retrying, Start) => Ok(Running),
        (Retrying, RetryExhausted(_)) => Ok(Failed),
        (Retrying, Cancel) => Ok(Cancelled),

        // COMPENSATED — non-terminal, always resolves onward.
        (Compensated, CompensationDone) => Ok(Completed),

        // Terminal states: no outgoing transitions, but redelivery of the
        // signal that produced the state is the identity, not an error.
        (Completed, ExecutionSuccess) => Ok(Completed),
        (Failed, TerminalFailure(_)) => Ok(Failed),
        (Failed, RetryExhausted(_)) => Ok(Failed),
        (Failed, Rejected(_)) => Ok(Failed),
        (Cancelled, Cancel) => Ok(Cancelled),

        _ => Err(illegal(from, signal)),
    }
}
