//! Unified error taxonomy for the inference gateway.
//!
//! [`GatewayError`] gives every subsystem (router, circuit breaker, rate
//! limiter, plugin pipeline, streaming transport) a single error type to
//! converge on, removing the need for hand-written `From` chains between
//! layers. Each variant carries what the outer boundary needs to build a
//! structured, client-visible error, and the type itself answers whether
//! the orchestrator should retry or fail over rather than leaving that
//! decision to be re-derived at every call site.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// A stable, user-visible error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Validation,
    Authorization,
    RateLimited,
    QuotaExhausted,
    CircuitOpen,
    TransientProvider,
    PermanentProvider,
    PluginFailure,
    Timeout,
    Cancelled,
    Internal,
}

impl ErrorCode {
    /// Stable lowercase key, as serialized on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Validation => "validation",
            ErrorCode::Authorization => "authorization",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::QuotaExhausted => "quota_exhausted",
            ErrorCode::CircuitOpen => "circuit_open",
            ErrorCode::TransientProvider => "transient_provider",
            ErrorCode::PermanentProvider => "permanent_provider",
            ErrorCode::PluginFailure => "plugin_failure",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The gateway's unified error type.
///
/// Every subsystem error converts into this via `From`. The orchestrator
/// consults [`GatewayError::triggers_failover`] rather than matching on
/// variants directly, so retry/failover policy stays in one place.
#[derive(Debug, Error, Clone)]
pub enum GatewayError {
    /// Malformed or disallowed request. Not retriable.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Missing/invalid tenant, or tenant over quota. Not retriable.
    #[error("authorization failed: {message}")]
    Authorization { message: String },

    /// Transient, caller-visible rate limiting.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// A specific provider is out of quota. Retriable via failover.
    #[error("provider {provider_id} quota exhausted")]
    QuotaExhausted {
        provider_id: String,
        retry_after: Option<Duration>,
    },

    /// A provider's circuit breaker is open. Retriable via failover.
    #[error("circuit open for provider {provider_id}")]
    CircuitOpen { provider_id: String },

    /// 5xx, timeout, or network error from a provider. Retriable.
    #[error("transient provider error from {provider_id}: {message}")]
    TransientProvider { provider_id: String, message: String },

    /// 4xx-shaped error from the upstream provider. Not retriable.
    #[error("permanent provider error from {provider_id}: {message}")]
    PermanentProvider { provider_id: String, message: String },

    /// No provider candidate exists for the requested model, ever.
    #[error("no provider registered supports model {model_id}")]
    NoCompatibleProvider { model_id: String },

    /// Candidates existed but every failover attempt was consumed.
    #[error("all provider candidates exhausted for model {model_id}")]
    AllProvidersExhausted { model_id: String },

    /// A plugin raised an error; phase-dependent policy decides whether
    /// this is terminal.
    #[error("plugin {plugin_id} failed in phase {phase}: {message}")]
    PluginFailure {
        plugin_id: String,
        phase: String,
        message: String,
    },

    /// The request deadline was exceeded. Not retriable.
    #[error("request timed out")]
    Timeout,

    /// The request was cancelled by the client or the system. Terminal.
    #[error("request cancelled: {reason}")]
    Cancelled { reason: String },

    /// An illegal execution-state transition was attempted.
    #[error("illegal state transition: {0}")]
    IllegalStateTransition(String),

    /// Anything unexpected. Not retriable, should be alerted on.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    /// The stable taxonomy key for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::Validation { .. } => ErrorCode::Validation,
            GatewayError::Authorization { .. } => ErrorCode::Authorization,
            GatewayError::RateLimited { .. } => ErrorCode::RateLimited,
            GatewayError::QuotaExhausted { .. } => ErrorCode::QuotaExhausted,
            GatewayError::CircuitOpen { .. } => ErrorCode::CircuitOpen,
            GatewayError::TransientProvider { .. } => ErrorCode::TransientProvider,
            GatewayError::PermanentProvider { .. } => ErrorCode::PermanentProvider,
            GatewayError::NoCompatibleProvider { .. } => ErrorCode::Validation,
            GatewayError::AllProvidersExhausted { .. } => ErrorCode::TransientProvider,
            GatewayError::PluginFailure { .. } => ErrorCode::PluginFailure,
            GatewayError::Timeout => ErrorCode::Timeout,
            GatewayError::Cancelled { .. } => ErrorCode::Cancelled,
            GatewayError::IllegalStateTransition(_) => ErrorCode::Internal,
            GatewayError::Internal { .. } => ErrorCode::Internal,
        }
    }

    /// True for errors the orchestrator should retry by routing to another
    /// provider candidate, rather than surfacing immediately.
    pub fn triggers_failover(&self) -> bool {
        matches!(
            self,
            GatewayError::QuotaExhausted { .. }
                | GatewayError::CircuitOpen { .. }
                | GatewayError::TransientProvider { .. }
        )
    }

    /// The `retryAfter` hint, if any, for the structured error response.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GatewayError::RateLimited { retry_after } => *retry_after,
            GatewayError::QuotaExhausted { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Builds the user-visible structured error. No internal detail beyond
    /// the `Display` message crosses this boundary.
    pub fn to_structured(&self, request_id: Option<String>) -> StructuredError {
        StructuredError {
            code: self.code(),
            message: self.to_string(),
            retry_after: self.retry_after(),
            request_id,
        }
    }
}

/// The structured error object returned to the edge transport.
#[derive(Debug, Clone)]
pub struct StructuredError {
    pub code: ErrorCode,
    pub message: String,
    pub retry_after: Option<Duration>,
    pub request_id: Option<String>,
}
