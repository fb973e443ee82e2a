//! The fixed phase order every request walks through.

use std::fmt;

/// A named stage of the inference pipeline. Declared in the order
/// [`Phase::ALL`] walks them; nothing reorders phases at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Phase {
    Validate,
    Authorize,
    PreProcessing,
    Route,
    Inference,
    PostProcessing,
    Audit,
}

impl Phase {
    /// Execution order, fixed for the life of the process.
    pub const ALL: [Phase; 7] = [
        Phase::Validate,
        Phase::Authorize,
        Phase::PreProcessing,
        Phase::Route,
        Phase::Inference,
        Phase::PostProcessing,
        Phase::Audit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Validate => "validate",
            Phase::Authorize => "authorize",
            Phase::PreProcessing => "pre_processing",
            Phase::Route => "route",
            Phase::Inference => "inference",
            Phase::PostProcessing => "post_processing",
            Phase::Audit => "audit",
        }
    }

    /// True for VALIDATE/AUTHORIZE: a plugin failure here terminates the
    /// request immediately with `FAILED`.
    pub fn is_fail_fast(&self) -> bool {
        matches!(self, Phase::Validate | Phase::Authorize)
    }

    /// True for POST_PROCESSING: a plugin failure is logged but the
    /// request still succeeds.
    pub fn is_best_effort(&self) -> bool {
        matches!(self, Phase::PostProcessing)
    }

    /// True for AUDIT: failures are always swallowed, never surfaced to
    /// the caller, under any circumstance.
    pub fn is_audit(&self) -> bool {
        matches!(self, Phase::Audit)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
