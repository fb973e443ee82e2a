//! Tenant identity and per-tenant quota state.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Opaque tenant identifier. Cheap to clone and hash; used as a registry
/// key throughout the rate limiter and router.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TenantId(Arc<str>);

impl TenantId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TenantId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A tenant's remaining quota, tracked as a signed counter so an
/// over-budget tenant reads as negative rather than saturating at zero.
#[derive(Debug, Default)]
pub struct QuotaCounter {
    remaining: AtomicI64,
}

impl QuotaCounter {
    pub fn new(initial: i64) -> Self {
        Self {
            remaining: AtomicI64::new(initial),
        }
    }

    /// Attempts to debit `amount` from the remaining quota. Returns the
    /// balance after the debit regardless of whether it went negative;
    /// callers decide whether negative balances are fatal.
    pub fn debit(&self, amount: i64) -> i64 {
        self.remaining.fetch_sub(amount, Ordering::SeqCst) - amount
    }

    pub fn credit(&self, amount: i64) -> i64 {
        self.remaining.fetch_add(amount, Ordering::SeqCst) + amount
    }

    pub fn remaining(&self) -> i64 {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() <= 0
    }
}

/// Everything the gateway knows about the caller of a single request,
/// threaded immutably through the pipeline and orchestrator rather than
/// looked up again at every phase.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub quota: Arc<QuotaCounter>,
    /// Model ids this tenant is entitled to route to. Empty means
    /// "no restriction" — enforced by `gateway-router`, not here.
    pub allowed_models: Arc<Vec<String>>,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<TenantId>, quota_budget: i64) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            quota: Arc::new(QuotaCounter::new(quota_budget)),
            allowed_models: Arc::new(Vec::new()),
        }
    }

    pub fn with_allowed_models(mut self, models: Vec<String>) -> Self {
        self.allowed_models = Arc::new(models);
        self
    }

    pub fn is_model_allowed(&self, model_id: &str) -> bool {
        self.allowed_models.is_empty() || self.allowed_models.iter().any(|m| m == model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_counter_goes_negative_when_overdrawn() {
        let quota = QuotaCounter::new(1);
        assert_eq!(quota.debit(1), 0);
        assert!(!quota.is_exhausted());
        assert_eq!(quota.debit(1), -1);
        assert!(quota.is_exhausted());
    }

    #[test]
    fn tenant_context_allows_any_model_when_unrestricted() {
        let ctx = TenantContext::new("acme", 1000);
        assert!(ctx.is_model_allowed("gpt-4"));
    }

    #[test]
    fn tenant_context_enforces_allowlist() {
        let ctx = TenantContext::new("acme", 1000).with_allowed_models(vec!["gpt-4".into()]);
        assert!(ctx.is_model_allowed("gpt-4"));
        assert!(!ctx.is_model_allowed("claude-3"));
    }
}
