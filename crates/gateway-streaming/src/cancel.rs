//! A single-use external cancellation signal, shared between the
//! orchestrator (which holds the send side) and the transport's consumer
//! loop (which races it against the next chunk).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

struct Inner {
    notify: Notify,
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
}

/// Cheaply cloneable; all clones observe the same cancellation.
#[derive(Clone)]
pub struct CancelHandle(Arc<Inner>);

impl CancelHandle {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            notify: Notify::new(),
            cancelled: AtomicBool::new(false),
            reason: Mutex::new(None),
        }))
    }

    /// Signals cancellation. Idempotent: only the first call's reason is
    /// kept.
    pub fn cancel(&self, reason: impl Into<String>) {
        if !self.0.cancelled.swap(true, Ordering::SeqCst) {
            if let Ok(mut guard) = self.0.reason.try_lock() {
                *guard = Some(reason.into());
            }
            self.0.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    pub async fn reason(&self) -> String {
        self.0
            .reason
            .lock()
            .await
            .clone()
            .unwrap_or_else(|| "cancelled".to_string())
    }

    /// Resolves once `cancel` has been called. Safe to race in a
    /// `tokio::select!` — uses the enable/check/await pattern so a
    /// `cancel()` that lands between the check and the await is never
    /// missed.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.0.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}
