//! The provider registry: holds one [`ProviderAdapter`] per provider id,
//! runs a background probe loop to keep health current, and answers the
//! router's candidate-resolution queries.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use gateway_core::registry::Registry;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::adapter::ProviderAdapter;
use crate::config::ProviderRegistryConfig;
use crate::descriptor::ProviderDescriptor;
use crate::events::ProviderEvent;
use crate::health::{HealthStatus, ProviderHealth};

struct ProviderEntry {
    adapter: Arc<dyn ProviderAdapter>,
    status: std::sync::RwLock<HealthStatus>,
    last_check: std::sync::RwLock<Option<Instant>>,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
}

impl ProviderEntry {
    fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            adapter,
            status: std::sync::RwLock::new(HealthStatus::Unhealthy),
            last_check: std::sync::RwLock::new(None),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
        }
    }

    fn status(&self) -> HealthStatus {
        *self.status.read().unwrap()
    }
}

/// Holds every registered provider adapter and, once [`Self::start_probing`]
/// is called, keeps their health current via a background loop. Built on
/// the same copy-on-write [`Registry`] the circuit breaker and rate
/// limiter crates use, so lookups never contend with registration.
pub struct ProviderRegistry {
    entries: Registry<String, ProviderEntry>,
    config: ProviderRegistryConfig,
    probe_task: RwLock<Option<JoinHandle<()>>>,
}

impl ProviderRegistry {
    pub fn new(config: ProviderRegistryConfig) -> Self {
        Self {
            entries: Registry::new(),
            config,
            probe_task: RwLock::new(None),
        }
    }

    /// Registers an adapter, replacing any previous adapter under the
    /// same provider id. The new entry starts `Unhealthy` until the next
    /// probe, so a freshly (re)registered provider is never routed to
    /// before it has proven itself.
    pub fn register(&self, adapter: Arc<dyn ProviderAdapter>) {
        let provider_id = adapter.descriptor().provider_id.clone();
        self.entries.remove(&provider_id);
        self.entries
            .get_or_insert_with(provider_id, || ProviderEntry::new(Arc::clone(&adapter)));
    }

    pub fn deregister(&self, provider_id: &str) {
        self.entries.remove(&provider_id.to_string());
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.entries
            .get(&provider_id.to_string())
            .map(|entry| Arc::clone(&entry.adapter))
    }

    pub fn health(&self, provider_id: &str) -> Option<HealthStatus> {
        self.entries
            .get(&provider_id.to_string())
            .map(|entry| entry.status())
    }

    /// All registered descriptors, regardless of health, for callers (the
    /// router) that want to apply their own health filtering alongside
    /// other criteria.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.entries
            .snapshot()
            .values()
            .map(|entry| entry.adapter.descriptor().clone())
            .collect()
    }

    /// Provider ids whose model glob matches `model_id` and whose current
    /// health is usable (Healthy or Degraded).
    pub fn candidates_for(&self, model_id: &str) -> Vec<Arc<dyn ProviderAdapter>> {
        self.entries
            .snapshot()
            .values()
            .filter(|entry| entry.status().is_usable())
            .filter(|entry| entry.adapter.descriptor().supports_model(model_id))
            .map(|entry| Arc::clone(&entry.adapter))
            .collect()
    }

    /// Starts the background probe loop. Calling this more than once
    /// replaces the previous loop rather than running two concurrently.
    pub async fn start_probing(self: &Arc<Self>) {
        let registry = Arc::clone(self);

        let task = tokio::spawn(async move {
            tokio::time::sleep(registry.config.initial_delay).await;

            let mut interval = tokio::time::interval(registry.config.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                registry.probe_all().await;
            }
        });

        let mut task_lock = self.probe_task.write().await;
        *task_lock = Some(task);
    }

    pub async fn stop_probing(&self) {
        let mut task_lock = self.probe_task.write().await;
        if let Some(task) = task_lock.take() {
            task.abort();
        }
    }

    async fn probe_all(&self) {
        let snapshot = self.entries.snapshot();
        let mut handles = Vec::with_capacity(snapshot.len());

        for (provider_id, entry) in snapshot.iter() {
            let provider_id = provider_id.clone();
            let entry = Arc::clone(entry);
            let timeout = self.config.timeout;
            let failure_threshold = self.config.failure_threshold;
            let success_threshold = self.config.success_threshold;
            let listeners = self.config.event_listeners.clone();

            handles.push(tokio::spawn(async move {
                let probe = tokio::time::timeout(timeout, entry.adapter.check_health()).await;
                let observed = match probe {
                    Ok(health) => health,
                    Err(_) => {
                        listeners.emit(&ProviderEvent::ProbeTimedOut {
                            provider_id: provider_id.clone(),
                            timestamp: Instant::now(),
                        });
                        ProviderHealth::new(HealthStatus::Unhealthy, "probe timed out")
                    }
                };

                *entry.last_check.write().unwrap() = Some(observed.timestamp);

                let old_status = entry.status();
                let new_status = match observed.status {
                    HealthStatus::Healthy => {
                        entry.consecutive_successes.fetch_add(1, Ordering::SeqCst);
                        entry.consecutive_failures.store(0, Ordering::SeqCst);
                        if entry.consecutive_successes.load(Ordering::SeqCst) >= success_threshold
                        {
                            HealthStatus::Healthy
                        } else {
                            old_status
                        }
                    }
                    HealthStatus::Degraded => {
                        entry.consecutive_successes.fetch_add(1, Ordering::SeqCst);
                        entry.consecutive_failures.store(0, Ordering::SeqCst);
                        HealthStatus::Degraded
                    }
                    HealthStatus::Unhealthy => {
                        entry.consecutive_failures.fetch_add(1, Ordering::SeqCst);
                        entry.consecutive_successes.store(0, Ordering::SeqCst);
                        if entry.consecutive_failures.load(Ordering::SeqCst) >= failure_threshold {
                            HealthStatus::Unhealthy
                        } else {
                            old_status
                        }
                    }
                };

                if new_status != old_status {
                    *entry.status.write().unwrap() = new_status;
                    listeners.emit(&ProviderEvent::HealthChanged {
                        provider_id,
                        timestamp: Instant::now(),
                        from: old_status,
                        to: new_status,
                    });
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Drop for ProviderRegistry {
    fn drop(&mut self) {
        if let Some(task) = self
            .probe_task
            .try_write()
            .ok()
            .and_then(|mut guard| guard.take())
        {
            task.abort();
        }
    }
}
