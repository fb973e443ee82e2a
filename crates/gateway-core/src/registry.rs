//! Generic copy-on-write registry keyed by an arbitrary hashable id.
//!
//! `gateway-circuitbreaker` and `gateway-ratelimiter` each need one
//! instance per key (provider, or provider+tenant) without a global
//! singleton. Both build on this rather than re-implementing the same
//! `ArcSwap<im::HashMap<...>>` dance.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use arc_swap::ArcSwap;

/// A lock-free, copy-on-write map from `K` to `Arc<V>`. Reads never block
/// writers and vice versa; writers pay the cost of cloning the map's
/// spine on every insert, which is the right tradeoff for registries that
/// are written to rarely (once per new provider/tenant) and read on every
/// request.
pub struct Registry<K, V> {
    inner: ArcSwap<HashMap<K, Arc<V>>>,
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.inner.load().get(key).cloned()
    }

    /// Returns the existing entry for `key`, or inserts one built by
    /// `make` and returns that. Races between concurrent first-accesses
    /// are resolved by retrying the compare-and-swap; `make` may run more
    /// than once under contention, so it must be cheap and side-effect
    /// free.
    pub fn get_or_insert_with(&self, key: K, make: impl Fn() -> V) -> Arc<V> {
        loop {
            let current = self.inner.load();
            if let Some(existing) = current.get(&key) {
                return Arc::clone(existing);
            }

            let mut next = HashMap::clone(&current);
            let value = Arc::new(make());
            next.insert(key.clone(), Arc::clone(&value));

            let next = Arc::new(next);
            let prev = self.inner.compare_and_swap(&current, next);
            if Arc::ptr_eq(&prev, &current) {
                return value;
            }
            // Lost the race to another writer; retry against the new snapshot.
        }
    }

    pub fn remove(&self, key: &K) {
        loop {
            let current = self.inner.load();
            if !current.contains_key(key) {
                return;
            }
            let mut next = HashMap::clone(&current);
            next.remove(key);
            let next = Arc::new(next);
            let prev = self.inner.compare_and_swap(&current, next);
            if Arc::ptr_eq(&prev, &current) {
                return;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a cheap, point-in-time snapshot of the whole map. Callers
    /// that need to enumerate every entry (e.g. routing candidate
    /// resolution across all registered providers) should use this rather
    /// than repeated `get` calls, which would not observe a single
    /// consistent snapshot under concurrent writes.
    pub fn snapshot(&self) -> Arc<HashMap<K, Arc<V>>> {
        self.inner.load_full()
    }
}

impl<K, V> Default for Registry<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
