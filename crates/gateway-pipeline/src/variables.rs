//! A type-erased, write-once-unless-overwritten variable map, the
//! mechanism plugins use to hand values (a routing decision, a rendered
//! prompt, a tool-call list) downstream to later phases without the
//! pipeline itself knowing every plugin's value types.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// A key already holds a value; `set` was called instead of `overwrite`.
#[derive(Debug, Clone)]
pub struct VariableAlreadySet {
    pub key: String,
}

impl fmt::Display for VariableAlreadySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "variable '{}' is already set", self.key)
    }
}

impl std::error::Error for VariableAlreadySet {}

/// Per-request scratch space, keyed by name. Values are `Send + Sync` so
/// the map itself can live inside an `ExecutionContext` that crosses
/// await points.
#[derive(Default)]
pub struct Variables {
    inner: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a variable back, or `None` if unset or set under a different
    /// type than `T`.
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.inner.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Inserts a value, refusing to clobber an existing key. Most plugins
    /// should use this: a second plugin writing `routing_decision` is
    /// almost always a bug, not an intentional override.
    pub fn set<T: Send + Sync + 'static>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), VariableAlreadySet> {
        let key = key.into();
        if self.inner.contains_key(&key) {
            return Err(VariableAlreadySet { key });
        }
        self.inner.insert(key, Box::new(value));
        Ok(())
    }

    /// Inserts a value unconditionally, replacing any prior value under
    /// the same key. The escape hatch for the rare plugin that legitimately
    /// revises an earlier phase's output (e.g. a retry re-running ROUTE).
    pub fn overwrite<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.inner.insert(key.into(), Box::new(value));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }
}

impl fmt::Debug for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variables")
            .field("keys", &self.inner.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Clone for Variables {
    /// Variables are `Any`-erased, so a deep clone isn't possible in
    /// general; a cloned context starts with an empty variable map. Only
    /// used when an orchestrator wants to re-run a phase against a fresh
    /// context derived from the same request.
    fn clone(&self) -> Self {
        Self::new()
    }
}
