//! The operation cache: per-operation keyed memoization with selective drop.
//!
//! A two-level mapping from operation name to `key → value`. Values are
//! type-erased; typical occupants are resolved sequences (under the
//! [`CacheKey::Sequence`] sentinel) and derived data an operation's
//! interpreter wants to reuse across invocations.
//!
//! The compute closure passed to [`OperationCache::get_or_compute`] runs
//! exactly once per `(operation, key)` pair while the entry is live: lookups
//! are double-checked under the write lock, so concurrent callers racing on
//! a miss still produce a single computation. Drops are race-free with
//! concurrent reads; a reader observing a dropped entry recomputes.

use core::any::Any;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

// ─────────────────────────────────────────────────────────────────────────────
// CacheKey
// ─────────────────────────────────────────────────────────────────────────────

/// Key within one operation's cache scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Well-known sentinel under which resolved step sequences are memoized.
    Sequence,
    /// Integer key.
    Int(i64),
    /// Text key.
    Text(String),
}

impl From<i64> for CacheKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Type-erased cached value.
pub type CacheValue = Arc<dyn Any + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// OperationCache
// ─────────────────────────────────────────────────────────────────────────────

/// Two-level cache: operation name → (key → value).
///
/// The compute closure runs while the write lock is held (that is what
/// guarantees exactly-once); it must not call back into the same cache.
#[derive(Default)]
pub struct OperationCache {
    entries: RwLock<HashMap<String, HashMap<CacheKey, CacheValue>>>,
}

impl OperationCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value under `(operation, key)`, computing and storing it
    /// on a miss.
    ///
    /// `compute` is called exactly once per `(operation, key)` pair while
    /// the entry is live.
    pub fn get_or_compute<F>(&self, operation: &str, key: CacheKey, compute: F) -> CacheValue
    where
        F: FnOnce() -> CacheValue,
    {
        if let Some(hit) = self
            .entries
            .read()
            .get(operation)
            .and_then(|scope| scope.get(&key))
        {
            return hit.clone();
        }

        let mut entries = self.entries.write();
        let scope = entries.entry(operation.to_owned()).or_default();
        if let Some(hit) = scope.get(&key) {
            return hit.clone();
        }
        let value = compute();
        scope.insert(key, value.clone());
        value
    }

    /// Fallible variant of [`get_or_compute`](Self::get_or_compute).
    ///
    /// An `Err` from `compute` is returned to the caller and never cached,
    /// so a later call retries the computation.
    pub fn try_get_or_compute<F, E>(
        &self,
        operation: &str,
        key: CacheKey,
        compute: F,
    ) -> Result<CacheValue, E>
    where
        F: FnOnce() -> Result<CacheValue, E>,
    {
        if let Some(hit) = self
            .entries
            .read()
            .get(operation)
            .and_then(|scope| scope.get(&key))
        {
            return Ok(hit.clone());
        }

        let mut entries = self.entries.write();
        let scope = entries.entry(operation.to_owned()).or_default();
        if let Some(hit) = scope.get(&key) {
            return Ok(hit.clone());
        }
        let value = compute()?;
        scope.insert(key, value.clone());
        Ok(value)
    }

    /// Drops every entry.
    pub fn drop_all(&self) {
        self.entries.write().clear();
    }

    /// Drops the named operations' scopes, or just the given keys inside
    /// each of them.
    pub fn drop_operations<'a, I>(&self, operations: I, keys: Option<&[CacheKey]>)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries = self.entries.write();
        for operation in operations {
            match keys {
                Some(keys) => {
                    if let Some(scope) = entries.get_mut(operation) {
                        for key in keys {
                            scope.remove(key);
                        }
                    }
                }
                None => {
                    entries.remove(operation);
                }
            }
        }
    }

    /// Drops one key from every operation's scope.
    ///
    /// Used when the plugin set changes and derived values keyed under a
    /// shared sentinel (such as [`CacheKey::Sequence`]) become stale across
    /// all operations at once.
    pub fn drop_key_everywhere(&self, key: &CacheKey) {
        let mut entries = self.entries.write();
        for scope in entries.values_mut() {
            scope.remove(key);
        }
    }

    /// Number of live entries across all operations. Test and diagnostics
    /// helper.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().values().map(HashMap::len).sum()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl core::fmt::Debug for OperationCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OperationCache")
            .field("entries", &self.len())
            .finish()
    }
}
