//! The plugin manager: aggregate of providers, sequence lookup, and the
//! operation cache.
//!
//! A [`PluginManager`] owns an ordered plugin collection and an
//! [`OperationCache`]. It answers one central question — "what is the step
//! sequence for operation X?" — and offers the cache plumbing that
//! invocation layers build on.
//!
//! The plugin collection is read-mostly: it is supplied at construction and
//! only appended to by discovery-style steps during startup. Appending
//! invalidates memoized sequences automatically.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_kernel::manager::PluginManager;
//! use trellis_kernel::plugin::Plugin;
//! use trellis_kernel::step::OperationStep;
//!
//! struct StoragePlugin;
//!
//! impl Plugin for StoragePlugin {
//!     fn name(&self) -> &str {
//!         "storage"
//!     }
//!     fn version(&self) -> &str {
//!         "0.1.0"
//!     }
//!     fn operation_steps(&self, operation: &str) -> Vec<OperationStep> {
//!         match operation {
//!             "init" => vec![
//!                 OperationStep::builder("storage.open", Arc::new(())).provided_by(self),
//!             ],
//!             _ => Vec::new(),
//!         }
//!     }
//! }
//!
//! let manager = PluginManager::new([Arc::new(StoragePlugin) as Arc<dyn Plugin>]);
//! let sequence = manager.get_operation_sequence("init").unwrap();
//! assert_eq!(sequence.len(), 1);
//! ```

use std::sync::Arc;

use parking_lot::RwLock;

use crate::ambient;
use crate::cache::{CacheKey, CacheValue, OperationCache};
use crate::error::{DependencyCycle, NoAmbientManager};
use crate::plugin::Plugin;
use crate::resolver::{ResolvedSequence, SequenceResolver};

// ─────────────────────────────────────────────────────────────────────────────
// PluginManager
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregate of plugins; answers sequence queries and owns the operation
/// cache.
///
/// Managers are shared through `Arc` and typically live for the lifetime of
/// the hosting process.
pub struct PluginManager {
    plugins: RwLock<Vec<Arc<dyn Plugin>>>,
    cache: OperationCache,
}

impl PluginManager {
    /// Creates a manager over the given plugin collection.
    ///
    /// The iteration order of the collection is the registration order: it
    /// decides duplicate-step precedence and the tie-break inside resolved
    /// sequences.
    #[must_use]
    pub fn new(plugins: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Arc<Self> {
        Arc::new(Self {
            plugins: RwLock::new(plugins.into_iter().collect()),
            cache: OperationCache::new(),
        })
    }

    /// Snapshot of the current plugin collection, in registration order.
    #[must_use]
    pub fn plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins.read().clone()
    }

    /// Whether a plugin with the given name is registered.
    #[must_use]
    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.read().iter().any(|p| p.name() == name)
    }

    /// Appends a plugin to the collection.
    ///
    /// Intended for discovery-style steps that load further plugins during
    /// startup. Memoized step sequences are invalidated, since they derive
    /// from the plugin set.
    pub fn add_plugin(&self, plugin: Arc<dyn Plugin>) {
        tracing::debug!(plugin = %plugin.name(), "plugin appended to manager");
        self.plugins.write().push(plugin);
        self.cache.drop_key_everywhere(&CacheKey::Sequence);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sequences
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolves the dependency-ordered step sequence for an operation.
    ///
    /// A pure function of the plugin set: successive calls without
    /// intervening plugin-set changes return identical orderings. Each call
    /// runs the resolver afresh; see
    /// [`cached_operation_sequence`](Self::cached_operation_sequence) for the
    /// memoized variant.
    ///
    /// # Errors
    ///
    /// Returns [`DependencyCycle`] if the operation's steps cannot be
    /// ordered.
    pub fn get_operation_sequence(
        &self,
        operation: &str,
    ) -> Result<ResolvedSequence, DependencyCycle> {
        let plugins = self.plugins();
        let mut resolver = SequenceResolver::new(operation);
        for plugin in &plugins {
            resolver.ingest(plugin.as_ref());
        }
        resolver.finalize()
    }

    /// Resolves the step sequence for an operation, memoizing it in the
    /// operation cache under [`CacheKey::Sequence`].
    ///
    /// Appropriate for operations invoked repeatedly; rare lifecycle
    /// operations should prefer the uncached variant. A resolution failure
    /// is never cached.
    ///
    /// # Errors
    ///
    /// Returns [`DependencyCycle`] if the operation's steps cannot be
    /// ordered.
    ///
    /// # Panics
    ///
    /// Panics if a foreign value was stored under the reserved
    /// [`CacheKey::Sequence`] key.
    pub fn cached_operation_sequence(
        &self,
        operation: &str,
    ) -> Result<Arc<ResolvedSequence>, DependencyCycle> {
        let value = self.cache.try_get_or_compute(operation, CacheKey::Sequence, || {
            self.get_operation_sequence(operation)
                .map(|sequence| Arc::new(sequence) as CacheValue)
        })?;
        Ok(value
            .downcast::<ResolvedSequence>()
            .unwrap_or_else(|_| {
                panic!("reserved cache key 'Sequence' for operation '{operation}' holds a foreign value")
            }))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operation cache
    // ─────────────────────────────────────────────────────────────────────────

    /// Computes and caches a value associated with an operation.
    ///
    /// On the first call with a given `(operation, key)` the `compute`
    /// closure runs and its result is stored; later calls return the stored
    /// value without running `compute` again, until a drop covers the entry.
    ///
    /// # Panics
    ///
    /// Panics if the value cached under `(operation, key)` has a different
    /// type than `T` — i.e. two call sites disagree about what the key
    /// means.
    pub fn operation_cache<T, K, F>(&self, operation: &str, key: K, compute: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        K: Into<CacheKey>,
        F: FnOnce() -> T,
    {
        let value = self
            .cache
            .get_or_compute(operation, key.into(), || Arc::new(compute()) as CacheValue);
        value.downcast::<T>().unwrap_or_else(|_| {
            panic!(
                "cache entry for operation '{operation}' holds a value of a different type than requested"
            )
        })
    }

    /// Drops the entire operation cache.
    pub fn drop_operation_cache(&self) {
        self.cache.drop_all();
    }

    /// Drops cache entries for the named operations — all of each
    /// operation's scope, or just the given keys inside each.
    pub fn drop_operation_cache_scoped<'a>(
        &self,
        operations: impl IntoIterator<Item = &'a str>,
        keys: Option<&[CacheKey]>,
    ) {
        self.cache.drop_operations(operations, keys);
    }

    /// Drops cache entries for the operations a plugin claims to implement.
    ///
    /// Useful when dynamically loading or unloading plugins. If the plugin
    /// cannot enumerate its operations, nothing is dropped — a plugin that
    /// doesn't know its operations must not cause a global flush.
    pub fn drop_operation_cache_for_plugin(&self, plugin: &dyn Plugin) {
        match plugin.implemented_operations() {
            Ok(operations) => {
                self.cache
                    .drop_operations(operations.iter().map(String::as_str), None);
            }
            Err(err) => {
                tracing::debug!(plugin = %err.plugin, "plugin cannot enumerate operations; cache untouched");
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ambient manager
    // ─────────────────────────────────────────────────────────────────────────

    /// Runs `future` with this manager installed as the ambient manager.
    ///
    /// The previous ambient value is restored on every exit path — normal
    /// completion, error, or cancellation. See [`crate::ambient`].
    pub fn as_current<F>(self: Arc<Self>, future: F) -> impl core::future::Future<Output = F::Output>
    where
        F: core::future::Future,
    {
        ambient::scope(self, future)
    }

    /// Runs `f` with this manager installed as the ambient manager for the
    /// duration of the synchronous call.
    pub fn as_current_sync<R>(self: Arc<Self>, f: impl FnOnce() -> R) -> R {
        ambient::sync_scope(self, f)
    }

    /// Returns the ambient manager.
    ///
    /// # Errors
    ///
    /// Fails with [`NoAmbientManager`] when no scope is active.
    pub fn current() -> Result<Arc<Self>, NoAmbientManager> {
        ambient::current()
    }

    /// Returns the ambient manager, or `None` when no scope is active.
    #[must_use]
    pub fn current_maybe() -> Option<Arc<Self>> {
        ambient::current_maybe()
    }
}

impl core::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins", &self.plugins.read().len())
            .field("cache", &self.cache)
            .finish()
    }
}
