//! Error types surfaced by the kernel.
//!
//! The kernel distinguishes three error kinds:
//!
//! - **Structural** — [`DependencyCycle`]: the step set for an operation
//!   cannot be ordered. Fixing it requires a plugin-set change; the error is
//!   not retryable.
//! - **Environmental** — [`NoAmbientManager`]: code asked for the ambient
//!   manager outside any scope. This is a caller bug.
//! - **Capability** — [`UnlistableOperationSet`]: a plugin was asked to
//!   enumerate its operations but cannot (e.g. its steps are produced
//!   dynamically). Callers treat this as "don't touch anything
//!   plugin-specific", never as an excuse for a broader action.
//!
//! Duplicate step names and dangling dependency names are *not* errors: the
//! former is downgraded to a warning diagnostic, the latter is a silent
//! ordering hint. See [`crate::resolver`].

/// The step set for an operation contains a dependency cycle.
///
/// Raised by sequence resolution before any step is yielded. `steps` names
/// every node on the detected cycle, in the display form
/// `plugin@version/step-name` where the node corresponds to a contributed
/// step, or the raw dependency name where it does not.
#[derive(Debug, Clone, thiserror::Error)]
#[error("step set for operation '{operation}' contains a dependency cycle: {}", steps.join(" -> "))]
pub struct DependencyCycle {
    /// The operation whose steps could not be ordered.
    pub operation: String,
    /// Every node on the cycle, in traversal order.
    pub steps: Vec<String>,
}

/// No ambient plugin manager is installed in the current scope.
///
/// Returned by [`PluginManager::current`](crate::manager::PluginManager::current)
/// when called outside of any `as_current` scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no ambient plugin manager is installed in the current scope")]
pub struct NoAmbientManager;

/// A plugin cannot enumerate the operations it implements.
///
/// The default for plugins whose steps are produced dynamically. Cache
/// invalidation scoped to such a plugin is a no-op.
#[derive(Debug, Clone, thiserror::Error)]
#[error("plugin '{plugin}' cannot enumerate the operations it implements")]
pub struct UnlistableOperationSet {
    /// Name of the plugin that failed to enumerate.
    pub plugin: String,
}

impl UnlistableOperationSet {
    /// Creates the error for the named plugin.
    #[must_use]
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
        }
    }
}
