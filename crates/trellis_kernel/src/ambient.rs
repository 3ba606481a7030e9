//! The ambient manager slot.
//!
//! Typed operation handles are usually declared at module scope, far from
//! the code that constructed the manager. The ambient slot lets them resolve
//! "the current manager" without threading it through unrelated call frames.
//!
//! The slot is task-local: two concurrently executing tasks observe
//! independent values, and a scope entered inside a task never leaks to its
//! siblings. Entering a scope shadows the previous value; leaving it — on
//! any exit path, including errors and cancellation — restores the previous
//! value, because restoration is tied to the scope future being dropped.
//!
//! Spawned tasks do not inherit the slot implicitly; use
//! [`spawn_inheriting`] to reproduce copy-on-spawn semantics, or
//! [`scope`]/[`sync_scope`] to install a captured manager explicitly.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_kernel::manager::PluginManager;
//!
//! # async fn demo() {
//! let manager = PluginManager::new([]);
//! manager
//!     .clone()
//!     .as_current(async {
//!         let current = PluginManager::current().expect("scope is active");
//!         assert!(Arc::ptr_eq(&current, &manager));
//!     })
//!     .await;
//! assert!(PluginManager::current_maybe().is_none());
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::error::NoAmbientManager;
use crate::manager::PluginManager;

tokio::task_local! {
    /// The manager installed for the current task scope.
    static CURRENT_MANAGER: Arc<PluginManager>;
}

/// Returns the ambient manager, or `None` when no scope is active.
#[must_use]
pub fn current_maybe() -> Option<Arc<PluginManager>> {
    CURRENT_MANAGER.try_with(Arc::clone).ok()
}

/// Returns the ambient manager.
///
/// # Errors
///
/// Fails with [`NoAmbientManager`] when no scope is active.
pub fn current() -> Result<Arc<PluginManager>, NoAmbientManager> {
    current_maybe().ok_or(NoAmbientManager)
}

/// Runs `future` with `manager` installed as the ambient manager.
///
/// The previous ambient value (if any) is restored when the returned future
/// completes or is dropped.
pub fn scope<F>(manager: Arc<PluginManager>, future: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    CURRENT_MANAGER.scope(manager, future)
}

/// Runs `f` with `manager` installed as the ambient manager for the duration
/// of the (synchronous) call.
pub fn sync_scope<R>(manager: Arc<PluginManager>, f: impl FnOnce() -> R) -> R {
    CURRENT_MANAGER.sync_scope(manager, f)
}

/// Spawns a task that inherits the spawner's ambient manager.
///
/// If no scope is active, this is a plain [`tokio::spawn`]. Changes made by
/// the child (entering its own scopes) never leak back to the spawner.
pub fn spawn_inheriting<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match current_maybe() {
        Some(manager) => tokio::spawn(scope(manager, future)),
        None => tokio::spawn(future),
    }
}
