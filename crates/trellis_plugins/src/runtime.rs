//! The application runtime.
//!
//! Drives the lifecycle operations over a plugin manager: `bootstrap`
//! synchronously, then `init` → `run` → `terminate` through the parallel
//! discipline, with the manager installed as ambient throughout. An
//! interrupt (ctrl-c) cuts the current phase short; `terminate` runs on the
//! way out no matter how `init` or `run` ended.
//!
//! # Example
//!
//! ```no_run
//! use trellis_kernel::manager::PluginManager;
//! use trellis_plugins::logging::LoggingPlugin;
//! use trellis_plugins::runtime::Runtime;
//!
//! # async fn demo() -> Result<(), trellis_ops::error::InvokeError> {
//! let manager = PluginManager::new([std::sync::Arc::new(LoggingPlugin::new()) as _]);
//! Runtime::new(manager).run().await
//! # }
//! ```

use std::sync::Arc;

use trellis_kernel::manager::PluginManager;
use trellis_kernel::plugin::Plugin;
use trellis_ops::error::InvokeError;
use trellis_ops::parallel::{StepTask, join_all};

use crate::lifecycle::{BOOTSTRAP, INIT, RUN, TERMINATE};

/// Outcome of awaiting a phase's tasks.
enum Phase {
    /// Every task completed.
    Completed,
    /// An interrupt arrived before the tasks finished.
    Interrupted,
}

/// Drives an application assembled from plugins through its lifecycle.
pub struct Runtime {
    manager: Arc<PluginManager>,
}

impl Runtime {
    /// Creates a runtime over an existing manager.
    #[must_use]
    pub fn new(manager: Arc<PluginManager>) -> Self {
        Self { manager }
    }

    /// Creates a runtime over a fresh manager holding `plugins`.
    #[must_use]
    pub fn with_plugins(plugins: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Self {
        Self::new(PluginManager::new(plugins))
    }

    /// The manager this runtime drives.
    #[must_use]
    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.manager
    }

    /// Runs the application lifecycle to completion.
    ///
    /// `terminate` always runs, even when `init` or `run` failed or were
    /// interrupted; the first error encountered is the one returned.
    ///
    /// # Errors
    ///
    /// Resolution, payload and scheduling errors from any phase.
    pub async fn run(self) -> Result<(), InvokeError> {
        let manager = self.manager.clone();
        manager
            .as_current(async move {
                let outcome = Self::init_and_run().await;
                let shutdown = Self::terminate().await;
                outcome.and(shutdown)
            })
            .await
    }

    async fn init_and_run() -> Result<(), InvokeError> {
        BOOTSTRAP.call(&())?;

        let init_tasks = INIT.spawn(())?;
        tracing::debug!(steps = init_tasks.len(), "running init");
        if matches!(Self::join_or_interrupt(init_tasks).await?, Phase::Interrupted) {
            tracing::info!("interrupt received during initialization");
            return Ok(());
        }
        tracing::info!("initialization complete");

        let run_tasks = RUN.spawn(())?;
        tracing::debug!(steps = run_tasks.len(), "running application steps");
        let aborts: Vec<_> = run_tasks.iter().map(StepTask::abort_handle).collect();
        if matches!(Self::join_or_interrupt(run_tasks).await?, Phase::Interrupted) {
            tracing::info!("interrupt received; cancelling run steps");
            for abort in &aborts {
                abort.abort();
            }
        }
        Ok(())
    }

    async fn terminate() -> Result<(), InvokeError> {
        tracing::debug!("running terminate");
        let tasks = TERMINATE.spawn(())?;
        if matches!(Self::join_or_interrupt(tasks).await?, Phase::Interrupted) {
            tracing::info!("another interrupt received; shutting down immediately");
        }
        Ok(())
    }

    /// Awaits the tasks while listening for ctrl-c.
    async fn join_or_interrupt(tasks: Vec<StepTask>) -> Result<Phase, InvokeError> {
        let joined = join_all(tasks);
        tokio::select! {
            result = joined => result.map(|()| Phase::Completed),
            _ = tokio::signal::ctrl_c() => Ok(Phase::Interrupted),
        }
    }
}
