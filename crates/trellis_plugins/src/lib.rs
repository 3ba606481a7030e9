//! Convenience plugins and the application runtime for Trellis (Layer 3).
//!
//! The kernel and the disciplines are deliberately minimal; this crate adds
//! the pieces most applications start from:
//!
//! - [`registry::RegistryPlugin`] - a data-driven plugin assembled from
//!   prebuilt steps
//! - [`lifecycle`] - the well-known `bootstrap` / `init` / `run` /
//!   `terminate` operation handles
//! - [`runtime::Runtime`] - drives the lifecycle over a manager, with
//!   interrupt handling
//! - [`logging::LoggingPlugin`] - installs the global tracing subscriber
//!   from a `bootstrap` step
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use futures::FutureExt;
//! use trellis_kernel::plugin::Plugin;
//! use trellis_plugins::lifecycle::RUN;
//! use trellis_plugins::logging::LoggingPlugin;
//! use trellis_plugins::registry::RegistryPlugin;
//! use trellis_plugins::runtime::Runtime;
//!
//! # async fn demo() -> Result<(), trellis_ops::error::InvokeError> {
//! let app = RegistryPlugin::builder("app", "0.1.0")
//!     .step(
//!         "run",
//!         RUN.implementation("app.serve", |()| {
//!             async {
//!                 tracing::info!("serving");
//!                 Ok(())
//!             }
//!             .boxed()
//!         }),
//!     )
//!     .build();
//!
//! Runtime::with_plugins([
//!     Arc::new(LoggingPlugin::new()) as Arc<dyn Plugin>,
//!     app as Arc<dyn Plugin>,
//! ])
//! .run()
//! .await
//! # }
//! ```

/// The well-known lifecycle operations.
pub mod lifecycle;

/// The logging plugin.
pub mod logging;

/// The data-driven registry plugin.
pub mod registry;

/// The application runtime.
pub mod runtime;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::lifecycle::{BOOTSTRAP, INIT, RUN, TERMINATE};
    pub use crate::logging::LoggingPlugin;
    pub use crate::registry::{RegistryPlugin, RegistryPluginBuilder};
    pub use crate::runtime::Runtime;
}

// Re-export key types at crate root for convenience
pub use logging::LoggingPlugin;
pub use registry::RegistryPlugin;
pub use runtime::Runtime;
