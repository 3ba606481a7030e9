//! Invocation disciplines and typed operation handles for Trellis (Layer 2).
//!
//! The kernel answers "what are the steps of operation X, in what order?".
//! This crate answers "and how do we run them?" — through one of five
//! *disciplines*:
//!
//! - [`invoke::call_all`] - sequential fan-out; returns ignored, first error
//!   aborts
//! - [`invoke::call_until_first_result`] - first provider producing a value
//!   wins
//! - [`wrapper::call_all_as_wrappers`] - recursive wrapper chain (sync)
//! - [`wrapper::call_all_as_wrappers_async`] - recursive wrapper chain
//!   (async)
//! - [`parallel::call_all_parallel`] - one task per step, joined on the
//!   dependency DAG
//!
//! Most code doesn't call the disciplines directly: it declares a typed
//! [operation handle](handle) at module scope and invokes that. The handle
//! binds the operation name, the discipline, step caching, and result
//! checks, and resolves the manager through the ambient slot.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_kernel::prelude::*;
//! use trellis_ops::handle::CallAllOperation;
//!
//! static WARMUP: CallAllOperation<u32> = CallAllOperation::new("warmup");
//!
//! struct CachePlugin;
//!
//! impl Plugin for CachePlugin {
//!     fn name(&self) -> &str {
//!         "cache"
//!     }
//!     fn version(&self) -> &str {
//!         "0.1.0"
//!     }
//!     fn operation_steps(&self, operation: &str) -> Vec<OperationStep> {
//!         match operation {
//!             "warmup" => vec![
//!                 WARMUP
//!                     .implementation("cache.fill", |&_budget| Ok(()))
//!                     .provided_by(self),
//!             ],
//!             _ => Vec::new(),
//!         }
//!     }
//! }
//!
//! let manager = PluginManager::new([Arc::new(CachePlugin) as Arc<dyn Plugin>]);
//! manager.as_current_sync(|| WARMUP.call(&128)).unwrap();
//! ```
//!
//! # Architecture
//!
//! This crate is Layer 2 of the Trellis architecture:
//!
//! - **Layer 1** (`trellis_kernel`): steps, plugins, resolution, caching,
//!   ambient manager
//! - **Layer 2** (`trellis_ops`): invocation disciplines and typed operation
//!   handles (this crate)
//! - **Layer 3** (`trellis_plugins`): convenience plugins and the
//!   application runtime

/// Result checks for operation handles.
pub mod check;

/// Discipline error types and the `Excluded` sentinel.
pub mod error;

/// Typed operation handles.
pub mod handle;

/// Sequential disciplines.
pub mod invoke;

/// The parallel discipline.
pub mod parallel;

/// Typed payload shapes.
pub mod payload;

/// Wrapper-chain disciplines.
pub mod wrapper;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::check::ResultCheck;
    pub use crate::error::{BoxedError, Excluded, InvokeError};
    pub use crate::handle::{
        AsyncWrapperOperation, CallAllOperation, FirstResultOperation, ParallelOperation,
        WrapperOperation,
    };
    pub use crate::parallel::StepTask;
    pub use crate::wrapper::{AsyncNext, Next};
}

// Re-export key types at crate root for convenience
pub use error::{BoxedError, Excluded, InvokeError};
pub use handle::{
    AsyncWrapperOperation, CallAllOperation, FirstResultOperation, ParallelOperation,
    WrapperOperation,
};
pub use parallel::StepTask;
