//! Plugin orchestration primitives for Trellis (Layer 1).
//!
//! From the kernel's point of view, an application is a set of *operations*.
//! Each operation is carried out by a sequence of *steps*, and every plugin
//! may contribute any number of steps to any operation. Steps carry names
//! (unique within one operation) and dependencies on other step names, which
//! is all the kernel needs to produce a deterministic, dependency-respecting
//! execution order.
//!
//! # Core Concepts
//!
//! - [`step::OperationStep`] - One plugin's contribution to one operation
//! - [`plugin::Plugin`] - A named, versioned provider of steps
//! - [`resolver::SequenceResolver`] - Merges and topologically orders steps
//! - [`cache::OperationCache`] - Per-operation keyed memoization store
//! - [`manager::PluginManager`] - Aggregate of plugins; answers sequence
//!   queries, owns the cache, and installs itself as the ambient manager
//! - [`ambient`] - The task-local "current manager" slot
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_kernel::prelude::*;
//!
//! struct HelloPlugin;
//!
//! impl Plugin for HelloPlugin {
//!     fn name(&self) -> &str {
//!         "hello"
//!     }
//!     fn version(&self) -> &str {
//!         "0.1.0"
//!     }
//!     fn operation_steps(&self, operation: &str) -> Vec<OperationStep> {
//!         match operation {
//!             "greet" => vec![
//!                 OperationStep::builder("hello.greet", Arc::new(())).provided_by(self),
//!             ],
//!             _ => Vec::new(),
//!         }
//!     }
//! }
//!
//! let manager = PluginManager::new([Arc::new(HelloPlugin) as Arc<dyn Plugin>]);
//! let sequence = manager.get_operation_sequence("greet").unwrap();
//! assert_eq!(sequence.steps()[0].name(), "hello.greet");
//! ```
//!
//! # Architecture
//!
//! This crate is Layer 1 of the Trellis architecture:
//!
//! - **Layer 1** (`trellis_kernel`): steps, plugins, resolution, caching,
//!   ambient manager (this crate)
//! - **Layer 2** (`trellis_ops`): invocation disciplines and typed operation
//!   handles
//! - **Layer 3** (`trellis_plugins`): convenience plugins and the
//!   application runtime

/// The task-local ambient manager slot.
pub mod ambient;

/// The operation cache.
pub mod cache;

/// Kernel error types.
pub mod error;

/// The plugin manager.
pub mod manager;

/// The plugin contract.
pub mod plugin;

/// Sequence resolution.
pub mod resolver;

/// Operation steps and their builder.
pub mod step;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::cache::{CacheKey, CacheValue, OperationCache};
    pub use crate::error::{DependencyCycle, NoAmbientManager, UnlistableOperationSet};
    pub use crate::manager::PluginManager;
    pub use crate::plugin::{Plugin, PluginInfo};
    pub use crate::resolver::{ResolvedSequence, SequenceResolver};
    pub use crate::step::{OperationStep, StepAnnotation, StepBuilder, StepPayload};
}

// Re-export key types at crate root for convenience
pub use error::{DependencyCycle, NoAmbientManager, UnlistableOperationSet};
pub use manager::PluginManager;
pub use plugin::Plugin;
pub use resolver::ResolvedSequence;
pub use step::OperationStep;
