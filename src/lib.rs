//! A plugin orchestration kernel for Rust applications.
//!

/// Layer 1: steps, plugins, sequence resolution, caching, and the ambient manager.
pub use trellis_kernel;

/// Layer 2: invocation disciplines and typed operation handles.
pub use trellis_ops;

/// Layer 3: convenience plugins and the application runtime.
pub use trellis_plugins;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use trellis_kernel::prelude::*;
    pub use trellis_ops::prelude::*;
    pub use trellis_plugins::prelude::*;
}
