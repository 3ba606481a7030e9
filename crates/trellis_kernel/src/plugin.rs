//! The plugin contract.
//!
//! Plugins are the fundamental unit of composition. A plugin is a named,
//! versioned provider of [`OperationStep`]s: for any operation name it may
//! contribute zero or more steps. Operations are identified by string name
//! only and exist implicitly the first time any plugin returns a step for
//! them — there is no registration.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_kernel::plugin::Plugin;
//! use trellis_kernel::step::OperationStep;
//!
//! struct GreeterPlugin;
//!
//! impl Plugin for GreeterPlugin {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     fn version(&self) -> &str {
//!         "0.1.0"
//!     }
//!
//!     fn operation_steps(&self, operation: &str) -> Vec<OperationStep> {
//!         match operation {
//!             "greet" => vec![
//!                 OperationStep::builder("greeter.hello", Arc::new(()))
//!                     .provided_by(self),
//!             ],
//!             _ => Vec::new(),
//!         }
//!     }
//! }
//! ```

use downcast_rs::{Downcast, impl_downcast};

use crate::error::UnlistableOperationSet;
use crate::step::OperationStep;

// ─────────────────────────────────────────────────────────────────────────────
// PluginInfo
// ─────────────────────────────────────────────────────────────────────────────

/// Provenance of a step: the contributing plugin's name and version.
///
/// Used for diagnostics (duplicate-step warnings, cycle errors) and for
/// plugin-scoped cache invalidation. Displays as `name@version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginInfo {
    name: String,
    version: String,
}

impl PluginInfo {
    /// Creates provenance from explicit name and version.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Captures the provenance of a plugin instance.
    #[must_use]
    pub fn of(plugin: &dyn Plugin) -> Self {
        Self::new(plugin.name(), plugin.version())
    }

    /// The plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The plugin version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl core::fmt::Display for PluginInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A named, versioned provider of operation steps.
///
/// How a plugin produces its steps is its own business — a hand-rolled
/// `match` over operation names, a data-driven registry (see the convenience
/// layer's `RegistryPlugin`), or anything else that yields steps with the
/// correct names.
///
/// Plugin names must be unique across the loaded plugin set.
pub trait Plugin: Downcast + Send + Sync {
    /// Unique plugin name.
    fn name(&self) -> &str;

    /// Plugin version string.
    fn version(&self) -> &str;

    /// Returns the steps this plugin contributes to the named operation.
    ///
    /// Returning an empty vector means "nothing to contribute" and is the
    /// common case for operations a plugin does not care about.
    fn operation_steps(&self, operation: &str) -> Vec<OperationStep>;

    /// Enumerates the operations this plugin implements.
    ///
    /// Used for plugin-scoped cache invalidation. The default fails with
    /// [`UnlistableOperationSet`], which callers treat as "don't touch
    /// anything plugin-specific" — appropriate for plugins whose steps are
    /// produced dynamically.
    fn implemented_operations(&self) -> Result<Vec<String>, UnlistableOperationSet> {
        Err(UnlistableOperationSet::new(self.name()))
    }
}

impl_downcast!(Plugin);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct ListingPlugin;

    impl Plugin for ListingPlugin {
        fn name(&self) -> &str {
            "listing"
        }

        fn version(&self) -> &str {
            "2.0.0"
        }

        fn operation_steps(&self, operation: &str) -> Vec<OperationStep> {
            if operation == "init" {
                vec![
                    OperationStep::builder("listing.init", Arc::new(())).provided_by(self),
                ]
            } else {
                Vec::new()
            }
        }

        fn implemented_operations(&self) -> Result<Vec<String>, UnlistableOperationSet> {
            Ok(vec!["init".into()])
        }
    }

    struct OpaquePlugin;

    impl Plugin for OpaquePlugin {
        fn name(&self) -> &str {
            "opaque"
        }

        fn version(&self) -> &str {
            "0.0.1"
        }

        fn operation_steps(&self, _operation: &str) -> Vec<OperationStep> {
            Vec::new()
        }
    }

    #[test]
    fn info_display() {
        assert_eq!(PluginInfo::of(&ListingPlugin).to_string(), "listing@2.0.0");
    }

    #[test]
    fn default_enumeration_is_unlistable() {
        let err = OpaquePlugin.implemented_operations().unwrap_err();
        assert_eq!(err.plugin, "opaque");
    }

    #[test]
    fn plugins_downcast_to_concrete_types() {
        let plugin: Arc<dyn Plugin> = Arc::new(ListingPlugin);
        assert!(plugin.downcast_ref::<ListingPlugin>().is_some());
        assert!(plugin.downcast_ref::<OpaquePlugin>().is_none());
    }
}
