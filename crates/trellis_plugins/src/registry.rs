//! A data-driven plugin assembled from prebuilt steps.
//!
//! Most plugins don't need custom `operation_steps` logic — they contribute
//! a fixed set of steps to a fixed set of operations. [`RegistryPlugin`]
//! covers that case: steps are registered fluently at build time, and the
//! plugin can enumerate its operations (so plugin-scoped cache drops work).
//!
//! # Example
//!
//! ```
//! use trellis_ops::handle::CallAllOperation;
//! use trellis_plugins::registry::RegistryPlugin;
//! use trellis_kernel::plugin::Plugin;
//!
//! static WARMUP: CallAllOperation<()> = CallAllOperation::new("warmup");
//!
//! let plugin = RegistryPlugin::builder("cache", "0.2.0")
//!     .step("warmup", WARMUP.implementation("cache.fill", |&()| Ok(())))
//!     .build();
//!
//! assert_eq!(plugin.name(), "cache");
//! ```

use std::sync::Arc;

use trellis_kernel::error::UnlistableOperationSet;
use trellis_kernel::plugin::{Plugin, PluginInfo};
use trellis_kernel::step::{OperationStep, StepBuilder};

/// A plugin whose steps are registered up front.
pub struct RegistryPlugin {
    info: PluginInfo,
    steps: Vec<(String, OperationStep)>,
    operations: Vec<String>,
}

impl RegistryPlugin {
    /// Starts building a registry plugin with the given name and version.
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> RegistryPluginBuilder {
        RegistryPluginBuilder {
            info: PluginInfo::new(name, version),
            steps: Vec::new(),
        }
    }
}

impl Plugin for RegistryPlugin {
    fn name(&self) -> &str {
        self.info.name()
    }

    fn version(&self) -> &str {
        self.info.version()
    }

    fn operation_steps(&self, operation: &str) -> Vec<OperationStep> {
        self.steps
            .iter()
            .filter(|(op, _)| op == operation)
            .map(|(_, step)| step.clone())
            .collect()
    }

    fn implemented_operations(&self) -> Result<Vec<String>, UnlistableOperationSet> {
        Ok(self.operations.clone())
    }
}

/// Builder for [`RegistryPlugin`].
#[must_use]
pub struct RegistryPluginBuilder {
    info: PluginInfo,
    steps: Vec<(String, StepBuilder)>,
}

impl RegistryPluginBuilder {
    /// Registers a step for the named operation.
    ///
    /// The step builder usually comes from an operation handle's
    /// `implementation` binding, with dependencies already attached.
    pub fn step(mut self, operation: impl Into<String>, step: StepBuilder) -> Self {
        self.steps.push((operation.into(), step));
        self
    }

    /// Finishes the plugin, stamping its provenance on every step.
    pub fn build(self) -> Arc<RegistryPlugin> {
        let info = self.info;
        let mut operations = Vec::new();
        let steps: Vec<(String, OperationStep)> = self
            .steps
            .into_iter()
            .map(|(operation, builder)| {
                if !operations.contains(&operation) {
                    operations.push(operation.clone());
                }
                let step = builder.provided_by_info(info.clone());
                (operation, step)
            })
            .collect();
        Arc::new(RegistryPlugin {
            info,
            steps,
            operations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_keyed_by_operation() {
        let plugin = RegistryPlugin::builder("p", "1.0.0")
            .step("a", OperationStep::builder("a.one", Arc::new(())))
            .step("a", OperationStep::builder("a.two", Arc::new(())))
            .step("b", OperationStep::builder("b.one", Arc::new(())))
            .build();

        assert_eq!(plugin.operation_steps("a").len(), 2);
        assert_eq!(plugin.operation_steps("b").len(), 1);
        assert!(plugin.operation_steps("c").is_empty());
    }

    #[test]
    fn provenance_is_stamped_on_every_step() {
        let plugin = RegistryPlugin::builder("p", "2.1.0")
            .step("a", OperationStep::builder("a.one", Arc::new(())))
            .build();

        let step = &plugin.operation_steps("a")[0];
        assert_eq!(step.plugin().to_string(), "p@2.1.0");
    }

    #[test]
    fn operations_are_enumerable_without_duplicates() {
        let plugin = RegistryPlugin::builder("p", "1.0.0")
            .step("a", OperationStep::builder("a.one", Arc::new(())))
            .step("b", OperationStep::builder("b.one", Arc::new(())))
            .step("a", OperationStep::builder("a.two", Arc::new(())))
            .build();

        assert_eq!(
            plugin.implemented_operations().unwrap(),
            ["a".to_owned(), "b".to_owned()]
        );
    }
}
