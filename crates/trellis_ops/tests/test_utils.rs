//! Shared test utilities for `trellis_ops` integration tests.
//!
//! This module provides a scripted plugin type used across multiple test
//! files. Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities — not all items used in every test binary"
)]

use std::sync::Arc;

use trellis_kernel::error::UnlistableOperationSet;
use trellis_kernel::plugin::{Plugin, PluginInfo};
use trellis_kernel::step::{OperationStep, StepBuilder};

/// A plugin assembled from prebuilt steps, keyed by operation name.
pub struct ScriptedPlugin {
    name: String,
    steps: Vec<(String, OperationStep)>,
    listable: bool,
}

impl ScriptedPlugin {
    /// Starts building a scripted plugin.
    pub fn builder(name: impl Into<String>) -> ScriptedPluginBuilder {
        ScriptedPluginBuilder {
            name: name.into(),
            steps: Vec::new(),
            listable: false,
        }
    }
}

impl Plugin for ScriptedPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn operation_steps(&self, operation: &str) -> Vec<OperationStep> {
        self.steps
            .iter()
            .filter(|(op, _)| op == operation)
            .map(|(_, step)| step.clone())
            .collect()
    }

    fn implemented_operations(&self) -> Result<Vec<String>, UnlistableOperationSet> {
        if self.listable {
            let mut operations: Vec<String> =
                self.steps.iter().map(|(op, _)| op.clone()).collect();
            operations.dedup();
            Ok(operations)
        } else {
            Err(UnlistableOperationSet::new(self.name.clone()))
        }
    }
}

/// Builder for [`ScriptedPlugin`].
pub struct ScriptedPluginBuilder {
    name: String,
    steps: Vec<(String, OperationStep)>,
    listable: bool,
}

impl ScriptedPluginBuilder {
    /// Adds a step for the named operation.
    #[must_use]
    pub fn step(mut self, operation: impl Into<String>, builder: StepBuilder) -> Self {
        let step = builder.provided_by_info(PluginInfo::new(self.name.clone(), "1.0.0"));
        self.steps.push((operation.into(), step));
        self
    }

    /// Makes the plugin enumerate its operations instead of failing with
    /// `UnlistableOperationSet`.
    #[must_use]
    pub fn listable(mut self) -> Self {
        self.listable = true;
        self
    }

    /// Finishes the plugin.
    pub fn build(self) -> Arc<dyn Plugin> {
        Arc::new(ScriptedPlugin {
            name: self.name,
            steps: self.steps,
            listable: self.listable,
        })
    }
}

/// Renders an optional running value the way the wrapper tests expect.
pub fn show(value: Option<String>) -> String {
    value.unwrap_or_else(|| "None".to_owned())
}
