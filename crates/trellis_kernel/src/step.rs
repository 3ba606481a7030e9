//! Operation steps and their builder.
//!
//! A [`OperationStep`] is one plugin's contribution to one operation: an
//! opaque payload plus ordering metadata. The kernel never interprets the
//! payload — a payload is typically a callable, but an operation consumer is
//! free to contribute and interpret plain data. Typed payload shapes live in
//! the discipline layer.
//!
//! Steps are immutable once built. They are assembled through the fluent
//! [`StepBuilder`]:
//!
//! ```
//! use std::sync::Arc;
//! use trellis_kernel::plugin::PluginInfo;
//! use trellis_kernel::step::OperationStep;
//!
//! let step = OperationStep::builder("cache.open", Arc::new(()))
//!     .after(["config.load"])
//!     .before(["server.start"])
//!     .provided_by_info(PluginInfo::new("cache", "0.3.1"));
//!
//! assert_eq!(step.name(), "cache.open");
//! assert_eq!(step.to_string(), "cache@0.3.1/cache.open");
//! ```

use core::any::Any;
use std::sync::Arc;

use crate::plugin::{Plugin, PluginInfo};

// ─────────────────────────────────────────────────────────────────────────────
// Payload
// ─────────────────────────────────────────────────────────────────────────────

/// Type-erased step payload.
///
/// The kernel treats payloads as opaque. Disciplines downcast to the callable
/// shape they expect; mismatches surface as contractual errors at invocation.
pub type StepPayload = Arc<dyn Any + Send + Sync>;

/// Type-erased step annotation (metadata about the payload, opaque to the
/// kernel).
pub type StepAnnotation = Arc<dyn Any + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// OperationStep
// ─────────────────────────────────────────────────────────────────────────────

/// One plugin's contribution to one operation.
///
/// The `name` must be unique within one operation's resolved set; a later
/// contribution under an already-seen name is dropped with a warning.
/// `dependencies` name steps that must precede this one,
/// `reverse_dependencies` name steps that must follow it. Names that no
/// contributed step carries are ordering hints with no counterpart and are
/// silently ignored.
#[derive(Clone)]
pub struct OperationStep {
    payload: StepPayload,
    name: String,
    plugin: PluginInfo,
    dependencies: Vec<String>,
    reverse_dependencies: Vec<String>,
    annotation: Option<StepAnnotation>,
}

impl OperationStep {
    /// Starts building a step with the given name and payload.
    #[must_use]
    pub fn builder(name: impl Into<String>, payload: StepPayload) -> StepBuilder {
        StepBuilder {
            name: name.into(),
            payload,
            dependencies: Vec::new(),
            reverse_dependencies: Vec::new(),
            annotation: None,
        }
    }

    /// The opaque payload.
    #[must_use]
    pub fn payload(&self) -> &StepPayload {
        &self.payload
    }

    /// The step name, unique within one operation's resolved set.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provenance of the step (contributing plugin name and version).
    #[must_use]
    pub fn plugin(&self) -> &PluginInfo {
        &self.plugin
    }

    /// Names of steps that must precede this one.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Names of steps that must follow this one.
    #[must_use]
    pub fn reverse_dependencies(&self) -> &[String] {
        &self.reverse_dependencies
    }

    /// Optional payload metadata, opaque to the kernel.
    #[must_use]
    pub fn annotation(&self) -> Option<&StepAnnotation> {
        self.annotation.as_ref()
    }
}

impl core::fmt::Display for OperationStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.plugin, self.name)
    }
}

impl core::fmt::Debug for OperationStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OperationStep")
            .field("name", &self.name)
            .field("plugin", &self.plugin)
            .field("dependencies", &self.dependencies)
            .field("reverse_dependencies", &self.reverse_dependencies)
            .finish_non_exhaustive()
    }
}

/// Steps compare equal when they share the same payload (by pointer), name,
/// provenance and ordering metadata.
impl PartialEq for OperationStep {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
            && self.name == other.name
            && self.plugin == other.plugin
            && self.dependencies == other.dependencies
            && self.reverse_dependencies == other.reverse_dependencies
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StepBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Fluent builder for [`OperationStep`].
///
/// Finish with [`provided_by`](Self::provided_by) (from inside a plugin) or
/// [`provided_by_info`](Self::provided_by_info).
#[must_use]
pub struct StepBuilder {
    name: String,
    payload: StepPayload,
    dependencies: Vec<String>,
    reverse_dependencies: Vec<String>,
    annotation: Option<StepAnnotation>,
}

impl StepBuilder {
    /// Declares steps that must run before this one (forward dependencies).
    pub fn after<I>(mut self, names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.dependencies.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declares steps that must run after this one (reverse dependencies).
    pub fn before<I>(mut self, names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.reverse_dependencies
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Attaches payload metadata, opaque to the kernel.
    pub fn annotate(mut self, annotation: StepAnnotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Finishes the step, stamping provenance from the contributing plugin.
    pub fn provided_by(self, plugin: &dyn Plugin) -> OperationStep {
        self.provided_by_info(PluginInfo::of(plugin))
    }

    /// Finishes the step with explicit provenance.
    pub fn provided_by_info(self, plugin: PluginInfo) -> OperationStep {
        OperationStep {
            payload: self.payload,
            name: self.name,
            plugin,
            dependencies: self.dependencies,
            reverse_dependencies: self.reverse_dependencies,
            annotation: self.annotation,
        }
    }
}
