//! Errors surfaced by invocation disciplines.
//!
//! Payload errors are *propagated, not wrapped*: a step's own error travels
//! through [`InvokeError::Payload`] unchanged, and an [`InvokeError`] that
//! comes back boxed through an outer payload is unboxed rather than nested.
//! The disciplines never swallow a payload error.

use trellis_kernel::error::{DependencyCycle, NoAmbientManager};

/// The error type payloads return.
///
/// Payload authors propagate their own error types through this box; the
/// disciplines pass it along unchanged.
pub type BoxedError = Box<dyn core::error::Error + Send + Sync>;

/// Errors produced while applying a discipline to a resolved sequence.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The operation's steps could not be ordered.
    #[error(transparent)]
    Cycle(#[from] DependencyCycle),

    /// No ambient manager was installed when a handle was invoked.
    #[error(transparent)]
    NoAmbientManager(#[from] NoAmbientManager),

    /// A step's payload does not have the callable shape the discipline
    /// expects.
    #[error("step '{step}' of operation '{operation}' carries a payload incompatible with the discipline")]
    IncompatiblePayload {
        /// The operation being invoked.
        operation: String,
        /// Display form of the offending step.
        step: String,
    },

    /// A result check attached to the operation handle rejected the result.
    #[error("result check '{check}' failed for operation '{operation}'")]
    ResultCheckFailed {
        /// The operation whose result was checked.
        operation: String,
        /// The failing check's message.
        check: String,
    },

    /// A parallel step was not run because one of its dependencies failed or
    /// was cancelled.
    #[error("step '{step}' not run: dependency '{dependency}' failed or was cancelled")]
    DependencyFailed {
        /// Display form of the step that was not run.
        step: String,
        /// Name of the dependency that failed.
        dependency: String,
    },

    /// A spawned task was cancelled before completing.
    #[error("task '{task}' was cancelled")]
    Cancelled {
        /// The cancelled task (step name or operation name).
        task: String,
    },

    /// A spawned task panicked.
    #[error("task '{task}' panicked")]
    Panicked {
        /// The panicked task (step name or operation name).
        task: String,
    },

    /// An error raised by a step payload, propagated unchanged.
    #[error(transparent)]
    Payload(BoxedError),
}

impl InvokeError {
    /// Lifts a payload's boxed error into an [`InvokeError`].
    ///
    /// A boxed `InvokeError` (produced when a wrapper propagates its inner
    /// chain's failure with `?`) is unboxed instead of being nested.
    #[must_use]
    pub fn from_payload(error: BoxedError) -> Self {
        match error.downcast::<InvokeError>() {
            Ok(inner) => *inner,
            Err(other) => Self::Payload(other),
        }
    }

    /// Whether this error is the [`Excluded`] sentinel raised by a payload.
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        matches!(self, Self::Payload(inner) if inner.is::<Excluded>())
    }
}

/// Sentinel error: "this provider refuses to produce a result".
///
/// Raised by a payload of the first-result discipline to signal "not me" —
/// the scan stops and the sentinel propagates to the caller, which decides
/// what exclusion means for the operation at hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("provider excluded itself from producing a result")]
pub struct Excluded;
