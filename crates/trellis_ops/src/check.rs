//! Result checks for operation handles.
//!
//! A check is a predicate over the operation's result plus a message naming
//! the expectation. Checks are evaluated after a returning discipline
//! completes; the first failure surfaces as
//! [`InvokeError::ResultCheckFailed`] naming the operation and the message.

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::InvokeError;

/// One predicate + message attached to an operation handle.
pub struct ResultCheck<T> {
    message: Cow<'static, str>,
    predicate: Arc<dyn Fn(&Option<T>) -> bool + Send + Sync>,
}

impl<T> ResultCheck<T> {
    /// Creates a check from a message and predicate.
    #[must_use]
    pub fn new<F>(message: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: Fn(&Option<T>) -> bool + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// The expectation this check states.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Evaluates the check against a result.
    #[must_use]
    pub fn passes(&self, result: &Option<T>) -> bool {
        (self.predicate)(result)
    }
}

impl<T> Clone for ResultCheck<T> {
    fn clone(&self) -> Self {
        Self {
            message: self.message.clone(),
            predicate: self.predicate.clone(),
        }
    }
}

impl<T> core::fmt::Debug for ResultCheck<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResultCheck")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Runs every check against a result, failing on the first rejection.
pub(crate) fn run_checks<T>(
    operation: &str,
    checks: &[ResultCheck<T>],
    result: &Option<T>,
) -> Result<(), InvokeError> {
    for check in checks {
        if !check.passes(result) {
            return Err(InvokeError::ResultCheckFailed {
                operation: operation.to_owned(),
                check: check.message().to_owned(),
            });
        }
    }
    Ok(())
}
