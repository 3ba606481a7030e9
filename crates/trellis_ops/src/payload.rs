//! Typed payload shapes, one per discipline.
//!
//! The kernel stores step payloads type-erased. Each discipline expects a
//! particular callable shape and downcasts at invocation time; a mismatch
//! surfaces as [`InvokeError::IncompatiblePayload`].
//!
//! The `*_payload` constructors box a closure into the [`StepPayload`] form
//! the matching discipline will look for. Operation handles call these for
//! you via their `implementation` methods; use them directly only when
//! hand-assembling steps.

use std::sync::Arc;

use futures::future::BoxFuture;
use trellis_kernel::step::{OperationStep, StepPayload};

use crate::error::{BoxedError, InvokeError};
use crate::wrapper::{AsyncNext, Next};

/// Payload shape for the call-all discipline.
pub type UnitFn<A> = dyn Fn(&A) -> Result<(), BoxedError> + Send + Sync;

/// Payload shape for the first-result discipline. `Ok(None)` means "no
/// result, try the next provider".
pub type ValueFn<A, T> = dyn Fn(&A) -> Result<Option<T>, BoxedError> + Send + Sync;

/// Payload shape for the sync wrapper chain.
pub type WrapperFn<A, T> =
    dyn Fn(Next<'_, A, T>, Option<T>, &A) -> Result<Option<T>, BoxedError> + Send + Sync;

/// Payload shape for the async wrapper chain.
pub type AsyncWrapperFn<A, T> = dyn Fn(AsyncNext<A, T>, Option<T>, A) -> BoxFuture<'static, Result<Option<T>, BoxedError>>
    + Send
    + Sync;

/// Payload shape for the parallel discipline: one async task body per step.
pub type TaskFn<A> =
    dyn Fn(A) -> BoxFuture<'static, Result<(), BoxedError>> + Send + Sync;

/// Boxes a call-all payload.
#[must_use]
pub fn unit_payload<A, F>(f: F) -> StepPayload
where
    A: 'static,
    F: Fn(&A) -> Result<(), BoxedError> + Send + Sync + 'static,
{
    let f: Arc<UnitFn<A>> = Arc::new(f);
    Arc::new(f)
}

/// Boxes a first-result payload.
#[must_use]
pub fn value_payload<A, T, F>(f: F) -> StepPayload
where
    A: 'static,
    T: 'static,
    F: Fn(&A) -> Result<Option<T>, BoxedError> + Send + Sync + 'static,
{
    let f: Arc<ValueFn<A, T>> = Arc::new(f);
    Arc::new(f)
}

/// Boxes a sync wrapper payload.
#[must_use]
pub fn wrapper_payload<A, T, F>(f: F) -> StepPayload
where
    A: 'static,
    T: 'static,
    F: Fn(Next<'_, A, T>, Option<T>, &A) -> Result<Option<T>, BoxedError> + Send + Sync + 'static,
{
    let f: Arc<WrapperFn<A, T>> = Arc::new(f);
    Arc::new(f)
}

/// Boxes an async wrapper payload.
#[must_use]
pub fn async_wrapper_payload<A, T, F>(f: F) -> StepPayload
where
    A: 'static,
    T: 'static,
    F: Fn(AsyncNext<A, T>, Option<T>, A) -> BoxFuture<'static, Result<Option<T>, BoxedError>>
        + Send
        + Sync
        + 'static,
{
    let f: Arc<AsyncWrapperFn<A, T>> = Arc::new(f);
    Arc::new(f)
}

/// Boxes a parallel task payload.
#[must_use]
pub fn task_payload<A, F>(f: F) -> StepPayload
where
    A: 'static,
    F: Fn(A) -> BoxFuture<'static, Result<(), BoxedError>> + Send + Sync + 'static,
{
    let f: Arc<TaskFn<A>> = Arc::new(f);
    Arc::new(f)
}

/// Recovers a typed payload from a step, or reports the contractual
/// mismatch.
pub(crate) fn downcast_payload<P: Clone + 'static>(
    operation: &str,
    step: &OperationStep,
) -> Result<P, InvokeError> {
    step.payload()
        .downcast_ref::<P>()
        .cloned()
        .ok_or_else(|| InvokeError::IncompatiblePayload {
            operation: operation.to_owned(),
            step: step.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_kernel::plugin::PluginInfo;

    #[test]
    fn unit_payload_downcasts_back() {
        let step = OperationStep::builder("s", unit_payload::<(), _>(|&()| Ok(())))
            .provided_by_info(PluginInfo::new("p", "1.0.0"));
        let payload = downcast_payload::<Arc<UnitFn<()>>>("op", &step).expect("shape matches");
        payload(&()).expect("payload runs");
    }

    #[test]
    fn shape_mismatch_is_contractual_error() {
        let step = OperationStep::builder("s", unit_payload::<(), _>(|&()| Ok(())))
            .provided_by_info(PluginInfo::new("p", "1.0.0"));
        let err = match downcast_payload::<Arc<ValueFn<(), String>>>("op", &step) {
            Err(err) => err,
            Ok(_) => panic!("shape differs"),
        };
        assert!(matches!(err, InvokeError::IncompatiblePayload { .. }));
    }
}
