//! Sequential disciplines: call-all and first-result-wins.
//!
//! Both run inline on the invoking task, preserve resolver order, and
//! propagate payload errors losslessly.

use trellis_kernel::step::OperationStep;

use crate::error::InvokeError;
use crate::payload::{UnitFn, ValueFn, downcast_payload};

use std::sync::Arc;

/// Invokes every step's payload with `args`, ignoring return values.
///
/// The first payload error aborts the remaining steps and propagates.
///
/// # Errors
///
/// [`InvokeError::IncompatiblePayload`] for a step whose payload is not a
/// call-all callable; [`InvokeError::Payload`] (or an unboxed inner
/// [`InvokeError`]) for a failing payload.
pub fn call_all<A: 'static>(
    operation: &str,
    steps: &[OperationStep],
    args: &A,
) -> Result<(), InvokeError> {
    for step in steps {
        let payload = downcast_payload::<Arc<UnitFn<A>>>(operation, step)?;
        payload(args).map_err(InvokeError::from_payload)?;
    }
    Ok(())
}

/// Invokes payloads in order until one produces a result.
///
/// `Ok(None)` from a payload means "no result, try the next provider";
/// the overall result is `Ok(None)` when every provider passes. Any payload
/// error — including the [`Excluded`](crate::error::Excluded) sentinel —
/// stops the scan and propagates without trying further payloads.
///
/// # Errors
///
/// [`InvokeError::IncompatiblePayload`] for a step whose payload is not a
/// first-result callable; the payload's own error otherwise.
pub fn call_until_first_result<A: 'static, T: 'static>(
    operation: &str,
    steps: &[OperationStep],
    args: &A,
) -> Result<Option<T>, InvokeError> {
    for step in steps {
        let payload = downcast_payload::<Arc<ValueFn<A, T>>>(operation, step)?;
        match payload(args) {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(error) => return Err(InvokeError::from_payload(error)),
        }
    }
    Ok(None)
}
