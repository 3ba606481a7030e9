//! Wrapper-chain disciplines, sync and async.
//!
//! A wrapper chain is a recursive composition: each payload receives the
//! remainder of the chain as a `next` continuation plus the running value
//! `prev`, and decides what to pass inward and what to return outward:
//!
//! ```text
//! w1(prev) { pre1; v = next(v1); post1 } ─┐
//!     w2(prev) { pre2; v = next(v2); post2 } ─┐
//!         base: returns its prev              │
//!     ◄──────────────────────────────────────┘
//! ◄──────────────────────────────────────────┘
//! ```
//!
//! The chain laws:
//!
//! - the `prev` visible to the first wrapper is the seed value;
//! - the `prev` visible to wrapper *i+1* is whatever wrapper *i* passed to
//!   its `next`;
//! - the chain's return value is the outermost wrapper's return;
//! - the base case returns its `prev` unchanged.
//!
//! Continuations are single-use: [`Next::invoke`] and [`AsyncNext::invoke`]
//! consume the continuation, so "call `next` at most once" holds statically.
//!
//! The running value is `Option<T>`: `None` is "absent", distinct from any
//! legitimately produced value. Factory payloads build on that — see
//! [`lift_factory`] and [`lift_factory_async`].

use core::marker::PhantomData;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use trellis_kernel::resolver::ResolvedSequence;
use trellis_kernel::step::OperationStep;

use crate::error::{BoxedError, InvokeError};
use crate::payload::{AsyncWrapperFn, WrapperFn, downcast_payload};

// ─────────────────────────────────────────────────────────────────────────────
// Sync chain
// ─────────────────────────────────────────────────────────────────────────────

/// The remainder of a sync wrapper chain.
///
/// Passed to each wrapper payload; invoking it runs the rest of the chain
/// with the given running value.
#[must_use]
pub struct Next<'a, A, T> {
    operation: &'a str,
    steps: &'a [OperationStep],
    marker: PhantomData<fn(&A) -> T>,
}

impl<'a, A: 'static, T: 'static> Next<'a, A, T> {
    /// Runs the remainder of the chain with `prev` as its running value.
    ///
    /// The base case (an empty remainder) returns `prev` unchanged.
    ///
    /// # Errors
    ///
    /// Shape mismatches and inner payload errors propagate.
    pub fn invoke(self, prev: Option<T>, args: &A) -> Result<Option<T>, InvokeError> {
        match self.steps.split_first() {
            None => Ok(prev),
            Some((step, rest)) => {
                let payload = downcast_payload::<Arc<WrapperFn<A, T>>>(self.operation, step)?;
                let next = Next {
                    operation: self.operation,
                    steps: rest,
                    marker: PhantomData,
                };
                payload(next, prev, args).map_err(InvokeError::from_payload)
            }
        }
    }
}

/// Applies the sync wrapper-chain discipline to a resolved sequence.
///
/// `initial` seeds the outermost wrapper's `prev`.
///
/// # Errors
///
/// Shape mismatches and payload errors propagate.
pub fn call_all_as_wrappers<A: 'static, T: 'static>(
    operation: &str,
    steps: &[OperationStep],
    initial: Option<T>,
    args: &A,
) -> Result<Option<T>, InvokeError> {
    Next {
        operation,
        steps,
        marker: PhantomData,
    }
    .invoke(initial, args)
}

/// Lifts a factory into a wrapper: the factory runs only when the running
/// value is absent, and the chosen value is passed inward.
///
/// This is what lets several plugins attempt to produce a value — the first
/// success wins — while downstream wrappers still decorate.
pub fn lift_factory<A, T, F>(
    factory: F,
) -> impl Fn(Next<'_, A, T>, Option<T>, &A) -> Result<Option<T>, BoxedError> + Send + Sync + 'static
where
    A: 'static,
    T: 'static,
    F: Fn(&A) -> Result<Option<T>, BoxedError> + Send + Sync + 'static,
{
    move |next, prev, args| {
        let value = match prev {
            Some(value) => Some(value),
            None => factory(args)?,
        };
        next.invoke(value, args).map_err(Into::into)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Async chain
// ─────────────────────────────────────────────────────────────────────────────

/// The remainder of an async wrapper chain.
///
/// Owns its view of the sequence so that payload futures are `'static`;
/// arguments travel by value (clone them when passing inward).
#[must_use]
pub struct AsyncNext<A, T> {
    sequence: Arc<ResolvedSequence>,
    position: usize,
    marker: PhantomData<fn(A) -> T>,
}

impl<A, T> AsyncNext<A, T>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    /// Runs the remainder of the chain with `prev` as its running value.
    ///
    /// Suspends at every inner `next` await and at the payloads' own await
    /// points. The base case returns `prev` unchanged.
    ///
    /// # Errors
    ///
    /// Shape mismatches and inner payload errors propagate.
    pub fn invoke(
        self,
        prev: Option<T>,
        args: A,
    ) -> BoxFuture<'static, Result<Option<T>, InvokeError>> {
        async move {
            let Some(step) = self.sequence.steps().get(self.position) else {
                return Ok(prev);
            };
            let payload = downcast_payload::<Arc<AsyncWrapperFn<A, T>>>(
                self.sequence.operation(),
                step,
            )?;
            let next = Self {
                sequence: self.sequence.clone(),
                position: self.position + 1,
                marker: PhantomData,
            };
            payload(next, prev, args)
                .await
                .map_err(InvokeError::from_payload)
        }
        .boxed()
    }
}

/// Applies the async wrapper-chain discipline to a resolved sequence.
///
/// # Errors
///
/// Shape mismatches and payload errors propagate.
pub async fn call_all_as_wrappers_async<A, T>(
    sequence: Arc<ResolvedSequence>,
    initial: Option<T>,
    args: A,
) -> Result<Option<T>, InvokeError>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    AsyncNext {
        sequence,
        position: 0,
        marker: PhantomData,
    }
    .invoke(initial, args)
    .await
}

/// Async counterpart of [`lift_factory`].
pub fn lift_factory_async<A, T, F>(
    factory: F,
) -> impl Fn(AsyncNext<A, T>, Option<T>, A) -> BoxFuture<'static, Result<Option<T>, BoxedError>>
+ Send
+ Sync
+ 'static
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
    F: Fn(A) -> BoxFuture<'static, Result<Option<T>, BoxedError>> + Send + Sync + 'static,
{
    let factory = Arc::new(factory);
    move |next, prev, args: A| {
        let factory = factory.clone();
        async move {
            let value = match prev {
                Some(value) => Some(value),
                None => factory(args.clone()).await?,
            };
            next.invoke(value, args).await.map_err(Into::into)
        }
        .boxed()
    }
}
