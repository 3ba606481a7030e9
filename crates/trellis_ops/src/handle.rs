//! Typed operation handles: a named operation bundled with its discipline.
//!
//! A handle pairs an operation name with the discipline used to run it, a
//! `cache_steps` toggle, and (for the returning disciplines) a fluent list
//! of result checks. Handles resolve the manager through the ambient slot,
//! so they are usually declared once at module scope:
//!
//! ```
//! use trellis_ops::handle::CallAllOperation;
//!
//! static SHUTDOWN: CallAllOperation<()> =
//!     CallAllOperation::new("shutdown").with_cache_steps(false);
//! ```
//!
//! Every handle also offers the `implementation` binding: it turns a plain
//! callable into a [`StepBuilder`] carrying a payload of the shape the
//! handle's discipline expects. Providers finish the builder (dependencies,
//! provenance) and return it from their `operation_steps`.
//!
//! Handles are generic over a single argument type `A`; operations taking
//! several arguments pack them in a tuple. The wrapper and parallel
//! disciplines pass `A` by value — clone-friendly argument types are
//! expected there.

use core::marker::PhantomData;
use std::borrow::Cow;
use std::sync::Arc;

use futures::future::BoxFuture;
use trellis_kernel::ambient;
use trellis_kernel::manager::PluginManager;
use trellis_kernel::resolver::ResolvedSequence;
use trellis_kernel::step::{OperationStep, StepBuilder};

use crate::check::{ResultCheck, run_checks};
use crate::error::{BoxedError, InvokeError};
use crate::invoke;
use crate::parallel::{self, StepTask};
use crate::payload;
use crate::wrapper::{self, AsyncNext, Next, lift_factory, lift_factory_async};

/// Looks up the operation's resolved sequence, honoring the handle's
/// caching toggle.
fn resolve_sequence(
    manager: &PluginManager,
    operation: &str,
    cache_steps: bool,
) -> Result<Arc<ResolvedSequence>, InvokeError> {
    if cache_steps {
        Ok(manager.cached_operation_sequence(operation)?)
    } else {
        Ok(Arc::new(manager.get_operation_sequence(operation)?))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CallAllOperation
// ─────────────────────────────────────────────────────────────────────────────

/// Handle for the call-all discipline: invoke every step, ignore returns.
pub struct CallAllOperation<A> {
    name: Cow<'static, str>,
    cache_steps: bool,
    marker: PhantomData<fn(&A)>,
}

impl<A: 'static> CallAllOperation<A> {
    /// Creates a handle for the named operation. Step caching is on by
    /// default.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            cache_steps: true,
            marker: PhantomData,
        }
    }

    /// Sets whether resolved sequences are memoized between invocations.
    ///
    /// Turn this off for rare lifecycle operations that don't warrant a
    /// cache entry.
    #[must_use]
    pub const fn with_cache_steps(mut self, cache_steps: bool) -> Self {
        self.cache_steps = cache_steps;
        self
    }

    /// The operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the operation through the ambient manager.
    ///
    /// # Errors
    ///
    /// [`InvokeError::NoAmbientManager`] outside a manager scope; otherwise
    /// resolution and payload errors propagate.
    pub fn call(&self, args: &A) -> Result<(), InvokeError> {
        let manager = PluginManager::current()?;
        self.call_with(&manager, args)
    }

    /// Invokes the operation on an explicit manager.
    ///
    /// # Errors
    ///
    /// Resolution and payload errors propagate.
    pub fn call_with(&self, manager: &PluginManager, args: &A) -> Result<(), InvokeError> {
        let sequence = resolve_sequence(manager, &self.name, self.cache_steps)?;
        invoke::call_all(&self.name, sequence.steps(), args)
    }

    /// Binds a callable as a step implementing this operation.
    pub fn implementation<F>(&self, step_name: impl Into<String>, f: F) -> StepBuilder
    where
        F: Fn(&A) -> Result<(), BoxedError> + Send + Sync + 'static,
    {
        OperationStep::builder(step_name, payload::unit_payload(f))
    }
}

impl<A> Clone for CallAllOperation<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            cache_steps: self.cache_steps,
            marker: PhantomData,
        }
    }
}

impl<A> core::fmt::Debug for CallAllOperation<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallAllOperation")
            .field("name", &self.name)
            .field("cache_steps", &self.cache_steps)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FirstResultOperation
// ─────────────────────────────────────────────────────────────────────────────

/// Handle for the first-result discipline: the first provider producing a
/// value wins.
pub struct FirstResultOperation<A, T> {
    name: Cow<'static, str>,
    cache_steps: bool,
    checks: Vec<ResultCheck<T>>,
    marker: PhantomData<fn(&A) -> T>,
}

impl<A: 'static, T: 'static> FirstResultOperation<A, T> {
    /// Creates a handle for the named operation.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            cache_steps: true,
            checks: Vec::new(),
            marker: PhantomData,
        }
    }

    /// Sets whether resolved sequences are memoized between invocations.
    #[must_use]
    pub const fn with_cache_steps(mut self, cache_steps: bool) -> Self {
        self.cache_steps = cache_steps;
        self
    }

    /// The operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches a result check, evaluated after every invocation.
    #[must_use]
    pub fn with_check<F>(mut self, message: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: Fn(&Option<T>) -> bool + Send + Sync + 'static,
    {
        self.checks.push(ResultCheck::new(message, predicate));
        self
    }

    /// Shorthand check: the operation must produce a result.
    #[must_use]
    pub fn returning_value(self) -> Self {
        self.with_check("a result must be produced", |result| result.is_some())
    }

    /// Invokes the operation through the ambient manager.
    ///
    /// # Errors
    ///
    /// [`InvokeError::NoAmbientManager`] outside a manager scope; otherwise
    /// resolution, payload and check errors propagate.
    pub fn call(&self, args: &A) -> Result<Option<T>, InvokeError> {
        let manager = PluginManager::current()?;
        self.call_with(&manager, args)
    }

    /// Invokes the operation on an explicit manager.
    ///
    /// # Errors
    ///
    /// Resolution, payload and check errors propagate.
    pub fn call_with(&self, manager: &PluginManager, args: &A) -> Result<Option<T>, InvokeError> {
        let sequence = resolve_sequence(manager, &self.name, self.cache_steps)?;
        let result = invoke::call_until_first_result(&self.name, sequence.steps(), args)?;
        run_checks(&self.name, &self.checks, &result)?;
        Ok(result)
    }

    /// Binds a callable as a step implementing this operation.
    ///
    /// `Ok(None)` from the callable means "no result, try the next
    /// provider"; return the [`Excluded`](crate::error::Excluded) sentinel
    /// as an error to stop the scan entirely.
    pub fn implementation<F>(&self, step_name: impl Into<String>, f: F) -> StepBuilder
    where
        F: Fn(&A) -> Result<Option<T>, BoxedError> + Send + Sync + 'static,
    {
        OperationStep::builder(step_name, payload::value_payload(f))
    }
}

impl<A, T> Clone for FirstResultOperation<A, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            cache_steps: self.cache_steps,
            checks: self.checks.clone(),
            marker: PhantomData,
        }
    }
}

impl<A, T> core::fmt::Debug for FirstResultOperation<A, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FirstResultOperation")
            .field("name", &self.name)
            .field("cache_steps", &self.cache_steps)
            .field("checks", &self.checks.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WrapperOperation
// ─────────────────────────────────────────────────────────────────────────────

/// Handle for the sync wrapper-chain discipline.
pub struct WrapperOperation<A, T> {
    name: Cow<'static, str>,
    cache_steps: bool,
    checks: Vec<ResultCheck<T>>,
    marker: PhantomData<fn(&A) -> T>,
}

impl<A: 'static, T: 'static> WrapperOperation<A, T> {
    /// Creates a handle for the named operation.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            cache_steps: true,
            checks: Vec::new(),
            marker: PhantomData,
        }
    }

    /// Sets whether resolved sequences are memoized between invocations.
    #[must_use]
    pub const fn with_cache_steps(mut self, cache_steps: bool) -> Self {
        self.cache_steps = cache_steps;
        self
    }

    /// The operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches a result check, evaluated after every invocation.
    #[must_use]
    pub fn with_check<F>(mut self, message: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: Fn(&Option<T>) -> bool + Send + Sync + 'static,
    {
        self.checks.push(ResultCheck::new(message, predicate));
        self
    }

    /// Shorthand check: the chain must produce a value.
    #[must_use]
    pub fn returning_value(self) -> Self {
        self.with_check("a result must be produced", |result| result.is_some())
    }

    /// Invokes the chain through the ambient manager, seeding an absent
    /// value.
    ///
    /// # Errors
    ///
    /// [`InvokeError::NoAmbientManager`] outside a manager scope; otherwise
    /// resolution, payload and check errors propagate.
    pub fn invoke(&self, args: &A) -> Result<Option<T>, InvokeError> {
        self.invoke_seeded(None, args)
    }

    /// Invokes the chain through the ambient manager with an explicit seed.
    ///
    /// # Errors
    ///
    /// As [`invoke`](Self::invoke).
    pub fn invoke_seeded(&self, initial: Option<T>, args: &A) -> Result<Option<T>, InvokeError> {
        let manager = PluginManager::current()?;
        self.invoke_with(&manager, initial, args)
    }

    /// Invokes the chain on an explicit manager.
    ///
    /// # Errors
    ///
    /// Resolution, payload and check errors propagate.
    pub fn invoke_with(
        &self,
        manager: &PluginManager,
        initial: Option<T>,
        args: &A,
    ) -> Result<Option<T>, InvokeError> {
        let sequence = resolve_sequence(manager, &self.name, self.cache_steps)?;
        let result =
            wrapper::call_all_as_wrappers(&self.name, sequence.steps(), initial, args)?;
        run_checks(&self.name, &self.checks, &result)?;
        Ok(result)
    }

    /// Runs the (synchronous) chain on the blocking pool, keeping the
    /// caller's ambient manager visible to the chain.
    ///
    /// # Errors
    ///
    /// As [`invoke`](Self::invoke), plus task cancellation/panic errors
    /// from the blocking dispatch.
    pub async fn invoke_blocking(&self, args: A) -> Result<Option<T>, InvokeError>
    where
        A: Send + 'static,
        T: Send + 'static,
    {
        let manager = PluginManager::current()?;
        let handle = self.clone();
        let dispatched = tokio::task::spawn_blocking(move || {
            ambient::sync_scope(manager, || handle.invoke_seeded(None, &args))
        });
        match dispatched.await {
            Ok(result) => result,
            Err(error) if error.is_cancelled() => Err(InvokeError::Cancelled {
                task: self.name.to_string(),
            }),
            Err(_) => Err(InvokeError::Panicked {
                task: self.name.to_string(),
            }),
        }
    }

    /// Binds a wrapper callable as a step implementing this operation.
    pub fn implementation<F>(&self, step_name: impl Into<String>, f: F) -> StepBuilder
    where
        F: Fn(Next<'_, A, T>, Option<T>, &A) -> Result<Option<T>, BoxedError>
            + Send
            + Sync
            + 'static,
    {
        OperationStep::builder(step_name, payload::wrapper_payload(f))
    }

    /// Binds a factory callable: it runs only when no earlier wrapper
    /// produced a value, and its result flows down the rest of the chain.
    pub fn factory_implementation<F>(&self, step_name: impl Into<String>, f: F) -> StepBuilder
    where
        F: Fn(&A) -> Result<Option<T>, BoxedError> + Send + Sync + 'static,
    {
        self.implementation(step_name, lift_factory(f))
    }
}

impl<A, T> Clone for WrapperOperation<A, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            cache_steps: self.cache_steps,
            checks: self.checks.clone(),
            marker: PhantomData,
        }
    }
}

impl<A, T> core::fmt::Debug for WrapperOperation<A, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WrapperOperation")
            .field("name", &self.name)
            .field("cache_steps", &self.cache_steps)
            .field("checks", &self.checks.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AsyncWrapperOperation
// ─────────────────────────────────────────────────────────────────────────────

/// Handle for the async wrapper-chain discipline.
pub struct AsyncWrapperOperation<A, T> {
    name: Cow<'static, str>,
    cache_steps: bool,
    checks: Vec<ResultCheck<T>>,
    marker: PhantomData<fn(A) -> T>,
}

impl<A, T> AsyncWrapperOperation<A, T>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    /// Creates a handle for the named operation.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            cache_steps: true,
            checks: Vec::new(),
            marker: PhantomData,
        }
    }

    /// Sets whether resolved sequences are memoized between invocations.
    #[must_use]
    pub const fn with_cache_steps(mut self, cache_steps: bool) -> Self {
        self.cache_steps = cache_steps;
        self
    }

    /// The operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches a result check, evaluated after every invocation.
    #[must_use]
    pub fn with_check<F>(mut self, message: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: Fn(&Option<T>) -> bool + Send + Sync + 'static,
    {
        self.checks.push(ResultCheck::new(message, predicate));
        self
    }

    /// Shorthand check: the chain must produce a value.
    #[must_use]
    pub fn returning_value(self) -> Self {
        self.with_check("a result must be produced", |result| result.is_some())
    }

    /// Invokes the chain through the ambient manager, seeding an absent
    /// value.
    ///
    /// # Errors
    ///
    /// [`InvokeError::NoAmbientManager`] outside a manager scope; otherwise
    /// resolution, payload and check errors propagate.
    pub async fn invoke(&self, args: A) -> Result<Option<T>, InvokeError> {
        self.invoke_seeded(None, args).await
    }

    /// Invokes the chain through the ambient manager with an explicit seed.
    ///
    /// # Errors
    ///
    /// As [`invoke`](Self::invoke).
    pub async fn invoke_seeded(
        &self,
        initial: Option<T>,
        args: A,
    ) -> Result<Option<T>, InvokeError> {
        let manager = PluginManager::current()?;
        self.invoke_with(&manager, initial, args).await
    }

    /// Invokes the chain on an explicit manager.
    ///
    /// # Errors
    ///
    /// Resolution, payload and check errors propagate.
    pub async fn invoke_with(
        &self,
        manager: &PluginManager,
        initial: Option<T>,
        args: A,
    ) -> Result<Option<T>, InvokeError> {
        let sequence = resolve_sequence(manager, &self.name, self.cache_steps)?;
        let result = wrapper::call_all_as_wrappers_async(sequence, initial, args).await?;
        run_checks(&self.name, &self.checks, &result)?;
        Ok(result)
    }

    /// Binds an async wrapper callable as a step implementing this
    /// operation.
    pub fn implementation<F>(&self, step_name: impl Into<String>, f: F) -> StepBuilder
    where
        F: Fn(AsyncNext<A, T>, Option<T>, A) -> BoxFuture<'static, Result<Option<T>, BoxedError>>
            + Send
            + Sync
            + 'static,
    {
        OperationStep::builder(step_name, payload::async_wrapper_payload(f))
    }

    /// Binds an async factory callable: it runs only when no earlier
    /// wrapper produced a value.
    pub fn factory_implementation<F>(&self, step_name: impl Into<String>, f: F) -> StepBuilder
    where
        F: Fn(A) -> BoxFuture<'static, Result<Option<T>, BoxedError>> + Send + Sync + 'static,
    {
        self.implementation(step_name, lift_factory_async(f))
    }
}

impl<A, T> Clone for AsyncWrapperOperation<A, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            cache_steps: self.cache_steps,
            checks: self.checks.clone(),
            marker: PhantomData,
        }
    }
}

impl<A, T> core::fmt::Debug for AsyncWrapperOperation<A, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AsyncWrapperOperation")
            .field("name", &self.name)
            .field("cache_steps", &self.cache_steps)
            .field("checks", &self.checks.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ParallelOperation
// ─────────────────────────────────────────────────────────────────────────────

/// Handle for the parallel discipline: one task per step, joined on the
/// dependency DAG.
pub struct ParallelOperation<A> {
    name: Cow<'static, str>,
    cache_steps: bool,
    marker: PhantomData<fn(A)>,
}

impl<A> ParallelOperation<A>
where
    A: Clone + Send + 'static,
{
    /// Creates a handle for the named operation.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            cache_steps: true,
            marker: PhantomData,
        }
    }

    /// Sets whether resolved sequences are memoized between invocations.
    #[must_use]
    pub const fn with_cache_steps(mut self, cache_steps: bool) -> Self {
        self.cache_steps = cache_steps;
        self
    }

    /// The operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schedules every step as a task through the ambient manager.
    ///
    /// Returns the task handles once scheduling is complete, without
    /// awaiting them.
    ///
    /// # Errors
    ///
    /// [`InvokeError::NoAmbientManager`] outside a manager scope,
    /// resolution errors, or a payload shape mismatch.
    pub fn spawn(&self, args: A) -> Result<Vec<StepTask>, InvokeError> {
        let manager = PluginManager::current()?;
        self.spawn_with(&manager, args)
    }

    /// Schedules every step as a task on an explicit manager.
    ///
    /// # Errors
    ///
    /// Resolution errors, or a payload shape mismatch.
    pub fn spawn_with(&self, manager: &PluginManager, args: A) -> Result<Vec<StepTask>, InvokeError> {
        let sequence = resolve_sequence(manager, &self.name, self.cache_steps)?;
        parallel::call_all_parallel(&self.name, sequence.steps(), args)
    }

    /// Schedules every step and awaits them all.
    ///
    /// # Errors
    ///
    /// As [`spawn`](Self::spawn), plus the first failing task's error.
    pub async fn run(&self, args: A) -> Result<(), InvokeError> {
        let tasks = self.spawn(args)?;
        parallel::join_all(tasks).await
    }

    /// Binds an async task body as a step implementing this operation.
    pub fn implementation<F>(&self, step_name: impl Into<String>, f: F) -> StepBuilder
    where
        F: Fn(A) -> BoxFuture<'static, Result<(), BoxedError>> + Send + Sync + 'static,
    {
        OperationStep::builder(step_name, payload::task_payload(f))
    }
}

impl<A> Clone for ParallelOperation<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            cache_steps: self.cache_steps,
            marker: PhantomData,
        }
    }
}

impl<A> core::fmt::Debug for ParallelOperation<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParallelOperation")
            .field("name", &self.name)
            .field("cache_steps", &self.cache_steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_kernel::plugin::Plugin;
    use trellis_kernel::step::OperationStep;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A plugin assembled from prebuilt steps, keyed by operation.
    struct StaticPlugin {
        name: &'static str,
        steps: Vec<(String, OperationStep)>,
        queries: AtomicUsize,
    }

    impl StaticPlugin {
        fn new(name: &'static str, steps: Vec<(&str, StepBuilder)>) -> Arc<Self> {
            let mut plugin = Self {
                name,
                steps: Vec::new(),
                queries: AtomicUsize::new(0),
            };
            let built = steps
                .into_iter()
                .map(|(op, builder)| {
                    (
                        op.to_owned(),
                        builder.provided_by_info(trellis_kernel::plugin::PluginInfo::new(
                            name, "1.0.0",
                        )),
                    )
                })
                .collect();
            plugin.steps = built;
            Arc::new(plugin)
        }
    }

    impl Plugin for StaticPlugin {
        fn name(&self) -> &str {
            self.name
        }
        fn version(&self) -> &str {
            "1.0.0"
        }
        fn operation_steps(&self, operation: &str) -> Vec<OperationStep> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.steps
                .iter()
                .filter(|(op, _)| op == operation)
                .map(|(_, step)| step.clone())
                .collect()
        }
    }

    #[test]
    fn call_without_scope_is_an_environmental_error() {
        static OP: CallAllOperation<()> = CallAllOperation::new("op");
        let err = OP.call(&()).expect_err("no ambient manager");
        assert!(matches!(err, InvokeError::NoAmbientManager(_)));
    }

    #[test]
    fn handles_invoke_through_the_ambient_manager() {
        static OP: CallAllOperation<()> = CallAllOperation::new("op");
        let log = Arc::new(Mutex::new(Vec::new()));

        let payload = {
            let log = log.clone();
            move |&(): &()| {
                log.lock().unwrap().push("ran");
                Ok(())
            }
        };
        let plugin = StaticPlugin::new("p1", vec![("op", OP.implementation("p1.op", payload))]);

        let manager = PluginManager::new([plugin as Arc<dyn Plugin>]);
        manager.as_current_sync(|| OP.call(&())).expect("step runs");
        assert_eq!(*log.lock().unwrap(), ["ran"]);
    }

    #[test]
    fn cached_handles_resolve_once_uncached_every_time() {
        static CACHED: CallAllOperation<()> = CallAllOperation::new("cached.op");
        static UNCACHED: CallAllOperation<()> =
            CallAllOperation::new("uncached.op").with_cache_steps(false);

        let plugin = StaticPlugin::new(
            "p1",
            vec![
                ("cached.op", CACHED.implementation("s1", |&()| Ok(()))),
                ("uncached.op", UNCACHED.implementation("s2", |&()| Ok(()))),
            ],
        );
        let queries = {
            let plugin = plugin.clone();
            move || plugin.queries.load(Ordering::SeqCst)
        };
        let manager = PluginManager::new([plugin as Arc<dyn Plugin>]);

        manager
            .as_current_sync(|| {
                let base = queries();
                CACHED.call(&()).unwrap();
                CACHED.call(&()).unwrap();
                let after_cached = queries();
                // One resolver pass for both invocations.
                assert_eq!(after_cached - base, 1);

                UNCACHED.call(&()).unwrap();
                UNCACHED.call(&()).unwrap();
                // One resolver pass per invocation.
                assert_eq!(queries() - after_cached, 2);
            });
    }

    #[test]
    fn result_checks_reject_bad_results() {
        static OP: FirstResultOperation<(), u32> = FirstResultOperation::new("op");
        let checked = OP.clone().returning_value();

        let plugin = StaticPlugin::new(
            "p1",
            vec![("op", OP.implementation("none", |&()| Ok(None)))],
        );
        let manager = PluginManager::new([plugin as Arc<dyn Plugin>]);

        let err = manager
            .as_current_sync(|| checked.call(&()))
            .expect_err("check fails");
        assert!(matches!(
            err,
            InvokeError::ResultCheckFailed { ref operation, .. } if operation == "op"
        ));
    }

    #[test]
    fn first_result_handle_returns_first_value() {
        static OP: FirstResultOperation<u32, u32> = FirstResultOperation::new("op");

        let p1 = StaticPlugin::new(
            "p1",
            vec![(
                "op",
                OP.implementation("p1.try", |&n| Ok((n > 10).then_some(n * 2))),
            )],
        );
        let p2 = StaticPlugin::new(
            "p2",
            vec![(
                "op",
                OP.implementation("p2.fallback", |&n| Ok(Some(n))).after(["p1.try"]),
            )],
        );

        let manager = PluginManager::new([p1 as Arc<dyn Plugin>, p2 as Arc<dyn Plugin>]);
        manager.as_current_sync(|| {
            assert_eq!(OP.call(&20).unwrap(), Some(40));
            assert_eq!(OP.call(&3).unwrap(), Some(3));
        });
    }

    #[tokio::test]
    async fn blocking_dispatch_sees_the_ambient_manager() {
        static OP: WrapperOperation<(), String> = WrapperOperation::new("op");

        let plugin = StaticPlugin::new(
            "p1",
            vec![(
                "op",
                OP.factory_implementation("make", |&()| {
                    // Proves the blocking thread inherited the scope.
                    PluginManager::current().expect("ambient manager visible");
                    Ok(Some("made".to_owned()))
                }),
            )],
        );
        let manager = PluginManager::new([plugin as Arc<dyn Plugin>]);

        let result = manager
            .clone()
            .as_current(async { OP.invoke_blocking(()).await })
            .await
            .expect("chain runs");
        assert_eq!(result.as_deref(), Some("made"));
    }
}
