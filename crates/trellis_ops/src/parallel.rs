//! The parallel discipline: one task per step, joined on the dependency DAG.
//!
//! Every step is spawned as an asynchronous task. A task awaits the
//! completion of its forward dependencies' tasks before invoking its
//! payload; between concurrently-ready steps no start order is guaranteed.
//! When a dependency fails — or its task is cancelled before completing —
//! dependents are not run and fail with
//! [`InvokeError::DependencyFailed`]; whether to cancel siblings is the
//! caller's decision.
//!
//! Scheduling returns the collection of [`StepTask`] handles without
//! awaiting them; the caller owns their lifetime. Spawned tasks inherit the
//! spawner's ambient manager.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use hashbrown::HashMap;
use tokio::sync::oneshot;
use trellis_kernel::ambient;
use trellis_kernel::step::OperationStep;

use crate::error::InvokeError;
use crate::payload::{TaskFn, downcast_payload};

use std::sync::Arc;

/// Completion signal of one step's task: `true` on success.
type Completion = Shared<BoxFuture<'static, bool>>;

// ─────────────────────────────────────────────────────────────────────────────
// StepTask
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to one scheduled step task.
#[derive(Debug)]
pub struct StepTask {
    name: String,
    handle: tokio::task::JoinHandle<Result<(), InvokeError>>,
}

impl StepTask {
    /// Name of the step this task runs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requests cancellation of the task.
    ///
    /// Dependents of the step observe the cancellation as a failed
    /// dependency.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Whether the task has finished (successfully or not).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Returns a handle that can cancel the task after this [`StepTask`]
    /// has been consumed by a join.
    #[must_use]
    pub fn abort_handle(&self) -> tokio::task::AbortHandle {
        self.handle.abort_handle()
    }

    /// Awaits the task's completion.
    ///
    /// # Errors
    ///
    /// The payload's own error, [`InvokeError::DependencyFailed`] when a
    /// dependency failed first, [`InvokeError::Cancelled`] when the task was
    /// aborted, or [`InvokeError::Panicked`] when the payload panicked.
    pub async fn join(self) -> Result<(), InvokeError> {
        let Self { name, handle } = self;
        match handle.await {
            Ok(result) => result,
            Err(error) if error.is_cancelled() => Err(InvokeError::Cancelled { task: name }),
            Err(_) => Err(InvokeError::Panicked { task: name }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// call_all_parallel
// ─────────────────────────────────────────────────────────────────────────────

/// Schedules every step of the sequence as an asynchronous task.
///
/// Returns once all tasks are spawned, without awaiting them. Tasks are
/// created in sequence order, but only dependency-respect is guaranteed:
/// a step's payload is not entered before every forward-dependency task has
/// completed successfully.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// [`InvokeError::IncompatiblePayload`] if any step's payload is not a task
/// callable; nothing is spawned in that case beyond the steps already
/// scheduled.
pub fn call_all_parallel<A>(
    operation: &str,
    steps: &[OperationStep],
    args: A,
) -> Result<Vec<StepTask>, InvokeError>
where
    A: Clone + Send + 'static,
{
    let mut completions: HashMap<String, Completion> = HashMap::with_capacity(steps.len());
    let mut tasks = Vec::with_capacity(steps.len());

    for step in steps {
        let payload = downcast_payload::<Arc<TaskFn<A>>>(operation, step)?;
        let (done_tx, done_rx) = oneshot::channel::<bool>();

        // Dependencies appear earlier in resolver order, so their signals
        // are already registered. Dangling names have no signal and no
        // ordering effect here.
        let waits: Vec<(String, Completion)> = step
            .dependencies()
            .iter()
            .filter_map(|dep| {
                completions
                    .get(dep.as_str())
                    .map(|signal| (dep.clone(), signal.clone()))
            })
            .collect();

        let display = step.to_string();
        let args = args.clone();
        let future = async move {
            let mut failed = None;
            for (dependency, wait) in waits {
                if !wait.await {
                    failed = Some(dependency);
                    break;
                }
            }
            let result = match failed {
                Some(dependency) => Err(InvokeError::DependencyFailed {
                    step: display,
                    dependency,
                }),
                None => payload(args).await.map_err(InvokeError::from_payload),
            };
            let _ = done_tx.send(result.is_ok());
            result
        };

        let handle = ambient::spawn_inheriting(future);

        // A dropped sender (panic or abort before completion) reads as
        // failure to dependents.
        let signal: Completion = done_rx.map(|sent| sent.unwrap_or(false)).boxed().shared();
        completions.insert(step.name().to_owned(), signal);
        tasks.push(StepTask {
            name: step.name().to_owned(),
            handle,
        });
    }

    Ok(tasks)
}

/// Awaits every task, returning the first error encountered (in task order).
///
/// Convenience for callers that want fan-out-and-wait semantics; callers
/// that need finer control hold the [`StepTask`]s themselves.
///
/// # Errors
///
/// The first failing task's error.
pub async fn join_all(tasks: Vec<StepTask>) -> Result<(), InvokeError> {
    let mut first_error = None;
    for task in tasks {
        if let Err(error) = task.join().await {
            tracing::debug!(error = %error, "parallel step failed");
            if first_error.is_none() {
                first_error = Some(error);
            }
        }
    }
    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
