//! The well-known application lifecycle operations.
//!
//! These handles are the vocabulary the [runtime](crate::runtime) speaks.
//! None of them cache their resolved sequences — each runs a handful of
//! times per process, and `bootstrap` in particular may run before
//! discovery-style steps have finished appending plugins.

use trellis_ops::handle::{CallAllOperation, ParallelOperation};

/// Runs synchronously at application startup, before the async runtime is
/// driving operations. Configuration loading and logging setup live here.
pub static BOOTSTRAP: CallAllOperation<()> =
    CallAllOperation::new("bootstrap").with_cache_steps(false);

/// Initialization: every plugin brings up its resources. Steps run as
/// parallel tasks joined on their dependency DAG.
pub static INIT: ParallelOperation<()> = ParallelOperation::new("init").with_cache_steps(false);

/// The application's main work. Long-running steps live here; the runtime
/// awaits them and cancels them on interrupt.
pub static RUN: ParallelOperation<()> = ParallelOperation::new("run").with_cache_steps(false);

/// Shutdown: runs before the application stops, even when `init` or `run`
/// failed or were interrupted.
pub static TERMINATE: ParallelOperation<()> =
    ParallelOperation::new("terminate").with_cache_steps(false);
