//! External reconciler seam and the batch reentrancy window.
//!
//! The reconciler is the UI runtime the scheduler drives: `enqueue`
//! registers an owner's pending work without running it, and `flush`
//! synchronously runs everything currently enqueued. The scheduler times
//! the flush call alone; enqueueing is assumed cheap.
//!
//! # Reentrancy
//!
//! Applying a task may synchronously produce new tasks. While a batch's
//! apply loop runs, those submissions must route directly to execution
//! rather than the queue: queueing them would hold back work the runtime
//! expects in the current flush. The window is represented by [`ApplyCx`];
//! apply callbacks receive the live context and submit through it. The
//! context is not a lock (nothing contends in a single-threaded model); it
//! only changes where a submission is routed.
//!
//! No context exists during `flush` itself. Work the runtime discovers
//! mid-flush is submitted normally afterwards and waits for the next
//! wake-up, matching the scheduler's guard being cleared before the flush
//! call.

use tracing::trace;

use crate::task::{CompletionFn, OwnerId, Task};

/// External UI runtime the scheduler drives.
///
/// Implementations provide the actual update machinery; the trait enables
/// testing with fakes.
pub trait Reconciler {
    /// Register pending work for `owner` without running it.
    ///
    /// The completion callback, when present, is invoked by the runtime
    /// once the owner's update has been applied.
    fn enqueue(&mut self, owner: OwnerId, completion: Option<CompletionFn>);

    /// Synchronously run all currently enqueued work.
    fn flush(&mut self) -> Result<(), String>;
}

/// Reentrancy window handed to apply callbacks for the duration of a
/// batch's apply loop.
pub struct ApplyCx<'a> {
    reconciler: &'a mut dyn Reconciler,
    reentrant: u64,
}

impl<'a> ApplyCx<'a> {
    pub(crate) fn new(reconciler: &'a mut dyn Reconciler) -> Self {
        Self {
            reconciler,
            reentrant: 0,
        }
    }

    /// Register pending work with the reconciler.
    pub fn enqueue(&mut self, owner: OwnerId, completion: Option<CompletionFn>) {
        self.reconciler.enqueue(owner, completion);
    }

    /// Submit a task from inside the apply loop.
    ///
    /// Routes directly to execution: the task's apply callback runs
    /// immediately against this context and the task never enters the
    /// pending queue. Its owner records no estimate from this batch; only
    /// the admitted tasks are attributed.
    pub fn submit(&mut self, task: Task) {
        self.reentrant += 1;
        trace!(owner = task.owner().0, "reentrant submission routed to execution");
        task.apply_to(self);
    }

    /// Number of reentrant submissions routed through this window.
    #[must_use]
    pub fn reentrant_count(&self) -> u64 {
        self.reentrant
    }
}
