//! Task and owner identity types.
//!
//! A [`Task`] is one unit of deferred UI update work attributed to an owner
//! entity. The owner identity is the cost-estimation key: the measured
//! flush time of a batch is stored against every owner in it and reused to
//! predict how expensive that owner's next update will be.
//!
//! Tasks are created on submission and consumed exactly once by execution.
//! They are never re-queued and never retried.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reconciler::ApplyCx;

/// Caller-supplied identity of the entity a task updates.
///
/// Used as the cost-estimation key. Multiple tasks may share an owner;
/// each executes independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub u64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner-{}", self.0)
    }
}

/// Completion callback, invoked by the runtime once the update has applied.
pub type CompletionFn = Box<dyn FnOnce()>;

/// Apply callback: registers the task's work with the reconciler.
///
/// Receives the live [`ApplyCx`] so that submissions made while the batch's
/// apply loop runs route directly to execution instead of the queue.
pub type ApplyFn = Box<dyn FnOnce(&mut ApplyCx<'_>, OwnerId, Option<CompletionFn>)>;

/// One unit of deferred work submitted by a caller.
pub struct Task {
    pub(crate) owner: OwnerId,
    pub(crate) apply: ApplyFn,
    pub(crate) completion: Option<CompletionFn>,
    pub(crate) category: Option<String>,
    pub(crate) seq: u64,
}

impl Task {
    /// Create a task for `owner` with the given apply callback.
    #[must_use]
    pub fn new(owner: OwnerId, apply: ApplyFn) -> Self {
        Self {
            owner,
            apply,
            completion: None,
            category: None,
            seq: 0,
        }
    }

    /// The common case: an apply callback that simply registers the owner's
    /// pending work with the reconciler.
    #[must_use]
    pub fn enqueue_only(owner: OwnerId) -> Self {
        Self::new(
            owner,
            Box::new(|cx, owner, completion| cx.enqueue(owner, completion)),
        )
    }

    /// Attach a completion callback.
    #[must_use]
    pub fn with_completion(mut self, completion: CompletionFn) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Attach a category label (input to the bypass predicate).
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Owner entity this task updates.
    #[must_use]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Category label, if any.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Arrival sequence number, assigned at submission (0 before).
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Run the apply callback against the given context, consuming the task.
    pub(crate) fn apply_to(self, cx: &mut ApplyCx<'_>) {
        let Task {
            owner,
            apply,
            completion,
            ..
        } = self;
        (apply)(cx, owner, completion);
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("owner", &self.owner)
            .field("category", &self.category)
            .field("seq", &self.seq)
            .field("has_completion", &self.completion.is_some())
            .finish()
    }
}
