//! Pending task queue (arrival order).
//!
//! Holds tasks between submission and execution. A task occupies exactly
//! one position until removed for execution: never duplicated, never
//! restored after removal. No deduplication is performed; an owner may have
//! several independently scheduled tasks queued at once.

use std::collections::VecDeque;

use tracing::trace;

use crate::error::{Error, Result};
use crate::task::Task;

/// FIFO queue of pending tasks.
#[derive(Default)]
pub struct PendingQueue {
    tasks: VecDeque<Task>,
}

impl PendingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// Append a task to the tail.
    pub fn push(&mut self, task: Task) {
        trace!(owner = task.owner.0, seq = task.seq, "task queued");
        self.tasks.push_back(task);
    }

    /// Remove and return the head task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyQueue`] when the queue is empty. The frame
    /// executor never calls this without checking length first.
    pub fn take_front(&mut self) -> Result<Task> {
        self.tasks.pop_front().ok_or(Error::EmptyQueue)
    }

    /// Non-consuming peek at the head task.
    #[must_use]
    pub fn front(&self) -> Option<&Task> {
        self.tasks.front()
    }

    /// Task at `index`, if in bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Remove the tasks at `indices`, returning them in the order the
    /// indices are given. Everything left behind keeps its arrival order.
    ///
    /// Indices must be in bounds and distinct; out-of-range entries are
    /// ignored.
    pub fn extract(&mut self, indices: &[usize]) -> Vec<Task> {
        if indices.is_empty() {
            return Vec::new();
        }
        let drained: Vec<Task> = self.tasks.drain(..).collect();
        let mut picked: Vec<Option<Task>> = indices.iter().map(|_| None).collect();
        for (pos, task) in drained.into_iter().enumerate() {
            if let Some(slot) = indices.iter().position(|&i| i == pos) {
                picked[slot] = Some(task);
            } else {
                self.tasks.push_back(task);
            }
        }
        picked.into_iter().flatten().collect()
    }
}

impl std::fmt::Debug for PendingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingQueue")
            .field("len", &self.tasks.len())
            .finish()
    }
}
