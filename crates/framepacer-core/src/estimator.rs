//! Per-owner cost estimation and promising-prefix selection.
//!
//! Estimates are learned online: after every recorded batch flush, the
//! measured wall-clock time is written as the estimate for every owner in
//! the batch. The last measurement wins; there is no smoothing, averaging,
//! expiry, or decay. A missing estimate is a valid, expected state (the
//! owner has simply never been measured), not an error.
//!
//! Estimates live in an explicit side table keyed by [`OwnerId`], never as
//! fields on the caller's entities. Their lifetime is caller-managed: call
//! [`CostEstimator::forget`] when an owner entity dies.
//!
//! # Promising-prefix selection
//!
//! Given the pending queue and a budget, the estimator picks the cheapest
//! tasks whose cumulative estimated cost fits:
//!
//! 1. Stable-sort the queue contents by estimated duration ascending.
//!    Tasks without an estimate sort last; arrival order is preserved among
//!    ties and among unknowns. The sort runs on a scratch index list, so
//!    the queue itself is never reordered.
//! 2. Walk the sorted order accumulating a running total. Stop at the first
//!    task without an estimate, or the first whose inclusion would push the
//!    total over the budget. Greedy prefix only: no look-ahead for a
//!    smaller task further on that would still fit. Landing exactly on the
//!    budget is admitted.
//! 3. Extract the accepted tasks, returning them cheapest-first. The
//!    remainder of the queue keeps arrival order.
//!
//! This maximizes the count of completed cheap updates per cycle over
//! strict fairness.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, trace};

use crate::queue::PendingQueue;
use crate::task::{OwnerId, Task};

/// Side table of learned per-owner flush durations.
#[derive(Debug, Default)]
pub struct CostEstimator {
    estimates: HashMap<OwnerId, f64>,
}

impl CostEstimator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            estimates: HashMap::new(),
        }
    }

    /// Record a measured duration for an owner, overwriting any prior value.
    pub fn record(&mut self, owner: OwnerId, duration_ms: f64) {
        trace!(owner = owner.0, duration_ms, "estimate recorded");
        self.estimates.insert(owner, duration_ms);
    }

    /// Estimated duration for an owner, if one has been measured.
    #[must_use]
    pub fn estimate(&self, owner: OwnerId) -> Option<f64> {
        self.estimates.get(&owner).copied()
    }

    /// Drop the estimate for an owner. Call when the owner entity dies.
    pub fn forget(&mut self, owner: OwnerId) -> Option<f64> {
        self.estimates.remove(&owner)
    }

    /// Drop all estimates.
    pub fn clear(&mut self) {
        self.estimates.clear();
    }

    /// Number of owners with a recorded estimate.
    #[must_use]
    pub fn len(&self) -> usize {
        self.estimates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    /// Select and remove the promising prefix from `queue`.
    ///
    /// Returns the accepted tasks cheapest-estimated-first; the queue's
    /// remaining tasks keep their arrival order. Returns an empty vec when
    /// nothing fits (including when the head of the sorted order has no
    /// estimate).
    pub fn take_promising(&self, queue: &mut PendingQueue, budget_ms: f64) -> Vec<Task> {
        let mut order: Vec<usize> = (0..queue.len()).collect();
        // Stable: arrival order survives among equal estimates and among
        // unknowns.
        order.sort_by(|&a, &b| {
            let ea = queue.get(a).and_then(|t| self.estimate(t.owner()));
            let eb = queue.get(b).and_then(|t| self.estimate(t.owner()));
            match (ea, eb) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });

        let mut total = 0.0;
        let mut accepted = Vec::new();
        for &idx in &order {
            let Some(est) = queue.get(idx).and_then(|t| self.estimate(t.owner())) else {
                break;
            };
            if total + est > budget_ms {
                break;
            }
            total += est;
            accepted.push(idx);
        }

        if accepted.is_empty() {
            return Vec::new();
        }
        debug!(
            count = accepted.len(),
            total_ms = total,
            budget_ms,
            "promising prefix selected"
        );
        queue.extract(&accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(owners: &[u64]) -> PendingQueue {
        let mut q = PendingQueue::new();
        for &owner in owners {
            q.push(Task::enqueue_only(OwnerId(owner)));
        }
        q
    }

    fn owners_of(tasks: &[Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.owner().0).collect()
    }

    fn remaining_owners(queue: &PendingQueue) -> Vec<u64> {
        (0..queue.len())
            .map(|i| queue.get(i).unwrap().owner().0)
            .collect()
    }

    // -- Side table -------------------------------------------------------------

    #[test]
    fn unknown_owner_has_no_estimate() {
        let est = CostEstimator::new();
        assert_eq!(est.estimate(OwnerId(1)), None);
    }

    #[test]
    fn record_overwrites_without_averaging() {
        let mut est = CostEstimator::new();
        est.record(OwnerId(1), 10.0);
        est.record(OwnerId(1), 2.0);
        assert_eq!(est.estimate(OwnerId(1)), Some(2.0));
    }

    #[test]
    fn forget_removes_entry() {
        let mut est = CostEstimator::new();
        est.record(OwnerId(1), 5.0);
        assert_eq!(est.forget(OwnerId(1)), Some(5.0));
        assert_eq!(est.estimate(OwnerId(1)), None);
        assert!(est.is_empty());
    }

    // -- Promising prefix -------------------------------------------------------

    #[test]
    fn selects_prefix_that_fits_budget() {
        // Estimates 3, 4, 9 against budget 10: 3+4 fits, 3+4+9 does not.
        let mut est = CostEstimator::new();
        est.record(OwnerId(1), 3.0);
        est.record(OwnerId(2), 4.0);
        est.record(OwnerId(3), 9.0);
        let mut q = queue_of(&[1, 2, 3]);

        let picked = est.take_promising(&mut q, 10.0);
        assert_eq!(owners_of(&picked), vec![1, 2]);
        assert_eq!(remaining_owners(&q), vec![3]);
    }

    #[test]
    fn returns_cheapest_first_regardless_of_arrival() {
        let mut est = CostEstimator::new();
        est.record(OwnerId(1), 5.0);
        est.record(OwnerId(2), 1.0);
        est.record(OwnerId(3), 3.0);
        let mut q = queue_of(&[1, 2, 3]);

        let picked = est.take_promising(&mut q, 100.0);
        assert_eq!(owners_of(&picked), vec![2, 3, 1]);
        assert!(q.is_empty());
    }

    #[test]
    fn stops_at_first_unestimated_task() {
        // Unknowns sort last, so one unknown ends the walk even when a
        // cheap estimated task would still fit after it.
        let mut est = CostEstimator::new();
        est.record(OwnerId(1), 1.0);
        let mut q = queue_of(&[1, 2]);

        let picked = est.take_promising(&mut q, 10.0);
        assert_eq!(owners_of(&picked), vec![1]);
        assert_eq!(remaining_owners(&q), vec![2]);
    }

    #[test]
    fn all_unestimated_selects_nothing() {
        let est = CostEstimator::new();
        let mut q = queue_of(&[1, 2, 3]);
        assert!(est.take_promising(&mut q, 10.0).is_empty());
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn exact_budget_fit_is_admitted() {
        let mut est = CostEstimator::new();
        est.record(OwnerId(1), 5.0);
        est.record(OwnerId(2), 5.0);
        let mut q = queue_of(&[1, 2]);

        let picked = est.take_promising(&mut q, 10.0);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn walk_ends_at_first_overflow() {
        // Sorted order 1, 6, 8 against budget 7: 1+6 fits, the 8 overflows
        // and ends the walk.
        let mut est = CostEstimator::new();
        est.record(OwnerId(1), 6.0);
        est.record(OwnerId(2), 8.0);
        est.record(OwnerId(3), 1.0);
        let mut q = queue_of(&[1, 2, 3]);

        let picked = est.take_promising(&mut q, 7.0);
        assert_eq!(owners_of(&picked), vec![3, 1]);
        assert_eq!(remaining_owners(&q), vec![2]);
    }

    #[test]
    fn ties_keep_arrival_order() {
        let mut est = CostEstimator::new();
        est.record(OwnerId(1), 2.0);
        est.record(OwnerId(2), 2.0);
        est.record(OwnerId(3), 2.0);
        let mut q = queue_of(&[3, 1, 2]);

        let picked = est.take_promising(&mut q, 100.0);
        assert_eq!(owners_of(&picked), vec![3, 1, 2]);
    }

    #[test]
    fn shared_owner_counts_each_task() {
        // Two queued tasks for the same owner each cost the owner's
        // estimate; both fit a budget of twice the estimate.
        let mut est = CostEstimator::new();
        est.record(OwnerId(1), 4.0);
        let mut q = queue_of(&[1, 1]);

        let picked = est.take_promising(&mut q, 8.0);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn remainder_keeps_arrival_order() {
        let mut est = CostEstimator::new();
        est.record(OwnerId(2), 1.0);
        est.record(OwnerId(4), 2.0);
        // 1, 3, 5 unestimated; 2 and 4 get picked out of the middle.
        let mut q = queue_of(&[1, 2, 3, 4, 5]);

        let picked = est.take_promising(&mut q, 10.0);
        assert_eq!(owners_of(&picked), vec![2, 4]);
        assert_eq!(remaining_owners(&q), vec![1, 3, 5]);
    }

    #[test]
    fn empty_queue_selects_nothing() {
        let est = CostEstimator::new();
        let mut q = PendingQueue::new();
        assert!(est.take_promising(&mut q, 10.0).is_empty());
    }
}
