//! Frame executor: deadline-aware batching of update tasks.
//!
//! Submission and execution are decoupled: tasks queue as they arrive, and
//! each wake-up executes the largest cheap subset that fits the frame
//! budget. A task may wait one or more cycles; in exchange, many cheap
//! tasks complete per cycle and no cycle is overrun more than unavoidable.
//!
//! # Per-wake-up state machine
//!
//! ```text
//! Armed ──wake-up──▶ Running ──backlog?──▶ Armed
//!                       │
//!                       └──empty──▶ Idle
//! ```
//!
//! One wake-up runs four steps:
//!
//! 1. **Promising pass**: execute the cheapest-estimated prefix whose
//!    cumulative cost fits the whole budget, as one batch.
//! 2. **Opportunistic pass**: while budget remains, admit the FIFO head if
//!    its estimate fits the leftover (missing estimate counts as zero:
//!    unestimated work is admitted optimistically). Strict head-of-line
//!    blocking: the first head that does not fit ends the pass.
//! 3. **Starvation fallback**: if the budget is still untouched and tasks
//!    pend, force exactly one regardless of cost. Tasks whose cost
//!    permanently exceeds the budget still make progress.
//! 4. **Re-arm** the trigger if backlog remains.
//!
//! The two passes deliberately use different admission policies (prefix-sum
//! against the whole budget vs head-of-line against the leftover); this
//! asymmetry is an observable, tested property.
//!
//! Measured budget arithmetic may go negative and is never clamped.
//!
//! # Failure semantics
//!
//! A reconciler flush failure propagates out of [`FrameScheduler::on_frame`]
//! immediately: no partial-progress recovery, no retry, and the re-arm step
//! is skipped. The backlog is not stranded, because the wake-up was
//! acknowledged on entry: the next [`FrameScheduler::submit`] arms a fresh
//! wake-up.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::estimator::CostEstimator;
use crate::queue::PendingQueue;
use crate::reconciler::{ApplyCx, Reconciler};
use crate::task::{OwnerId, Task};
use crate::trigger::{FrameTrigger, WakeupSource};

/// Default frame budget: one 60 Hz display refresh interval.
pub const DEFAULT_FRAME_BUDGET_MS: f64 = 1000.0 / 60.0;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the frame scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum time allotted to batch execution per wake-up, milliseconds.
    pub frame_budget_ms: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_budget_ms: DEFAULT_FRAME_BUDGET_MS,
        }
    }
}

// =============================================================================
// Reports and stats
// =============================================================================

/// What one wake-up did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameReport {
    /// Tasks executed by the promising pass.
    pub promising: usize,
    /// Tasks executed by the opportunistic pass.
    pub opportunistic: usize,
    /// Whether the starvation fallback forced a task.
    pub forced: bool,
    /// Total tasks executed this wake-up.
    pub executed: usize,
    /// Sum of measured flush times, milliseconds.
    pub elapsed_ms: f64,
    /// Budget left after the opportunistic pass (negative when overrun).
    pub remaining_ms: f64,
    /// Whether the trigger was re-armed for remaining backlog.
    pub rearmed: bool,
}

/// Lifetime counters for a scheduler instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Tasks accepted through `submit`.
    pub submitted: u64,
    /// Submissions routed through the bypass path.
    pub bypassed: u64,
    /// Tasks executed as batch members (bypass included).
    pub executed: u64,
    /// Reentrant submissions routed directly to execution.
    pub reentrant: u64,
    /// Wake-ups entered.
    pub frames: u64,
    /// Starvation-fallback activations.
    pub forced: u64,
}

// =============================================================================
// FrameScheduler
// =============================================================================

/// Predicate selecting tasks that must never be queued or estimated.
pub type BypassPredicate = Box<dyn Fn(&Task) -> bool>;

/// Deadline-aware batching scheduler.
///
/// Owns the pending queue, the cost estimator, and the wake-up trigger;
/// the reconciler, clock, and wake-up source are injected at construction
/// so tests can drive the scheduler deterministically with fakes.
///
/// Single-threaded cooperative: nothing here spawns or blocks, and the
/// only suspension point is the one-shot wake-up registration.
pub struct FrameScheduler<R: Reconciler, C: Clock, W: WakeupSource> {
    config: SchedulerConfig,
    queue: PendingQueue,
    estimator: CostEstimator,
    trigger: FrameTrigger,
    bypass: BypassPredicate,
    reconciler: R,
    clock: C,
    wakeups: W,
    next_seq: u64,
    stats: SchedulerStats,
}

impl<R: Reconciler, C: Clock, W: WakeupSource> FrameScheduler<R, C, W> {
    /// Create a scheduler with no bypass (every task is queued).
    #[must_use]
    pub fn new(config: SchedulerConfig, reconciler: R, clock: C, wakeups: W) -> Self {
        Self::with_bypass(config, reconciler, clock, wakeups, Box::new(|_| false))
    }

    /// Create a scheduler with a bypass predicate.
    ///
    /// Tasks the predicate selects skip the queue and estimator entirely
    /// and execute immediately as singleton batches.
    #[must_use]
    pub fn with_bypass(
        config: SchedulerConfig,
        reconciler: R,
        clock: C,
        wakeups: W,
        bypass: BypassPredicate,
    ) -> Self {
        Self {
            config,
            queue: PendingQueue::new(),
            estimator: CostEstimator::new(),
            trigger: FrameTrigger::new(),
            bypass,
            reconciler,
            clock,
            wakeups,
            next_seq: 0,
            stats: SchedulerStats::default(),
        }
    }

    /// Submit a task. Sole external entry point.
    ///
    /// Bypass-flagged tasks execute immediately (no queue, no budget
    /// accounting, no estimate recording). All others are appended to the
    /// pending queue and a wake-up is requested, deduplicated against any
    /// already outstanding one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Flush`] if a bypassed task's flush fails.
    pub fn submit(&mut self, mut task: Task) -> Result<()> {
        task.seq = self.next_seq;
        self.next_seq += 1;
        self.stats.submitted += 1;

        if (self.bypass)(&task) {
            self.stats.bypassed += 1;
            debug!(
                owner = task.owner().0,
                category = task.category(),
                "bypass: executing immediately"
            );
            self.execute_batch(vec![task], false)?;
            return Ok(());
        }

        self.queue.push(task);
        self.trigger.request(&mut self.wakeups);
        Ok(())
    }

    /// Run one wake-up. Called by the host exactly once per granted
    /// [`WakeupSource::request_frame`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Flush`] if the reconciler fails mid-frame. The
    /// wake-up aborts without re-arming; see the module docs for why the
    /// backlog is not stranded.
    pub fn on_frame(&mut self) -> Result<FrameReport> {
        // Clear the pending flag before any work so a fresh wake-up can be
        // armed if new tasks appear during execution.
        self.trigger.acknowledge();
        self.stats.frames += 1;

        let budget = self.config.frame_budget_ms;
        let mut remaining = budget;
        let mut elapsed_total = 0.0;

        // Step 1: promising pass. One batch of the cheapest-estimated
        // prefix that fits the whole budget.
        let promising = self.estimator.take_promising(&mut self.queue, budget);
        let n_promising = promising.len();
        if !promising.is_empty() {
            let spent = self.execute_batch(promising, true)?;
            remaining -= spent;
            elapsed_total += spent;
        }

        // Step 2: opportunistic pass. Singleton batches off the FIFO head
        // while the leftover budget allows. A missing estimate admits
        // optimistically; the first head that does not fit ends the pass.
        let mut n_opportunistic = 0;
        while remaining > 0.0 {
            let Some(front) = self.queue.front() else {
                break;
            };
            let estimate = self.estimator.estimate(front.owner()).unwrap_or(0.0);
            if estimate > remaining {
                trace!(
                    owner = front.owner().0,
                    estimate_ms = estimate,
                    remaining_ms = remaining,
                    "head does not fit leftover budget"
                );
                break;
            }
            let task = self.queue.take_front()?;
            let spent = self.execute_batch(vec![task], true)?;
            remaining -= spent;
            elapsed_total += spent;
            n_opportunistic += 1;
        }

        // Step 3: starvation fallback. Exact comparison: `remaining` only
        // ever changes by subtraction of measured time, so equality means
        // nothing was charged this frame (a zero-measure execution counts
        // as uncharged and still triggers the fallback).
        let mut forced = false;
        if remaining == budget && !self.queue.is_empty() {
            let task = self.queue.take_front()?;
            warn!(
                owner = task.owner().0,
                budget_ms = budget,
                "no pending task fits the frame budget; forcing one"
            );
            let spent = self.execute_batch(vec![task], true)?;
            elapsed_total += spent;
            forced = true;
            self.stats.forced += 1;
        }

        // Step 4: re-arm for remaining backlog.
        let rearmed = if self.queue.is_empty() {
            false
        } else {
            self.trigger.request(&mut self.wakeups)
        };

        let report = FrameReport {
            promising: n_promising,
            opportunistic: n_opportunistic,
            forced,
            executed: n_promising + n_opportunistic + usize::from(forced),
            elapsed_ms: elapsed_total,
            remaining_ms: remaining,
            rearmed,
        };
        debug!(
            promising = report.promising,
            opportunistic = report.opportunistic,
            forced = report.forced,
            elapsed_ms = report.elapsed_ms,
            remaining_ms = report.remaining_ms,
            backlog = self.queue.len(),
            "frame executed"
        );
        Ok(report)
    }

    /// Execute one batch: apply every task in order, flush once, and
    /// attribute the measured flush time uniformly to every owner in the
    /// batch (no apportioning, no averaging) when recording.
    ///
    /// Timing brackets the flush call only; applying is assumed cheap and
    /// excluded.
    fn execute_batch(&mut self, tasks: Vec<Task>, record_estimates: bool) -> Result<f64> {
        let owners: Vec<OwnerId> = if record_estimates {
            tasks.iter().map(Task::owner).collect()
        } else {
            Vec::new()
        };
        let batch_len = tasks.len();

        let reentrant = {
            let mut cx = ApplyCx::new(&mut self.reconciler);
            for task in tasks {
                task.apply_to(&mut cx);
            }
            cx.reentrant_count()
        };

        let start = self.clock.now_ms();
        self.reconciler.flush().map_err(Error::Flush)?;
        let elapsed = self.clock.now_ms() - start;

        for &owner in &owners {
            self.estimator.record(owner, elapsed);
        }
        self.stats.executed += batch_len as u64;
        self.stats.reentrant += reentrant;
        trace!(batch = batch_len, reentrant, elapsed_ms = elapsed, "batch flushed");
        Ok(elapsed)
    }

    // -- Accessors --------------------------------------------------------------

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Number of tasks waiting for a wake-up.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Whether a wake-up is currently outstanding.
    #[must_use]
    pub fn wakeup_pending(&self) -> bool {
        self.trigger.is_pending()
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// The cost estimator side table.
    #[must_use]
    pub fn estimator(&self) -> &CostEstimator {
        &self.estimator
    }

    /// Mutable estimator access: estimate lifetime is caller-managed
    /// (`forget` owners when their entities die, pre-seed for tests).
    pub fn estimator_mut(&mut self) -> &mut CostEstimator {
        &mut self.estimator
    }

    /// The injected reconciler.
    #[must_use]
    pub fn reconciler(&self) -> &R {
        &self.reconciler
    }

    /// Mutable access to the injected reconciler.
    pub fn reconciler_mut(&mut self) -> &mut R {
        &mut self.reconciler
    }

    /// The injected wake-up source.
    #[must_use]
    pub fn wakeups(&self) -> &W {
        &self.wakeups
    }
}

impl<R: Reconciler, C: Clock, W: WakeupSource> std::fmt::Debug for FrameScheduler<R, C, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("config", &self.config)
            .field("queue_len", &self.queue.len())
            .field("wakeup_pending", &self.trigger.is_pending())
            .field("stats", &self.stats)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================



#[cfg(test)]
mod tests_support {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    pub struct LivenessClock {
        now: Rc<Cell<f64>>,
    }

    impl Clock for LivenessClock {
        fn now_ms(&self) -> f64 {
            self.now.get()
        }
    }

    #[derive(Default)]
    pub struct NullWakeups;

    impl WakeupSource for NullWakeups {
        fn request_frame(&mut self) {}
    }

    pub struct CostlyReconciler {
        clock: LivenessClock,
        costs: HashMap<u64, f64>,
        pending: Vec<OwnerId>,
        log: Rc<RefCell<Vec<u64>>>,
    }

    impl Reconciler for CostlyReconciler {
        fn enqueue(&mut self, owner: OwnerId, _completion: Option<crate::task::CompletionFn>) {
            self.pending.push(owner);
        }

        fn flush(&mut self) -> std::result::Result<(), String> {
            for owner in self.pending.drain(..) {
                let cost = self.costs.get(&owner.0).copied().unwrap_or(0.0);
                self.clock.now.set(self.clock.now.get() + cost);
                self.log.borrow_mut().push(owner.0);
            }
            Ok(())
        }
    }

    /// Scheduler preloaded with `(owner, true_cost)` submissions, plus a
    /// handle on the execution log.
    pub fn liveness_fixture(
        budget_ms: f64,
        tasks: &[(u64, u16)],
    ) -> (
        FrameScheduler<CostlyReconciler, LivenessClock, NullWakeups>,
        Rc<RefCell<Vec<u64>>>,
    ) {
        let clock = LivenessClock::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let costs: HashMap<u64, f64> = tasks
            .iter()
            .map(|&(owner, cost)| (owner, f64::from(cost)))
            .collect();
        let reconciler = CostlyReconciler {
            clock: clock.clone(),
            costs,
            pending: Vec::new(),
            log: Rc::clone(&log),
        };
        let mut sched = FrameScheduler::new(
            SchedulerConfig {
                frame_budget_ms: budget_ms,
            },
            reconciler,
            clock,
            NullWakeups,
        );
        for &(owner, _) in tasks {
            sched.submit(Task::enqueue_only(OwnerId(owner))).unwrap();
        }
        (sched, log)
    }
}
