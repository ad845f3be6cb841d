//! framepacer-core: adaptive frame-budget batching for UI update work.
//!
//! Accepts asynchronous update tasks from a reactivity runtime and groups
//! them into per-wake-up batches sized to fit a fixed time budget, using
//! per-owner cost estimates learned online from prior executions. Arrival
//! and execution are decoupled: a task may wait a cycle or more, and in
//! exchange many cheap tasks complete per cycle and no cycle overruns more
//! than unavoidable.
//!
//! # Architecture
//!
//! ```text
//! submit ──▶ bypass? ──yes──▶ batch execution (immediate, unrecorded)
//!    │ no
//!    ▼
//! PendingQueue ──▶ FrameTrigger (deduplicated one-shot wake-up)
//!                        │ host wake-up
//!                        ▼
//!                 FrameScheduler::on_frame
//!                   1. promising pass   (cheapest prefix that fits)
//!                   2. opportunistic    (FIFO head while budget remains)
//!                   3. starvation fallback (force one if nothing fit)
//!                   4. re-arm if backlog remains
//! ```
//!
//! The reconciler (the runtime's `enqueue`/`flush` pair), the monotonic
//! clock, and the wake-up source are injected as trait objects, so the
//! scheduler is fully deterministic under test fakes.
//!
//! # Modules
//!
//! - `task`: task and owner identity types
//! - `queue`: arrival-ordered pending queue
//! - `estimator`: per-owner cost estimates and promising-prefix selection
//! - `trigger`: deduplicated one-shot wake-up registration
//! - `clock`: monotonic clock seam
//! - `reconciler`: runtime seam and the batch reentrancy window
//! - `executor`: frame state machine, batch primitive, bypass path
//! - `logging`: optional tracing bootstrap
//! - `error`: error taxonomy
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod estimator;
pub mod executor;
pub mod logging;
pub mod queue;
pub mod reconciler;
pub mod task;
pub mod trigger;

pub use clock::{Clock, MonotonicClock};
pub use error::{Error, Result};
pub use estimator::CostEstimator;
pub use executor::{
    BypassPredicate, FrameReport, FrameScheduler, SchedulerConfig, SchedulerStats,
    DEFAULT_FRAME_BUDGET_MS,
};
pub use queue::PendingQueue;
pub use reconciler::{ApplyCx, Reconciler};
pub use task::{ApplyFn, CompletionFn, OwnerId, Task};
pub use trigger::{FrameTrigger, WakeupSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
