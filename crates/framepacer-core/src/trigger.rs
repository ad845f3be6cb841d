//! Deduplicated one-shot wake-up registration.
//!
//! The host environment exposes a periodic wake-up primitive, nominally
//! aligned to the display refresh cadence (the scheduler assumes but never
//! enforces this; the frame budget is independent configuration). The
//! trigger guarantees at most one outstanding registration: N submissions
//! between two wake-ups produce exactly one frame callback. The pending
//! flag is cleared on frame entry, before any work runs, so execution can
//! arm a fresh request for the next cycle.

use tracing::trace;

/// Host wake-up primitive.
///
/// `request_frame` asks the host to deliver exactly one future call to
/// [`FrameScheduler::on_frame`](crate::executor::FrameScheduler::on_frame).
/// Implementations wrap whatever the platform offers (a display-link
/// callback, an event-loop timer). The trait enables testing with fakes.
pub trait WakeupSource {
    /// Register exactly one future wake-up.
    fn request_frame(&mut self);
}

/// Deduplicating latch in front of a [`WakeupSource`].
#[derive(Debug, Default)]
pub struct FrameTrigger {
    pending: bool,
    total_requests: u64,
    total_deduped: u64,
}

impl FrameTrigger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a wake-up unless one is already pending.
    ///
    /// Returns `true` if a new registration was made with the source.
    pub fn request(&mut self, source: &mut dyn WakeupSource) -> bool {
        if self.pending {
            self.total_deduped += 1;
            return false;
        }
        self.pending = true;
        self.total_requests += 1;
        trace!("wake-up requested");
        source.request_frame();
        true
    }

    /// Clear the pending flag. The executor calls this on frame entry,
    /// before the promising pass runs.
    pub fn acknowledge(&mut self) {
        self.pending = false;
    }

    /// Whether a wake-up is currently outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Registrations made with the source since creation.
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// Requests absorbed by an already-pending registration.
    #[must_use]
    pub fn total_deduped(&self) -> u64 {
        self.total_deduped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingSource {
        registered: u64,
    }

    impl WakeupSource for CountingSource {
        fn request_frame(&mut self) {
            self.registered += 1;
        }
    }

    #[test]
    fn first_request_registers() {
        let mut trigger = FrameTrigger::new();
        let mut source = CountingSource::default();
        assert!(trigger.request(&mut source));
        assert!(trigger.is_pending());
        assert_eq!(source.registered, 1);
    }

    #[test]
    fn repeat_requests_are_deduplicated() {
        let mut trigger = FrameTrigger::new();
        let mut source = CountingSource::default();
        trigger.request(&mut source);
        assert!(!trigger.request(&mut source));
        assert!(!trigger.request(&mut source));
        assert_eq!(source.registered, 1);
        assert_eq!(trigger.total_requests(), 1);
        assert_eq!(trigger.total_deduped(), 2);
    }

    #[test]
    fn acknowledge_allows_rearming() {
        let mut trigger = FrameTrigger::new();
        let mut source = CountingSource::default();
        trigger.request(&mut source);
        trigger.acknowledge();
        assert!(!trigger.is_pending());
        assert!(trigger.request(&mut source));
        assert_eq!(source.registered, 2);
    }
}
