//! Error types for framepacer-core.

use thiserror::Error;

/// Result type alias using the library's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for framepacer-core.
#[derive(Error, Debug)]
pub enum Error {
    /// The pending queue was empty when a task was requested.
    ///
    /// Defensive: the frame executor checks queue length before every
    /// dequeue, so reaching this indicates a scheduler bug.
    #[error("pending queue is empty")]
    EmptyQueue,

    /// The external reconciler failed while flushing a batch.
    ///
    /// Fatal for the current wake-up: no partial-progress recovery, no
    /// retry. See [`FrameScheduler::on_frame`](crate::executor::FrameScheduler::on_frame)
    /// for the re-arming consequences.
    #[error("reconciler flush failed: {0}")]
    Flush(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(Error::EmptyQueue.to_string(), "pending queue is empty");
        assert_eq!(
            Error::Flush("layout pass panicked".to_string()).to_string(),
            "reconciler flush failed: layout pass panicked"
        );
    }
}
