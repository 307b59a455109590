//! Core value types for the completion-tracking engine.
//!
//! These types carry the completion protocol between an [`Event`](crate::event::Event)
//! and its owning device queue:
//!
//! - [`TaskCount`]: monotonically increasing completion token
//! - [`TaskLevel`]: logical ordinal among dependent operations
//! - [`FlushStamp`] / [`FlushStampTracker`]: opaque submission-batch token
//! - [`CompletionStamp`]: the triple returned by command submission
//!
//! Both `TaskCount` and `TaskLevel` start at the [`NOT_READY`] sentinel and
//! move to a concrete value at most once, under exclusive queue ownership.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod status;

pub use status::{AtomicExecutionStatus, CallbackTarget, ExecutionStatus, TerminationReason};

/// Completion token: the device counter value at which an operation retires.
pub type TaskCount = u32;

/// Logical ordinal of an operation in submission order.
///
/// Independent of the physical [`TaskCount`]; used to propagate
/// happens-after ordering through the dependency graph.
pub type TaskLevel = u32;

/// Sentinel for an unresolved task count or task level.
pub const NOT_READY: u32 = u32::MAX;

/// Opaque ordering token identifying a flushed submission batch.
pub type FlushStamp = u64;

/// Tracks the newest flush stamp observed for an event.
///
/// Stamps only move forward: [`set_stamp`](Self::set_stamp) merges by
/// maximum, so a stale submission thread can never regress the token.
#[derive(Debug, Default)]
pub struct FlushStampTracker {
    stamp: AtomicU64,
}

impl FlushStampTracker {
    /// Creates a tracker with no stamp recorded yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stamp: AtomicU64::new(0),
        }
    }

    /// Returns the newest stamp observed so far.
    #[must_use]
    pub fn peek_stamp(&self) -> FlushStamp {
        self.stamp.load(Ordering::Acquire)
    }

    /// Records `stamp`, keeping the maximum of the current and new values.
    pub fn set_stamp(&self, stamp: FlushStamp) {
        self.stamp.fetch_max(stamp, Ordering::AcqRel);
    }
}

/// The result of submitting a command: where in the stream it landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionStamp {
    /// Device counter value at which the command retires.
    pub task_count: TaskCount,
    /// Logical position of the command in submission order.
    pub task_level: TaskLevel,
    /// Batch token corroborating that the command was flushed.
    pub flush_stamp: FlushStamp,
}

impl CompletionStamp {
    /// A stamp with everything unresolved; useful as a starting point.
    pub const NOT_READY: Self = Self {
        task_count: NOT_READY,
        task_level: NOT_READY,
        flush_stamp: 0,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_stamp_only_moves_forward() {
        let tracker = FlushStampTracker::new();
        tracker.set_stamp(5);
        assert_eq!(tracker.peek_stamp(), 5);
        tracker.set_stamp(3);
        assert_eq!(tracker.peek_stamp(), 5);
        tracker.set_stamp(9);
        assert_eq!(tracker.peek_stamp(), 9);
    }

    #[test]
    fn not_ready_is_max() {
        assert_eq!(NOT_READY, u32::MAX);
        assert_eq!(CompletionStamp::NOT_READY.task_count, NOT_READY);
    }
}
