//! Execution status: the event state machine's observable value.
//!
//! Status is a tagged enum with an explicit ordering function
//! [`ExecutionStatus::rank`]. Non-negative ranks order the happy path
//! (`Complete < Running < Submitted < Queued`, completion is reached by
//! counting *down*); negative ranks are termination reasons. The atomic
//! wrapper [`AtomicExecutionStatus`] applies the monotonic-decrease rule:
//! a transition only wins if it advances further toward completion than
//! the current snapshot, so out-of-order updates may leapfrog but never
//! regress.

use core::fmt;
use std::sync::atomic::{AtomicI32, Ordering};

/// Why an event terminated abnormally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationReason {
    /// Aborted at destruction before completing.
    Aborted,
    /// The device reported an unrecoverable hang.
    GpuHang,
    /// Caller-supplied negative status code (user events).
    Code(i32),
}

impl TerminationReason {
    /// Returns the negative rank encoding this reason.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Aborted => -1,
            Self::GpuHang => -2,
            Self::Code(code) => code,
        }
    }

    /// Decodes a negative rank back into a reason.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            -1 => Self::Aborted,
            -2 => Self::GpuHang,
            other => Self::Code(other),
        }
    }
}

/// The execution status of an event.
///
/// Ordered by [`rank`](Self::rank); an event only ever moves toward
/// `Complete` or a `Terminated` code, never backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionStatus {
    /// All work for the event has retired on the device.
    Complete,
    /// The device is executing the event's command.
    Running,
    /// The command was handed to the device stream.
    Submitted,
    /// Enqueued but not yet submitted (possibly blocked by parents).
    Queued,
    /// Abnormal termination; short-circuits all milestone propagation.
    Terminated(TerminationReason),
}

impl ExecutionStatus {
    /// The signed ordering value for this status.
    ///
    /// `Complete=0 < Running=1 < Submitted=2 < Queued=3`; terminations are
    /// negative. Lower rank means further along.
    #[must_use]
    pub const fn rank(self) -> i32 {
        match self {
            Self::Complete => 0,
            Self::Running => 1,
            Self::Submitted => 2,
            Self::Queued => 3,
            Self::Terminated(reason) => reason.code(),
        }
    }

    /// Decodes a rank produced by [`rank`](Self::rank).
    #[must_use]
    pub const fn from_rank(rank: i32) -> Self {
        match rank {
            0 => Self::Complete,
            1 => Self::Running,
            2 => Self::Submitted,
            3 => Self::Queued,
            negative => Self::Terminated(TerminationReason::from_code(negative)),
        }
    }

    /// True for `Complete` and any termination (rank <= 0).
    #[must_use]
    pub const fn is_completed(self) -> bool {
        self.rank() <= 0
    }

    /// True only for abnormal termination (rank < 0).
    #[must_use]
    pub const fn is_terminated(self) -> bool {
        self.rank() < 0
    }

    /// True once the event reached `Submitted` or further.
    #[must_use]
    pub const fn is_submitted_or_later(self) -> bool {
        self.rank() <= Self::Submitted.rank()
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Running => write!(f, "running"),
            Self::Submitted => write!(f, "submitted"),
            Self::Queued => write!(f, "queued"),
            Self::Terminated(reason) => write!(f, "terminated({})", reason.code()),
        }
    }
}

/// Lock-free status cell enforcing monotonic decrease.
#[derive(Debug)]
pub struct AtomicExecutionStatus {
    rank: AtomicI32,
}

impl AtomicExecutionStatus {
    /// Creates a cell holding `status`.
    #[must_use]
    pub fn new(status: ExecutionStatus) -> Self {
        Self {
            rank: AtomicI32::new(status.rank()),
        }
    }

    /// Returns the current status snapshot.
    #[must_use]
    pub fn load(&self) -> ExecutionStatus {
        ExecutionStatus::from_rank(self.rank.load(Ordering::Acquire))
    }

    /// Applies `new` only if it advances past the current snapshot.
    ///
    /// CAS loop: retries while the current rank is strictly greater than
    /// `new.rank()`. An update arriving out of order only wins if it moves
    /// further toward completion; a stale lesser update is dropped. Returns
    /// whether the transition was applied.
    pub fn transition(&self, new: ExecutionStatus) -> bool {
        let new_rank = new.rank();
        let mut current = self.rank.load(Ordering::Acquire);
        while current > new_rank {
            match self.rank.compare_exchange_weak(
                current,
                new_rank,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
        false
    }
}

/// Callback milestone targets, in drain order.
///
/// `Queued` has no externally visible callback target; registration is
/// limited to these three, and a drain for milestone `m` covers every
/// target at index `<= m as usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CallbackTarget {
    /// Fired when the command is handed to the device stream.
    Submitted = 0,
    /// Fired when the device starts executing the command.
    Running = 1,
    /// Fired when all work for the event has retired.
    Completed = 2,
}

impl CallbackTarget {
    /// Number of distinct targets.
    pub const COUNT: usize = 3;

    /// The milestone status this target corresponds to.
    #[must_use]
    pub const fn milestone(self) -> ExecutionStatus {
        match self {
            Self::Submitted => ExecutionStatus::Submitted,
            Self::Running => ExecutionStatus::Running,
            Self::Completed => ExecutionStatus::Complete,
        }
    }
}

impl TryFrom<ExecutionStatus> for CallbackTarget {
    type Error = ();

    fn try_from(status: ExecutionStatus) -> Result<Self, ()> {
        match status {
            ExecutionStatus::Submitted => Ok(Self::Submitted),
            ExecutionStatus::Running => Ok(Self::Running),
            ExecutionStatus::Complete => Ok(Self::Completed),
            ExecutionStatus::Queued | ExecutionStatus::Terminated(_) => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_round_trips() {
        for status in [
            ExecutionStatus::Complete,
            ExecutionStatus::Running,
            ExecutionStatus::Submitted,
            ExecutionStatus::Queued,
            ExecutionStatus::Terminated(TerminationReason::GpuHang),
            ExecutionStatus::Terminated(TerminationReason::Code(-42)),
        ] {
            assert_eq!(ExecutionStatus::from_rank(status.rank()), status);
        }
    }

    #[test]
    fn transition_never_regresses() {
        let cell = AtomicExecutionStatus::new(ExecutionStatus::Queued);
        assert!(cell.transition(ExecutionStatus::Submitted));
        assert!(cell.transition(ExecutionStatus::Complete));
        // Running would be a regression from Complete.
        assert!(!cell.transition(ExecutionStatus::Running));
        assert_eq!(cell.load(), ExecutionStatus::Complete);
    }

    #[test]
    fn transition_leapfrogs_to_terminated() {
        let cell = AtomicExecutionStatus::new(ExecutionStatus::Submitted);
        assert!(cell.transition(ExecutionStatus::Terminated(TerminationReason::GpuHang)));
        // A late Complete must not overwrite the termination.
        assert!(!cell.transition(ExecutionStatus::Complete));
        assert!(cell.load().is_terminated());
    }

    #[test]
    fn queued_has_no_callback_target() {
        assert!(CallbackTarget::try_from(ExecutionStatus::Queued).is_err());
        assert_eq!(
            CallbackTarget::try_from(ExecutionStatus::Complete),
            Ok(CallbackTarget::Completed)
        );
    }
}
