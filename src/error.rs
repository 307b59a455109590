//! Error types and wait results.
//!
//! The engine distinguishes three kinds of outcome:
//!
//! - [`WaitStatus::NotReady`] is transient and expected for non-blocking
//!   polls. It is a wait status, never an [`Error`].
//! - [`ErrorKind::GpuHang`] is fatal for the affected work, never retried,
//!   and propagated to every transitively dependent event.
//! - Programming errors (double-setting a command, unknown callback
//!   milestone) are signaled with debug assertions plus a typed error so
//!   release builds fail fast at the call site instead of corrupting state.

use core::fmt;

/// The three-valued result of waiting on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// The work has retired on the device.
    Ready,
    /// Not finished yet; only returned by non-blocking waits.
    NotReady,
    /// The device reported an unrecoverable error. Never retried.
    GpuHang,
}

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The device hung while executing the affected submission.
    GpuHang,
    /// An event in a wait list is in an error state or hung mid-drain.
    WaitListFailed,
    /// Profiling data was queried on a user event, an incomplete event,
    /// or an event created without profiling enabled.
    ProfilingNotAvailable,
    /// A command was attached to an event that already has one.
    CommandAlreadySet,
    /// A callback was registered against a status with no milestone target.
    InvalidCallbackMilestone,
    /// Internal engine bug or invalid state.
    Internal,
}

impl ErrorKind {
    /// Whether the condition can clear on retry.
    ///
    /// Nothing in this taxonomy is retryable: transient conditions are
    /// modeled as [`WaitStatus::NotReady`], not as errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }

    /// Whether the error indicates a caller contract violation.
    #[must_use]
    pub const fn is_programming_error(&self) -> bool {
        matches!(self, Self::CommandAlreadySet | Self::InvalidCallbackMilestone)
    }

    /// Short static name for the kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GpuHang => "gpu-hang",
            Self::WaitListFailed => "wait-list-failed",
            Self::ProfilingNotAvailable => "profiling-not-available",
            Self::CommandAlreadySet => "command-already-set",
            Self::InvalidCallbackMilestone => "invalid-callback-milestone",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An engine error: a kind plus a static context message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

impl Error {
    /// Creates an error with the given kind and context message.
    #[must_use]
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    /// The device hung.
    #[must_use]
    pub const fn gpu_hang() -> Self {
        Self::new(ErrorKind::GpuHang, "device reported an unrecoverable hang")
    }

    /// A wait list failed mid-drain.
    #[must_use]
    pub const fn wait_list_failed() -> Self {
        Self::new(
            ErrorKind::WaitListFailed,
            "an event in the wait list is in an error state",
        )
    }

    /// Profiling data is not available for this event.
    #[must_use]
    pub const fn profiling_not_available() -> Self {
        Self::new(
            ErrorKind::ProfilingNotAvailable,
            "profiling data not recorded for this event",
        )
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the context message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.message
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_is_retryable() {
        for kind in [
            ErrorKind::GpuHang,
            ErrorKind::WaitListFailed,
            ErrorKind::ProfilingNotAvailable,
            ErrorKind::CommandAlreadySet,
            ErrorKind::InvalidCallbackMilestone,
            ErrorKind::Internal,
        ] {
            assert!(!kind.is_retryable());
        }
    }

    #[test]
    fn programming_errors_are_classified() {
        assert!(ErrorKind::CommandAlreadySet.is_programming_error());
        assert!(ErrorKind::InvalidCallbackMilestone.is_programming_error());
        assert!(!ErrorKind::GpuHang.is_programming_error());
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = Error::gpu_hang();
        let text = err.to_string();
        assert!(text.contains("gpu-hang"));
    }
}
