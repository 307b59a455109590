//! Syncpoint: completion tracking for asynchronous device work.
//!
//! # Overview
//!
//! Syncpoint models each submitted operation as an [`Event`] that moves
//! through `Queued → Submitted → Running → Complete`, with any state able
//! to jump to an abnormal termination. Completion is judged against the
//! owning queue's monotonically increasing task counter, events form a
//! producer→consumer dependency graph that propagates unblocking and
//! termination, and completed events can reconcile device timestamp
//! ticks into wall-clock profiling data.
//!
//! # Core Guarantees
//!
//! - **Monotonic status**: an event's status only advances toward
//!   completion, never regresses, under any interleaving
//! - **Set-once completion stamps**: task count and task level move from
//!   unresolved to a concrete value at most once
//! - **Ordered causality**: a consumer's task level exceeds every
//!   producer's, regardless of retirement order
//! - **Exactly-once callbacks**: every registered callback fires exactly
//!   once before its event is destroyed
//! - **Hang containment**: a device hang terminates dependents and wait
//!   lists instead of hanging the caller
//!
//! # Module Structure
//!
//! - [`types`]: status ranks, completion stamps, flush stamps
//! - [`config`]: per-context behavior flags
//! - [`error`]: error kinds and wait status
//! - [`queue`]: the device queue abstraction and a simulated queue
//! - [`event`]: the event entity, dependency graph, and callbacks
//! - [`profiling`]: timestamp packets, pools, and reconciliation
//! - [`wait`]: batched multi-event waiting
//! - [`test_utils`]: logging and fixture helpers for tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod event;
pub mod profiling;
pub mod queue;
pub mod test_utils;
pub mod tracing_compat;
pub mod types;
pub mod wait;

// Re-exports for convenient access to core types
pub use config::EventConfig;
pub use error::{Error, ErrorKind, Result, WaitStatus};
pub use event::{Command, Event};
pub use profiling::{ProfilingInfo, ProfilingMilestone};
pub use queue::DeviceQueue;
pub use types::{
    CompletionStamp, ExecutionStatus, FlushStamp, TaskCount, TaskLevel, TerminationReason,
    NOT_READY,
};
pub use wait::wait_for_events;
