//! The device-queue interface the engine consumes.
//!
//! The engine does not own submission or hang detection; it consumes this
//! narrow surface from the execution context that created each event. The
//! queue guarantees the completion counter read through
//! [`DeviceQueue::peek_task_count`] is monotonically increasing, and that
//! [`DeviceQueue::obtain_ownership`] provides the exclusive window under
//! which task counts and flush stamps are published (submission and
//! residency bookkeeping are not individually atomic).
//!
//! [`sim::SimQueue`] is the deterministic in-memory implementation used by
//! tests and documentation examples.

use crate::config::EventConfig;
use crate::error::WaitStatus;
use crate::profiling::{ClockSource, TagPool, TimestampPacket};
use crate::types::{FlushStamp, TaskCount, TaskLevel};
use std::sync::Arc;

pub mod sim;

pub use sim::{SimCommand, SimQueue};

/// Scoped exclusive ownership of a queue.
///
/// Held across command submission so that task-count publication and
/// residency bookkeeping observe a consistent queue state.
#[must_use = "ownership is released when the guard drops"]
pub struct QueueOwnership<'a> {
    _guard: parking_lot::MutexGuard<'a, ()>,
}

impl<'a> QueueOwnership<'a> {
    /// Wraps a raw lock guard.
    pub fn new(guard: parking_lot::MutexGuard<'a, ()>) -> Self {
        Self { _guard: guard }
    }
}

/// The owning execution context of an event.
pub trait DeviceQueue: Send + Sync {
    /// Flushes batched submissions to the device.
    fn flush(&self);

    /// Current device completion counter.
    fn peek_task_count(&self) -> TaskCount;

    /// Current logical task level of the queue.
    fn peek_task_level(&self) -> TaskLevel;

    /// Whether work stamped with `task_count` has retired.
    fn is_completed(&self, task_count: TaskCount) -> bool;

    /// Blocks until the counter reaches `task_count` or the device hangs.
    ///
    /// `timestamps_waited` indicates the timestamp fast path already
    /// observed completion, letting the queue skip the kernel-level wait.
    fn wait_until_complete(
        &self,
        task_count: TaskCount,
        flush_stamp: FlushStamp,
        quick_sleep: bool,
        timestamps_waited: bool,
    ) -> WaitStatus;

    /// Timestamp fast path: polls device-written timestamp memory.
    ///
    /// Returns true when every packet has been written, meaning the work
    /// is complete without consulting the kernel.
    fn wait_for_timestamps(&self, packets: &[Arc<TimestampPacket>]) -> bool;

    /// Takes scoped exclusive ownership of the queue.
    fn obtain_ownership(&self) -> QueueOwnership<'_>;

    /// Releases temporary and deferred allocations retired at `task_count`.
    fn retire_allocations(&self, task_count: TaskCount);

    /// The timing source for profiling reconciliation.
    fn clock(&self) -> &dyn ClockSource;

    /// The configuration events on this queue were created with.
    fn config(&self) -> &EventConfig;

    /// The ring of reusable timestamp tags.
    fn timestamp_pool(&self) -> &TagPool;
}
