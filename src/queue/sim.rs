//! Deterministic in-memory device queue for tests and examples.
//!
//! [`SimQueue`] models the device as a monotonically increasing completion
//! counter that tests advance manually with [`SimQueue::retire`]. Hangs
//! are injected with [`SimQueue::inject_hang`]; every blocking wait then
//! observes [`WaitStatus::GpuHang`]. Retirement-hook invocations and
//! flushes are recorded so tests can assert on them.
//!
//! Blocking waits spin until the counter catches up, so a test that
//! blocks must retire work first or from another thread.

use crate::config::EventConfig;
use crate::error::{Error, Result, WaitStatus};
use crate::event::Command;
use crate::profiling::{ClockSource, SimClock, TagPool, TimestampPacket};
use crate::queue::{DeviceQueue, QueueOwnership};
use crate::types::{CompletionStamp, FlushStamp, TaskCount, TaskLevel};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Simulated device queue.
#[derive(Debug)]
pub struct SimQueue {
    completed: AtomicU32,
    submitted: AtomicU32,
    task_level: AtomicU32,
    flush_count: AtomicU32,
    flush_stamp: AtomicU64,
    hang: AtomicBool,
    retired_calls: Mutex<Vec<TaskCount>>,
    ownership: Mutex<()>,
    pool: TagPool,
    clock: SimClock,
    config: EventConfig,
}

impl SimQueue {
    /// Creates a queue with the default configuration.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_config(EventConfig::default())
    }

    /// Creates a queue with an explicit configuration.
    #[must_use]
    pub fn with_config(config: EventConfig) -> Arc<Self> {
        Arc::new(Self {
            completed: AtomicU32::new(0),
            submitted: AtomicU32::new(0),
            task_level: AtomicU32::new(0),
            flush_count: AtomicU32::new(0),
            flush_stamp: AtomicU64::new(0),
            hang: AtomicBool::new(false),
            retired_calls: Mutex::new(Vec::new()),
            ownership: Mutex::new(()),
            pool: TagPool::new(),
            clock: SimClock::new(),
            config,
        })
    }

    /// Accepts one command into the stream, returning its stamp.
    pub fn submit_to_stream(&self, task_level: TaskLevel) -> Result<CompletionStamp> {
        if self.hang.load(Ordering::Acquire) {
            return Err(Error::gpu_hang());
        }
        let task_count = self.submitted.fetch_add(1, Ordering::AcqRel) + 1;
        self.task_level.fetch_add(1, Ordering::AcqRel);
        let flush_stamp = self.flush_stamp.fetch_add(1, Ordering::AcqRel) + 1;
        Ok(CompletionStamp {
            task_count,
            task_level,
            flush_stamp,
        })
    }

    /// Advances the completion counter by `count` retired operations.
    pub fn retire(&self, count: u32) {
        self.completed.fetch_add(count, Ordering::AcqRel);
    }

    /// Retires everything submitted so far.
    pub fn retire_all(&self) {
        self.completed
            .store(self.submitted.load(Ordering::Acquire), Ordering::Release);
    }

    /// Marks the device as hung; all subsequent waits report it.
    pub fn inject_hang(&self) {
        self.hang.store(true, Ordering::Release);
    }

    /// Number of flush calls observed.
    #[must_use]
    pub fn flush_count(&self) -> u32 {
        self.flush_count.load(Ordering::Acquire)
    }

    /// Task counts passed to the allocation-retirement hook, in order.
    #[must_use]
    pub fn retired_calls(&self) -> Vec<TaskCount> {
        self.retired_calls.lock().clone()
    }

    /// The simulated clock, for advancing time in tests.
    #[must_use]
    pub fn sim_clock(&self) -> &SimClock {
        &self.clock
    }
}

impl DeviceQueue for SimQueue {
    fn flush(&self) {
        self.flush_count.fetch_add(1, Ordering::AcqRel);
    }

    fn peek_task_count(&self) -> TaskCount {
        self.completed.load(Ordering::Acquire)
    }

    fn peek_task_level(&self) -> TaskLevel {
        self.task_level.load(Ordering::Acquire)
    }

    fn is_completed(&self, task_count: TaskCount) -> bool {
        task_count != crate::types::NOT_READY
            && self.completed.load(Ordering::Acquire) >= task_count
    }

    fn wait_until_complete(
        &self,
        task_count: TaskCount,
        _flush_stamp: FlushStamp,
        _quick_sleep: bool,
        timestamps_waited: bool,
    ) -> WaitStatus {
        loop {
            if self.hang.load(Ordering::Acquire) {
                return WaitStatus::GpuHang;
            }
            if timestamps_waited || self.is_completed(task_count) {
                return WaitStatus::Ready;
            }
            std::hint::spin_loop();
        }
    }

    fn wait_for_timestamps(&self, packets: &[Arc<TimestampPacket>]) -> bool {
        if !self.config.timestamp_wait_enabled || packets.is_empty() {
            return false;
        }
        packets.iter().all(|packet| packet.is_ready())
    }

    fn obtain_ownership(&self) -> QueueOwnership<'_> {
        QueueOwnership::new(self.ownership.lock())
    }

    fn retire_allocations(&self, task_count: TaskCount) {
        self.retired_calls.lock().push(task_count);
    }

    fn clock(&self) -> &dyn ClockSource {
        &self.clock
    }

    fn config(&self) -> &EventConfig {
        &self.config
    }

    fn timestamp_pool(&self) -> &TagPool {
        &self.pool
    }
}

/// A command that lands on a [`SimQueue`] when submitted.
#[derive(Debug)]
pub struct SimCommand {
    queue: Arc<SimQueue>,
}

impl SimCommand {
    /// Creates a command bound to `queue`.
    #[must_use]
    pub fn new(queue: Arc<SimQueue>) -> Self {
        Self { queue }
    }
}

impl Command for SimCommand {
    fn submit(&mut self, task_level: TaskLevel, abort: bool) -> Result<CompletionStamp> {
        if abort {
            // Aborted commands release their resources without enqueuing
            // new work; the stamp reflects the current device state.
            return Ok(CompletionStamp {
                task_count: self.queue.peek_task_count(),
                task_level,
                flush_stamp: self.queue.flush_stamp.load(Ordering::Acquire),
            });
        }
        self.queue.submit_to_stream(task_level)
    }
}
