//! The event entity: one asynchronous operation and its lifecycle.
//!
//! An [`Event`] tracks a unit of submitted device work through
//! `Queued → Submitted → Running → Complete`, with any state able to jump
//! to `Terminated(reason)`. Status is a lock-free CAS cell
//! ([`AtomicExecutionStatus`]) because it gates hot-path polling; every
//! other mutable structure is a short-held lock detached before iteration.
//!
//! Events are shared-ownership (`Arc<Event>`): the application thread, a
//! completion-polling thread, and any thread waiting on a dependent event
//! may all hold references, and destruction can happen from any of them.
//! Drop performs the final duties: flush a still-pending command, flush
//! the owning queue if encoded work never finished, force termination if
//! not complete, fire remaining callbacks, return the timestamp tag to
//! its pool, and propagate final status to children.
//!
//! # Blocking
//!
//! [`Event::wait`] is the only long-blocking operation; it defers to the
//! owning queue's completion primitive. The initial spin on an unresolved
//! task count is a deliberate narrow contract: resolution happens
//! synchronously inside the submission path, so no cross-thread wait can
//! observe `NOT_READY` for more than a few instructions.

use crate::config::EventConfig;
use crate::error::{Error, ErrorKind, Result, WaitStatus};
use crate::profiling::{
    boundary_values, ProfilingMilestone, ProfilingSnapshots, TimestampPacket,
};
use crate::queue::DeviceQueue;
use crate::tracing_compat::{debug, trace};
use crate::types::{
    AtomicExecutionStatus, CompletionStamp, ExecutionStatus, FlushStamp, FlushStampTracker,
    TaskCount, TaskLevel, TerminationReason, NOT_READY,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

pub mod callback;
pub mod graph;

pub(crate) use callback::CallbackLists;

/// A command attached to an event, submitted when the event advances to
/// `Submitted`.
///
/// `abort` requests resource release without enqueuing new work (used on
/// termination and destruction paths). A hang at submit time surfaces as
/// [`ErrorKind::GpuHang`](crate::error::ErrorKind::GpuHang).
pub trait Command: Send {
    /// Hands the command to the device stream.
    fn submit(&mut self, task_level: TaskLevel, abort: bool) -> Result<CompletionStamp>;
}

/// Where an event's task level comes from when unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    /// Bound to a queue; resolves from the queue's task level.
    Normal,
    /// User-created; no queue, resolves to level zero.
    User,
}

/// One asynchronous operation: status, completion protocol, dependency
/// edges, callbacks, and profiling snapshots.
pub struct Event {
    kind: EventKind,
    queue: Option<Arc<dyn DeviceQueue>>,
    config: EventConfig,
    profiling_enabled: bool,

    status: AtomicExecutionStatus,
    task_level: AtomicU32,
    task_count: AtomicU32,
    flush_stamp: FlushStampTracker,
    gpu_state_waited: AtomicBool,

    parent_count: AtomicU32,
    children: Mutex<Vec<Arc<Event>>>,
    parents: Mutex<Vec<Weak<Event>>>,

    callbacks: CallbackLists,

    command: Mutex<Option<Box<dyn Command>>>,
    submitted_command: Mutex<Option<Box<dyn Command>>>,
    without_command: AtomicBool,

    timestamp_packets: Mutex<Vec<Arc<TimestampPacket>>>,
    hw_timestamp: Mutex<Option<Arc<TimestampPacket>>>,
    profiling: Mutex<ProfilingSnapshots>,
}

impl Event {
    /// Creates an event bound to `queue`, with an unresolved completion
    /// stamp. The event holds its queue reference for its whole life.
    #[must_use]
    pub fn new(queue: Arc<dyn DeviceQueue>) -> Arc<Self> {
        Self::with_completion(queue, NOT_READY, NOT_READY)
    }

    /// Creates an event bound to `queue` with an explicit task level and
    /// task count (used when the operation was already encoded).
    #[must_use]
    pub fn with_completion(
        queue: Arc<dyn DeviceQueue>,
        task_level: TaskLevel,
        task_count: TaskCount,
    ) -> Arc<Self> {
        let config = *queue.config();
        let profiling_enabled = config.profiling_enabled;
        let event = Self::build(
            EventKind::Normal,
            Some(queue),
            config,
            profiling_enabled,
            task_level,
            task_count,
            ExecutionStatus::Queued,
        );
        if profiling_enabled {
            event.record_queued_timestamp();
        }
        trace!(status = %event.peek_status(), "event created");
        event
    }

    /// Creates a user event: no queue, no command, completion driven
    /// entirely by [`set_status`](Self::set_status).
    ///
    /// User events report `Submitted` on creation.
    #[must_use]
    pub fn new_user(config: EventConfig) -> Arc<Self> {
        Self::build(
            EventKind::User,
            None,
            config,
            false,
            NOT_READY,
            NOT_READY,
            ExecutionStatus::Submitted,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        kind: EventKind,
        queue: Option<Arc<dyn DeviceQueue>>,
        config: EventConfig,
        profiling_enabled: bool,
        task_level: TaskLevel,
        task_count: TaskCount,
        status: ExecutionStatus,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            queue,
            config,
            profiling_enabled,
            status: AtomicExecutionStatus::new(status),
            task_level: AtomicU32::new(task_level),
            task_count: AtomicU32::new(task_count),
            flush_stamp: FlushStampTracker::new(),
            gpu_state_waited: AtomicBool::new(false),
            parent_count: AtomicU32::new(0),
            children: Mutex::new(Vec::new()),
            parents: Mutex::new(Vec::new()),
            callbacks: CallbackLists::new(),
            command: Mutex::new(None),
            submitted_command: Mutex::new(None),
            without_command: AtomicBool::new(true),
            timestamp_packets: Mutex::new(Vec::new()),
            hw_timestamp: Mutex::new(None),
            profiling: Mutex::new(ProfilingSnapshots::default()),
        })
    }

    // === Accessors ===

    /// Current status snapshot.
    #[must_use]
    pub fn peek_status(&self) -> ExecutionStatus {
        self.status.load()
    }

    /// Current task count; [`NOT_READY`] until submission resolves it.
    #[must_use]
    pub fn peek_task_count(&self) -> TaskCount {
        self.task_count.load(Ordering::Acquire)
    }

    /// Current task level; [`NOT_READY`] until the operation is encoded.
    #[must_use]
    pub fn peek_task_level(&self) -> TaskLevel {
        self.task_level.load(Ordering::Acquire)
    }

    /// Newest flush stamp observed for this event.
    #[must_use]
    pub fn peek_flush_stamp(&self) -> FlushStamp {
        self.flush_stamp.peek_stamp()
    }

    /// Whether this is a user event (no queue, no command).
    #[must_use]
    pub fn is_user_event(&self) -> bool {
        self.kind == EventKind::User
    }

    /// Whether unfinished producers still block this event.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.parent_count.load(Ordering::Acquire) > 0
    }

    /// Number of unfinished producers.
    #[must_use]
    pub fn parent_count(&self) -> u32 {
        self.parent_count.load(Ordering::Acquire)
    }

    /// Whether the task level is resolved, i.e. the operation was encoded.
    #[must_use]
    pub fn is_ready_for_submission(&self) -> bool {
        self.peek_task_level() != NOT_READY
    }

    /// The owning queue, if any.
    #[must_use]
    pub fn queue(&self) -> Option<&Arc<dyn DeviceQueue>> {
        self.queue.as_ref()
    }

    /// The configuration this event was created with.
    #[must_use]
    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    /// Whether profiling timestamps are recorded for this event.
    #[must_use]
    pub fn is_profiling_enabled(&self) -> bool {
        self.profiling_enabled
    }

    pub(crate) fn is_without_command(&self) -> bool {
        self.without_command.load(Ordering::Acquire)
    }

    // === Completion protocol ===

    /// Attaches the command to submit when this event advances.
    ///
    /// Double-setting is a caller contract violation.
    pub fn set_command(&self, command: Box<dyn Command>) -> Result<()> {
        let mut slot = self.command.lock();
        if slot.is_some() {
            debug_assert!(false, "event already has a command");
            return Err(Error::new(
                ErrorKind::CommandAlreadySet,
                "event already has a command attached",
            ));
        }
        *slot = Some(command);
        self.without_command.store(false, Ordering::Release);
        Ok(())
    }

    /// Publishes the completion stamp for this event.
    ///
    /// Called by the submitting thread under queue ownership; each field
    /// moves from `NOT_READY` to a concrete value at most once.
    pub fn update_completion_stamp(
        &self,
        task_count: TaskCount,
        task_level: TaskLevel,
        flush_stamp: FlushStamp,
    ) {
        self.update_task_count(task_count);
        self.task_level.store(task_level, Ordering::Release);
        self.flush_stamp.set_stamp(flush_stamp);
    }

    pub(crate) fn update_task_count(&self, task_count: TaskCount) {
        let previous = self.task_count.swap(task_count, Ordering::AcqRel);
        debug_assert!(
            previous == NOT_READY || previous == task_count,
            "task count set twice: {previous} -> {task_count}"
        );
    }

    // === State machine ===

    /// Lock-free monotonic status decrease; see
    /// [`AtomicExecutionStatus::transition`].
    pub fn transition_status(&self, new: ExecutionStatus) -> bool {
        let applied = self.status.transition(new);
        if applied {
            trace!(status = %new, "status transition");
        }
        applied
    }

    /// Opportunistically advances the event as far as current device
    /// state allows, firing callbacks and unblocking children on the way.
    ///
    /// Invoked on wait, on callback registration, and at destruction.
    pub fn update_execution_status(&self) {
        let snapshot = self.status.load();
        if snapshot.is_completed() {
            self.execute_callbacks(snapshot);
            return;
        }

        if self.is_blocked() {
            self.transition_status(ExecutionStatus::Queued);
            self.execute_callbacks(ExecutionStatus::Queued);
            return;
        }

        if self.peek_task_level() == NOT_READY {
            // Not yet encoded; nothing can advance.
            return;
        }

        if snapshot == ExecutionStatus::Queued {
            self.submit_command(false);
            self.transition_status(ExecutionStatus::Submitted);
            self.execute_callbacks(ExecutionStatus::Submitted);
            // Children may submit as soon as their producer is submitted;
            // they need not wait for full completion.
            self.unblock_children(ExecutionStatus::Submitted);
        }

        if self.queue.is_some() && self.check_device_completed() {
            self.transition_status(ExecutionStatus::Complete);
            self.execute_callbacks(ExecutionStatus::Complete);
            self.unblock_children(ExecutionStatus::Complete);
            if let Some(queue) = &self.queue {
                queue.retire_allocations(self.peek_task_count());
            }
            return;
        }

        self.transition_status(ExecutionStatus::Submitted);
    }

    /// Explicitly forces a status (user events, abort paths).
    ///
    /// Rejected if the event is already terminal, the status is unchanged,
    /// or the event is blocked and the new status is not a termination.
    /// Returns whether the change was applied.
    pub fn set_status(&self, status: ExecutionStatus) -> bool {
        let previous = self.status.load();
        debug!(new = %status, previous = %previous, "set_status");
        if previous.is_completed() {
            return false;
        }
        if status == previous {
            return false;
        }
        if self.is_blocked() && !status.is_terminated() {
            return false;
        }

        if status == ExecutionStatus::Submitted || status.is_completed() {
            self.submit_command(status.is_terminated());
        }
        self.transition_status(status);
        if status.is_completed() || status == ExecutionStatus::Submitted {
            self.unblock_children(status);
        }
        self.execute_callbacks(status);
        true
    }

    /// Forces abnormal termination with `reason` and propagates it to all
    /// children regardless of their own parent counts.
    pub fn abort(&self, reason: TerminationReason) {
        self.set_status(ExecutionStatus::Terminated(reason));
    }

    /// Runs [`update_execution_status`](Self::update_execution_status) and
    /// reports whether the event is now completed (or terminated).
    pub fn update_status_and_check_completion(&self) -> bool {
        self.update_execution_status();
        self.status.load().is_completed()
    }

    /// Takes the pending command (if any) and hands it to the device
    /// under exclusive queue ownership.
    pub(crate) fn submit_command(&self, abort: bool) {
        let taken = self.command.lock().take();
        if let Some(mut command) = taken {
            if let Some(queue) = &self.queue {
                let mut hang = false;
                {
                    let _ownership = queue.obtain_ownership();
                    if self.profiling_enabled {
                        let clock = queue.clock();
                        let sample = clock.correlated_time();
                        self.profiling
                            .lock()
                            .anchor_submit(sample, clock.timer_resolution());
                    }
                    match command.submit(self.peek_task_level(), abort) {
                        Ok(stamp) => {
                            self.update_task_count(stamp.task_count);
                            self.flush_stamp.set_stamp(stamp.flush_stamp);
                            *self.submitted_command.lock() = Some(command);
                        }
                        Err(_) => hang = true,
                    }
                }
                if hang {
                    self.abort(TerminationReason::GpuHang);
                    return;
                }
            }
        }

        // Events without a command still need a task count: snapshot the
        // queue counter so completion can be judged.
        if self.peek_task_count() == NOT_READY && !self.is_user_event() && self.is_without_command()
        {
            if let Some(queue) = &self.queue {
                let _ownership = queue.obtain_ownership();
                self.update_task_count(queue.peek_task_count());
            }
        }
    }

    /// Whether the device retired this event's work, via the completion
    /// counter or the timestamp fast path. Memoized once observed.
    pub(crate) fn check_device_completed(&self) -> bool {
        if self.gpu_state_waited.load(Ordering::Acquire) {
            return true;
        }
        let Some(queue) = &self.queue else {
            return false;
        };
        if queue.is_completed(self.peek_task_count()) || self.timestamps_completed() {
            self.gpu_state_waited.store(true, Ordering::Release);
        }
        self.gpu_state_waited.load(Ordering::Acquire)
    }

    fn timestamps_completed(&self) -> bool {
        if !self.config.timestamp_wait_enabled {
            return false;
        }
        let packets = self.timestamp_packets.lock();
        !packets.is_empty() && packets.iter().all(|packet| packet.is_ready())
    }

    // === Waiting ===

    /// Waits for this event's work to retire.
    ///
    /// Non-blocking calls return [`WaitStatus::NotReady`] if the task
    /// count is unresolved or (for user events) status is not completed.
    /// Blocking calls spin on the unresolved count: resolution happens
    /// synchronously inside the submission path, so the window is a few
    /// instructions, never a long-duration spin. [`WaitStatus::GpuHang`]
    /// is propagated, never retried.
    pub fn wait(&self, blocking: bool, quick_sleep: bool) -> WaitStatus {
        if self.is_user_event() {
            loop {
                if self.update_status_and_check_completion() {
                    return WaitStatus::Ready;
                }
                if !blocking {
                    return WaitStatus::NotReady;
                }
                std::hint::spin_loop();
            }
        }

        while self.peek_task_count() == NOT_READY {
            if !blocking {
                return WaitStatus::NotReady;
            }
            std::hint::spin_loop();
        }

        let Some(queue) = &self.queue else {
            return WaitStatus::Ready;
        };

        let packets = self.timestamp_packets.lock().clone();
        let timestamps_waited = queue.wait_for_timestamps(&packets);
        let status = queue.wait_until_complete(
            self.peek_task_count(),
            self.flush_stamp.peek_stamp(),
            quick_sleep,
            timestamps_waited,
        );
        if status == WaitStatus::GpuHang {
            return WaitStatus::GpuHang;
        }

        self.gpu_state_waited.store(true, Ordering::Release);
        self.update_execution_status();
        queue.retire_allocations(self.peek_task_count());
        WaitStatus::Ready
    }

    /// Flushes the owning queue if this event is incomplete and encoded.
    pub fn try_flush(&self) {
        if self.update_status_and_check_completion() {
            return;
        }
        if let Some(queue) = &self.queue {
            if self.peek_task_level() != NOT_READY {
                queue.flush();
            }
        }
    }

    // === Profiling ===

    fn record_queued_timestamp(&self) {
        if let Some(queue) = &self.queue {
            self.profiling
                .lock()
                .record_queued(queue.clock().cpu_time_ns());
        }
    }

    /// Associates device-written timestamp packets with this event.
    pub fn add_timestamp_packets(&self, packets: &[Arc<TimestampPacket>]) {
        self.timestamp_packets
            .lock()
            .extend(packets.iter().cloned());
    }

    /// Lazily acquires this event's hardware timestamp tag from the
    /// queue's pool. Double-checked so concurrent callers agree on one
    /// tag; the loser's acquisition is returned to the pool.
    pub fn hw_timestamp_tag(&self) -> Option<Arc<TimestampPacket>> {
        let queue = self.queue.as_ref()?;
        {
            let slot = self.hw_timestamp.lock();
            if let Some(tag) = &*slot {
                return Some(Arc::clone(tag));
            }
        }
        let tag = queue.timestamp_pool().acquire();
        let mut slot = self.hw_timestamp.lock();
        if slot.is_none() {
            *slot = Some(tag);
        } else {
            queue.timestamp_pool().release(tag);
        }
        slot.clone()
    }

    /// Runs profiling reconciliation once; later calls return the cached
    /// result. Returns whether data is available.
    pub fn calc_profiling_data(&self) -> bool {
        let mut snapshots = self.profiling.lock();
        if snapshots.calculated {
            return true;
        }
        let Some(queue) = &self.queue else {
            return false;
        };
        let clock = queue.clock();
        let raw = self.config.return_raw_timestamps;

        let packets = self.timestamp_packets.lock().clone();
        if let Some((global_start, global_end)) = boundary_values(&packets) {
            snapshots.calculate(global_start, global_end, 0, global_start, clock, raw);
        } else if let Some(tag) = self.hw_timestamp.lock().clone() {
            snapshots.calculate(
                tag.context_start(0),
                tag.context_end(0),
                tag.context_complete(0),
                tag.global_start(0),
                clock,
                raw,
            );
        }
        snapshots.calculated
    }

    /// Queries one profiling milestone value.
    ///
    /// Returns [`ErrorKind::ProfilingNotAvailable`] for user events,
    /// incomplete events, or events created without profiling.
    pub fn profiling_info(&self, milestone: ProfilingMilestone) -> Result<u64> {
        if self.is_user_event()
            || !self.update_status_and_check_completion()
            || !self.profiling_enabled
        {
            return Err(Error::profiling_not_available());
        }
        if matches!(
            milestone,
            ProfilingMilestone::Start | ProfilingMilestone::End | ProfilingMilestone::Complete
        ) && !self.calc_profiling_data()
        {
            return Err(Error::profiling_not_available());
        }
        Ok(self.profiling.lock().value(milestone, &self.config))
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        // Flush any still-pending command in abort mode.
        self.submit_command(true);

        let last = self.status.load();
        if !last.is_completed() {
            // Encoded but unfinished work may still sit in a batch; push it
            // out so nothing depending on it stalls behind this event.
            if let Some(queue) = &self.queue {
                if self.peek_task_level() != NOT_READY {
                    queue.flush();
                }
            }
            self.transition_status(ExecutionStatus::Terminated(TerminationReason::Aborted));
        }

        // Every registered callback executes before destruction.
        if self.callbacks.has_pending() {
            self.execute_callbacks(self.status.load());
        }

        self.submitted_command.lock().take();

        if let Some(queue) = &self.queue {
            if let Some(tag) = self.hw_timestamp.lock().take() {
                queue.timestamp_pool().release(tag);
            }
        }

        // In case this event never unblocked its children.
        self.unblock_children(self.status.load());
    }
}

impl core::fmt::Debug for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("status", &self.status.load())
            .field("task_level", &self.peek_task_level())
            .field("task_count", &self.peek_task_count())
            .field("parent_count", &self.parent_count())
            .finish_non_exhaustive()
    }
}
