//! Milestone callback registration and dispatch.
//!
//! Callbacks register against one of three ordered targets (`Submitted`,
//! `Running`, `Completed`). Dispatch drains every target list up to the
//! milestone reached; abnormal termination drains all of them, delivering
//! the termination code instead of the requested milestone. Each list is
//! detached before iteration so a callback that registers further
//! callbacks or mutates the graph cannot re-enter a held lock, and so a
//! concurrent drain cannot deliver the same entry twice.

use crate::error::{Error, ErrorKind, Result};
use crate::event::Event;
use crate::tracing_compat::trace;
use crate::types::{CallbackTarget, ExecutionStatus};
use parking_lot::Mutex;

/// A registered callback: the closure plus the milestone it asked for.
pub(crate) struct CallbackEntry {
    requested: ExecutionStatus,
    func: Box<dyn FnMut(&Event, ExecutionStatus) + Send>,
}

/// One ordered list per milestone target.
pub(crate) struct CallbackLists {
    lists: [Mutex<Vec<CallbackEntry>>; CallbackTarget::COUNT],
}

impl CallbackLists {
    pub(crate) fn new() -> Self {
        Self {
            lists: [
                Mutex::new(Vec::new()),
                Mutex::new(Vec::new()),
                Mutex::new(Vec::new()),
            ],
        }
    }

    pub(crate) fn push(&self, target: CallbackTarget, entry: CallbackEntry) {
        self.lists[target as usize].lock().push(entry);
    }

    /// Detaches the list for one target.
    pub(crate) fn detach(&self, index: usize) -> Vec<CallbackEntry> {
        std::mem::take(&mut *self.lists[index].lock())
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.lists.iter().any(|list| !list.lock().is_empty())
    }
}

impl Event {
    /// Registers a callback for `milestone` (`Submitted`, `Running`, or
    /// `Complete`).
    ///
    /// If the event is already at or past the milestone, the callback
    /// executes synchronously before this call returns; otherwise it fires
    /// when the milestone (or a termination) is reached. Every registered
    /// callback executes exactly once before the event is destroyed.
    ///
    /// Registering against a status with no callback target (`Queued`, a
    /// termination code) is a caller contract violation.
    pub fn add_callback<F>(&self, milestone: ExecutionStatus, func: F) -> Result<()>
    where
        F: FnMut(&Event, ExecutionStatus) + Send + 'static,
    {
        let Ok(target) = CallbackTarget::try_from(milestone) else {
            debug_assert!(false, "no callback target for status {milestone}");
            return Err(Error::new(
                ErrorKind::InvalidCallbackMilestone,
                "status has no callback target",
            ));
        };

        self.callbacks.push(
            target,
            CallbackEntry {
                requested: milestone,
                func: Box::new(func),
            },
        );
        trace!(milestone = %milestone, "callback registered");

        // Late registration: if the milestone already passed, deliver now.
        self.update_execution_status();
        let current = self.peek_status();
        if current.is_terminated() || current.rank() <= milestone.rank() {
            self.execute_callbacks(current);
        }
        Ok(())
    }

    /// Drains and executes callbacks for every target reached by `status`.
    ///
    /// A termination drains all targets and overrides the delivered status
    /// with the termination code; otherwise each entry receives the
    /// milestone it registered for.
    pub(crate) fn execute_callbacks(&self, status: ExecutionStatus) {
        let terminated = status.is_terminated();
        let reached = if terminated {
            CallbackTarget::Completed
        } else {
            match CallbackTarget::try_from(status) {
                Ok(target) => target,
                Err(()) => return,
            }
        };

        for index in 0..=reached as usize {
            let drained = self.callbacks.detach(index);
            for mut entry in drained {
                let delivered = if terminated { status } else { entry.requested };
                trace!(delivered = %delivered, "executing callback");
                (entry.func)(self, delivered);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventConfig;
    use crate::types::TerminationReason;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    // debug_assert fires in debug builds; the Err path is release-only.
    #[test]
    #[cfg(not(debug_assertions))]
    fn invalid_milestone_is_rejected() {
        let event = Event::new_user(EventConfig::default());
        let result = event.add_callback(ExecutionStatus::Queued, |_, _| {});
        assert!(result.is_err());
    }

    #[test]
    fn late_registration_fires_synchronously() {
        let event = Event::new_user(EventConfig::default());
        assert!(event.set_status(ExecutionStatus::Complete));

        let fired = Arc::new(AtomicU32::new(0));
        let observed = Arc::clone(&fired);
        event
            .add_callback(ExecutionStatus::Complete, move |_, status| {
                assert_eq!(status, ExecutionStatus::Complete);
                observed.fetch_add(1, Ordering::SeqCst);
            })
            .expect("register");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn termination_overrides_delivered_status() {
        let event = Event::new_user(EventConfig::default());
        let fired = Arc::new(AtomicU32::new(0));
        let observed = Arc::clone(&fired);
        event
            .add_callback(ExecutionStatus::Complete, move |_, status| {
                assert!(status.is_terminated());
                observed.fetch_add(1, Ordering::SeqCst);
            })
            .expect("register");

        event.abort(TerminationReason::GpuHang);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
