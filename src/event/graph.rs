//! Producer→consumer dependency propagation.
//!
//! Edges point from producer to consumer: the producer's child list holds
//! strong references to its consumers, and each consumer counts its
//! unfinished producers in `parent_count`. When a producer reaches
//! `Submitted` or a terminal state it detaches its entire child list in
//! one swap, then notifies each child. Detaching before iterating means a
//! child's own unblock handler can mutate the graph without re-entering a
//! held lock, and a child can never be notified twice for one producer.
//!
//! Task levels merge by maximum: a child's logical order is at least one
//! past every parent's, regardless of the order in which parents retire.

use crate::event::{Event, EventKind};
use crate::tracing_compat::{debug, trace};
use crate::types::{ExecutionStatus, TaskLevel, NOT_READY};
use std::sync::atomic::Ordering;
use std::sync::Arc;

impl Event {
    /// Records that `child` cannot submit until this event retires.
    ///
    /// If this event already completed, the race is resolved by unblocking
    /// immediately: the edge is recorded, then completion propagates to
    /// the whole (just-detached) child list.
    pub fn add_child(self: &Arc<Self>, child: &Arc<Event>) {
        child.parent_count.fetch_add(1, Ordering::AcqRel);
        if child.config().track_parents {
            child.parents.lock().push(Arc::downgrade(self));
        }
        self.children.lock().push(Arc::clone(child));
        trace!("dependency edge added");

        if self.peek_status() == ExecutionStatus::Complete {
            self.unblock_children(ExecutionStatus::Complete);
        }
    }

    /// Producer edges retained for diagnostics, when enabled.
    #[must_use]
    pub fn parents(&self) -> Vec<Arc<Event>> {
        self.parents
            .lock()
            .iter()
            .filter_map(std::sync::Weak::upgrade)
            .collect()
    }

    /// Number of consumers still attached to this event.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.lock().len()
    }

    /// Notifies every child that this event reached `transition_status`
    /// (`Submitted`, `Complete`, or a termination).
    ///
    /// The propagated task level is resolved here: a producer that was
    /// itself blocked (level still unresolved) takes its level from the
    /// queue at this moment; otherwise children inherit `level + 1`.
    /// Terminations propagate no level.
    pub(crate) fn unblock_children(&self, transition_status: ExecutionStatus) {
        let mut level_to_propagate = NOT_READY;
        if !transition_status.is_terminated() {
            if self.peek_task_level() == NOT_READY {
                let resolved = self.resolve_task_level();
                self.merge_task_level(resolved);
                level_to_propagate = resolved;
            } else {
                level_to_propagate = self.peek_task_level() + 1;
            }
        }

        let children = std::mem::take(&mut *self.children.lock());
        if children.is_empty() {
            return;
        }
        debug!(
            status = %transition_status,
            level = level_to_propagate,
            children = children.len(),
            "unblocking children"
        );
        for child in children {
            child.unblock_by(level_to_propagate, transition_status);
        }
    }

    /// Where this event's task level comes from when unresolved.
    fn resolve_task_level(&self) -> TaskLevel {
        match self.kind {
            EventKind::User => 0,
            EventKind::Normal => self
                .queue()
                .map_or(0, |queue| queue.peek_task_level()),
        }
    }

    /// One producer of this event retired with `blocker_status`.
    ///
    /// The producer's level is merged in before the remaining-parents
    /// check so a child never reports a level lower than any parent's,
    /// no matter which parent retires last. Only the final producer (or
    /// any termination) advances the child's status.
    pub(crate) fn unblock_by(&self, level: TaskLevel, blocker_status: ExecutionStatus) {
        let terminated = blocker_status.is_terminated();
        if !terminated {
            self.merge_task_level(level);
        }

        let previous = self.parent_count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "unblocked with no parents outstanding");
        if previous > 1 && !terminated {
            return;
        }

        if !terminated {
            if let Some(queue) = self.queue() {
                self.merge_task_level(queue.peek_task_level());
            }
        }

        let propagate = if terminated {
            blocker_status
        } else {
            ExecutionStatus::Submitted
        };
        trace!(status = %propagate, "unblocked by producer");
        self.set_status(propagate);

        // The child may already be satisfiable; advance it in this call
        // rather than waiting for an external poll.
        self.update_execution_status();
    }

    /// Merges `level` into the task level by maximum, treating the
    /// unresolved sentinel as empty.
    pub(crate) fn merge_task_level(&self, level: TaskLevel) {
        let mut current = self.task_level.load(Ordering::Acquire);
        loop {
            let merged = if current == NOT_READY {
                level
            } else {
                current.max(level)
            };
            if merged == current {
                return;
            }
            match self.task_level.compare_exchange_weak(
                current,
                merged,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }
}
