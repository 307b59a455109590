//! Batched multi-event waiting.
//!
//! [`wait_for_events`] drains a list of events with a two-list round-robin:
//! each pass moves the events that are not yet ready into a "still
//! pending" list, then the lists swap. Already-ready events are never
//! reprocessed, so each pass costs only the outstanding set. A device
//! hang short-circuits the drain: the remainder of the current pass and
//! the whole pending list are forcibly terminated, and the call fails.

use crate::error::{Error, Result, WaitStatus};
use crate::event::Event;
use crate::tracing_compat::debug;
use crate::types::{TerminationReason, NOT_READY};
use std::sync::Arc;

/// Waits for every event in `events` to complete.
///
/// Unflushed work cannot complete, so every queue referenced by an
/// encoded event is flushed first. An event already reporting an error
/// status aborts the whole call immediately. A [`WaitStatus::GpuHang`]
/// observed mid-drain terminates the remaining events of the current pass
/// and everything still pending, then returns
/// [`ErrorKind::WaitListFailed`](crate::error::ErrorKind::WaitListFailed).
pub fn wait_for_events(events: &[Arc<Event>]) -> Result<()> {
    if events.is_empty() {
        return Ok(());
    }

    for event in events {
        if let Some(queue) = event.queue() {
            if event.peek_task_level() != NOT_READY {
                queue.flush();
            }
        }
    }

    let mut current: Vec<Arc<Event>> = events.to_vec();
    let mut pending: Vec<Arc<Event>> = Vec::with_capacity(events.len());

    while !current.is_empty() {
        for index in 0..current.len() {
            let event = &current[index];
            if event.peek_status().is_terminated() {
                return Err(Error::wait_list_failed());
            }

            match event.wait(false, false) {
                WaitStatus::Ready => {}
                WaitStatus::NotReady => pending.push(Arc::clone(event)),
                WaitStatus::GpuHang => {
                    debug!("hang observed mid-drain; terminating wait list");
                    for pending_event in &pending {
                        pending_event.abort(TerminationReason::GpuHang);
                    }
                    for remaining in &current[index..] {
                        remaining.abort(TerminationReason::GpuHang);
                    }
                    return Err(Error::wait_list_failed());
                }
            }
        }

        std::mem::swap(&mut current, &mut pending);
        pending.clear();
    }

    Ok(())
}
