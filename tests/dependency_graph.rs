//! Dependency graph: blocking, unblocking, level propagation, termination.

use std::sync::Arc;

use syncpoint::config::EventConfig;
use syncpoint::event::Event;
use syncpoint::queue::{DeviceQueue, SimCommand, SimQueue};
use syncpoint::test_utils::init_test_logging;
use syncpoint::types::{ExecutionStatus, TerminationReason, NOT_READY};

fn dyn_queue(queue: &Arc<SimQueue>) -> Arc<dyn DeviceQueue> {
    Arc::clone(queue) as Arc<dyn DeviceQueue>
}

#[test]
fn child_stays_blocked_until_every_parent_retires() {
    init_test_logging();
    let queue = SimQueue::new();
    let parent_a = Event::with_completion(dyn_queue(&queue), 3, NOT_READY);
    let parent_b = Event::with_completion(dyn_queue(&queue), 5, NOT_READY);
    let child = Event::new(dyn_queue(&queue));

    parent_a.add_child(&child);
    parent_b.add_child(&child);
    assert_eq!(child.parent_count(), 2);
    assert!(child.is_blocked());

    parent_a.update_execution_status();
    assert_eq!(child.parent_count(), 1);
    assert!(child.is_blocked());

    parent_b.update_execution_status();
    assert!(!child.is_blocked());
    assert_eq!(child.peek_status(), ExecutionStatus::Complete);
}

#[test]
fn child_level_exceeds_every_parent_level() {
    init_test_logging();
    let queue = SimQueue::new();
    let parent_a = Event::with_completion(dyn_queue(&queue), 3, NOT_READY);
    let parent_b = Event::with_completion(dyn_queue(&queue), 5, NOT_READY);
    let child = Event::new(dyn_queue(&queue));
    parent_a.add_child(&child);
    parent_b.add_child(&child);

    parent_a.update_execution_status();
    parent_b.update_execution_status();
    assert_eq!(child.peek_task_level(), 6);
}

#[test]
fn level_is_max_merged_regardless_of_retirement_order() {
    init_test_logging();
    let queue = SimQueue::new();
    let parent_a = Event::with_completion(dyn_queue(&queue), 3, NOT_READY);
    let parent_b = Event::with_completion(dyn_queue(&queue), 5, NOT_READY);
    let child = Event::new(dyn_queue(&queue));
    parent_a.add_child(&child);
    parent_b.add_child(&child);

    // Higher-level parent retires first; the late lower level must not win.
    parent_b.update_execution_status();
    assert_eq!(child.peek_task_level(), 6);
    parent_a.update_execution_status();
    assert_eq!(child.peek_task_level(), 6);
}

#[test]
fn children_unblock_at_submission_not_completion() {
    init_test_logging();
    let queue = SimQueue::new();
    let parent = Event::with_completion(dyn_queue(&queue), 0, NOT_READY);
    parent
        .set_command(Box::new(SimCommand::new(Arc::clone(&queue))))
        .unwrap();
    let child = Event::new(dyn_queue(&queue));
    parent.add_child(&child);

    parent.update_execution_status();
    assert_eq!(parent.peek_status(), ExecutionStatus::Submitted);
    // The parent has not completed, yet its consumer may proceed.
    assert!(!child.is_blocked());
}

#[test]
fn add_child_after_completion_unblocks_immediately() {
    init_test_logging();
    let queue = SimQueue::new();
    let parent = Event::with_completion(dyn_queue(&queue), 2, NOT_READY);
    parent.update_execution_status();
    assert_eq!(parent.peek_status(), ExecutionStatus::Complete);

    let child = Event::new(dyn_queue(&queue));
    parent.add_child(&child);
    assert!(!child.is_blocked());
    assert_eq!(child.peek_task_level(), 3);
    assert_eq!(child.peek_status(), ExecutionStatus::Complete);
}

#[test]
fn user_event_completion_unblocks_children() {
    init_test_logging();
    let queue = SimQueue::new();
    let gate = Event::new_user(EventConfig::default());
    let child = Event::new(dyn_queue(&queue));
    gate.add_child(&child);
    assert!(child.is_blocked());

    assert!(gate.set_status(ExecutionStatus::Complete));
    assert!(!child.is_blocked());
    assert_eq!(child.peek_status(), ExecutionStatus::Complete);
}

#[test]
fn termination_propagates_transitively() {
    init_test_logging();
    let root = Event::new_user(EventConfig::default());
    let middle = Event::new_user(EventConfig::default());
    let leaf = Event::new_user(EventConfig::default());
    root.add_child(&middle);
    middle.add_child(&leaf);

    root.abort(TerminationReason::GpuHang);
    assert_eq!(
        middle.peek_status(),
        ExecutionStatus::Terminated(TerminationReason::GpuHang)
    );
    assert_eq!(
        leaf.peek_status(),
        ExecutionStatus::Terminated(TerminationReason::GpuHang)
    );
}

#[test]
fn termination_overrides_outstanding_parents() {
    init_test_logging();
    let hung = Event::new_user(EventConfig::default());
    let healthy = Event::new_user(EventConfig::default());
    let child = Event::new_user(EventConfig::default());
    hung.add_child(&child);
    healthy.add_child(&child);

    // One parent is still outstanding; termination does not wait for it.
    hung.abort(TerminationReason::GpuHang);
    assert!(child.peek_status().is_terminated());
}

#[test]
fn termination_does_not_reset_a_resolved_level() {
    init_test_logging();
    let queue = SimQueue::new();
    let parent_a = Event::with_completion(dyn_queue(&queue), 4, NOT_READY);
    let parent_b = Event::new_user(EventConfig::default());
    let child = Event::new(dyn_queue(&queue));
    parent_a.add_child(&child);
    parent_b.add_child(&child);

    parent_a.update_execution_status();
    assert_eq!(child.peek_task_level(), 5);

    parent_b.abort(TerminationReason::Aborted);
    assert!(child.peek_status().is_terminated());
    assert_eq!(child.peek_task_level(), 5);
}

#[test]
fn parent_edges_are_tracked_when_enabled() {
    init_test_logging();
    let config = EventConfig::new().with_parent_tracking(true);
    let parent = Event::new_user(config);
    let child = Event::new_user(config);
    parent.add_child(&child);

    assert_eq!(child.parents().len(), 1);
    assert_eq!(parent.child_count(), 1);

    // Default configuration keeps no producer edges.
    let untracked_parent = Event::new_user(EventConfig::default());
    let untracked_child = Event::new_user(EventConfig::default());
    untracked_parent.add_child(&untracked_child);
    assert!(untracked_child.parents().is_empty());
}
