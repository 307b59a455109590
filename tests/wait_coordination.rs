//! Batched waiting: flush-then-drain, fail-fast, hang containment.

use std::sync::Arc;

use syncpoint::config::EventConfig;
use syncpoint::error::ErrorKind;
use syncpoint::event::Event;
use syncpoint::queue::{DeviceQueue, SimCommand, SimQueue};
use syncpoint::test_utils::init_test_logging;
use syncpoint::types::{ExecutionStatus, TerminationReason, NOT_READY};
use syncpoint::wait::wait_for_events;

fn dyn_queue(queue: &Arc<SimQueue>) -> Arc<dyn DeviceQueue> {
    Arc::clone(queue) as Arc<dyn DeviceQueue>
}

#[test]
fn empty_wait_list_succeeds() {
    init_test_logging();
    assert!(wait_for_events(&[]).is_ok());
}

#[test]
fn drains_ready_events_and_flushes_their_queues() {
    init_test_logging();
    let queue = SimQueue::new();
    let first = Event::with_completion(dyn_queue(&queue), 0, NOT_READY);
    let second = Event::with_completion(dyn_queue(&queue), 1, NOT_READY);
    first
        .set_command(Box::new(SimCommand::new(Arc::clone(&queue))))
        .unwrap();
    second
        .set_command(Box::new(SimCommand::new(Arc::clone(&queue))))
        .unwrap();
    first.update_execution_status();
    second.update_execution_status();
    queue.retire_all();

    wait_for_events(&[Arc::clone(&first), Arc::clone(&second)]).unwrap();
    assert_eq!(first.peek_status(), ExecutionStatus::Complete);
    assert_eq!(second.peek_status(), ExecutionStatus::Complete);
    // One flush per encoded event before draining.
    assert_eq!(queue.flush_count(), 2);
}

#[test]
fn fails_fast_on_a_pre_terminated_event() {
    init_test_logging();
    let healthy = Event::new_user(EventConfig::default());
    healthy.set_status(ExecutionStatus::Complete);
    let broken = Event::new_user(EventConfig::default());
    broken.abort(TerminationReason::Code(-55));

    let err = wait_for_events(&[healthy, broken]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WaitListFailed);
}

#[test]
fn hang_terminates_the_remaining_wait_list() {
    init_test_logging();
    let queue = SimQueue::new();
    let hung = Event::with_completion(dyn_queue(&queue), 0, NOT_READY);
    let innocent = Event::with_completion(dyn_queue(&queue), 1, NOT_READY);
    hung.set_command(Box::new(SimCommand::new(Arc::clone(&queue))))
        .unwrap();
    innocent
        .set_command(Box::new(SimCommand::new(Arc::clone(&queue))))
        .unwrap();
    hung.update_execution_status();
    innocent.update_execution_status();

    queue.inject_hang();
    let err = wait_for_events(&[Arc::clone(&hung), Arc::clone(&innocent)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WaitListFailed);
    assert_eq!(
        hung.peek_status(),
        ExecutionStatus::Terminated(TerminationReason::GpuHang)
    );
    assert_eq!(
        innocent.peek_status(),
        ExecutionStatus::Terminated(TerminationReason::GpuHang)
    );
}

#[test]
fn hang_terminates_events_parked_as_pending() {
    init_test_logging();
    let queue = SimQueue::new();
    let ready = Event::new_user(EventConfig::default());
    ready.set_status(ExecutionStatus::Complete);

    // Never encoded: parked on the pending list by the first pass.
    let parked = Event::new(dyn_queue(&queue));

    let hung = Event::with_completion(dyn_queue(&queue), 0, NOT_READY);
    hung.set_command(Box::new(SimCommand::new(Arc::clone(&queue))))
        .unwrap();
    hung.update_execution_status();
    queue.inject_hang();

    let err = wait_for_events(&[
        Arc::clone(&ready),
        Arc::clone(&parked),
        Arc::clone(&hung),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WaitListFailed);
    assert_eq!(
        parked.peek_status(),
        ExecutionStatus::Terminated(TerminationReason::GpuHang)
    );
    assert_eq!(
        hung.peek_status(),
        ExecutionStatus::Terminated(TerminationReason::GpuHang)
    );
    // The event drained before the hang keeps its result.
    assert_eq!(ready.peek_status(), ExecutionStatus::Complete);
}

#[test]
fn not_ready_events_are_retried_on_the_next_pass() {
    init_test_logging();
    let queue = SimQueue::new();

    // `blocked` cannot resolve until `gate` completes; `trigger` completes
    // in the first pass and its callback opens the gate, so `blocked` is
    // the only event left for the second pass.
    let gate = Event::new_user(EventConfig::default());
    let blocked = Event::new(dyn_queue(&queue));
    gate.add_child(&blocked);

    let trigger = Event::with_completion(dyn_queue(&queue), 0, 1);
    {
        let gate = Arc::clone(&gate);
        trigger
            .add_callback(ExecutionStatus::Complete, move |_, _| {
                gate.set_status(ExecutionStatus::Complete);
            })
            .unwrap();
    }
    queue.retire(1);

    wait_for_events(&[Arc::clone(&blocked), Arc::clone(&trigger)]).unwrap();
    assert_eq!(blocked.peek_status(), ExecutionStatus::Complete);
    assert_eq!(trigger.peek_status(), ExecutionStatus::Complete);
    assert_eq!(gate.peek_status(), ExecutionStatus::Complete);
}

#[test]
fn cross_thread_retirement_unblocks_the_drain() {
    init_test_logging();
    let queue = SimQueue::new();
    let event = Event::with_completion(dyn_queue(&queue), 0, NOT_READY);
    event
        .set_command(Box::new(SimCommand::new(Arc::clone(&queue))))
        .unwrap();
    event.update_execution_status();

    let retirer = {
        let queue = Arc::clone(&queue);
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(10));
            queue.retire_all();
        })
    };

    wait_for_events(&[Arc::clone(&event)]).unwrap();
    assert_eq!(event.peek_status(), ExecutionStatus::Complete);
    retirer.join().unwrap();
}
