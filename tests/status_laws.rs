//! Property tests for the status lattice and the wraparound delta.
//!
//! # Laws Tested
//!
//! ## Status Rank Laws
//! - rank/from_rank round-trips over the whole encodable range
//! - transitions never increase the observed rank, in any order
//! - a termination is absorbing: no later transition displaces it
//!
//! ## Delta Laws
//! - delta is exact modular subtraction in the masked domain
//! - delta never exceeds the domain mask
//! - delta of equal endpoints is zero

use proptest::prelude::*;
use syncpoint::profiling::{delta, max_n_bit_value};
use syncpoint::types::{AtomicExecutionStatus, ExecutionStatus, TerminationReason};

fn arb_status() -> impl Strategy<Value = ExecutionStatus> {
    prop_oneof![
        Just(ExecutionStatus::Complete),
        Just(ExecutionStatus::Running),
        Just(ExecutionStatus::Submitted),
        Just(ExecutionStatus::Queued),
        Just(ExecutionStatus::Terminated(TerminationReason::Aborted)),
        Just(ExecutionStatus::Terminated(TerminationReason::GpuHang)),
        (-1000i32..=-3).prop_map(|code| {
            ExecutionStatus::Terminated(TerminationReason::Code(code))
        }),
    ]
}

proptest! {
    #[test]
    fn rank_round_trips(rank in -1000i32..=3) {
        prop_assert_eq!(ExecutionStatus::from_rank(rank).rank(), rank);
    }

    #[test]
    fn transitions_never_increase_rank(statuses in prop::collection::vec(arb_status(), 1..32)) {
        let cell = AtomicExecutionStatus::new(ExecutionStatus::Queued);
        let mut observed = cell.load().rank();
        for status in statuses {
            cell.transition(status);
            let now = cell.load().rank();
            prop_assert!(now <= observed, "rank regressed: {observed} -> {now}");
            observed = now;
        }
    }

    #[test]
    fn termination_is_absorbing(statuses in prop::collection::vec(arb_status(), 0..16)) {
        let cell = AtomicExecutionStatus::new(ExecutionStatus::Queued);
        cell.transition(ExecutionStatus::Terminated(TerminationReason::GpuHang));
        let settled = cell.load();
        for status in statuses {
            if status.rank() >= settled.rank() {
                cell.transition(status);
                prop_assert_eq!(cell.load(), settled);
            }
        }
    }

    #[test]
    fn delta_is_modular_subtraction(start in any::<u64>(), len in any::<u64>(), bits in 1u32..=64) {
        let mask = max_n_bit_value(bits);
        let expected = len & mask;
        prop_assert_eq!(delta(start, start.wrapping_add(len), bits), expected);
    }

    #[test]
    fn delta_stays_within_the_domain(start in any::<u64>(), end in any::<u64>(), bits in 1u32..=64) {
        prop_assert!(delta(start, end, bits) <= max_n_bit_value(bits));
    }

    #[test]
    fn delta_of_equal_endpoints_is_zero(tick in any::<u64>(), bits in 1u32..=64) {
        prop_assert_eq!(delta(tick, tick, bits), 0);
    }
}

#[test]
fn concurrent_transitions_settle_at_the_lowest_applied_rank() {
    let cell = std::sync::Arc::new(AtomicExecutionStatus::new(ExecutionStatus::Queued));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let cell = std::sync::Arc::clone(&cell);
        handles.push(std::thread::spawn(move || {
            for status in [
                ExecutionStatus::Submitted,
                ExecutionStatus::Running,
                ExecutionStatus::Complete,
            ] {
                cell.transition(status);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(cell.load(), ExecutionStatus::Complete);
}
