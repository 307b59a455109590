//! Profiling timestamp reconciliation.
//!
//! Raw hardware timestamps are fixed-width counters that wrap; this module
//! converts them into monotonic CPU-nanosecond values anchored at a single
//! correlated CPU/GPU sample taken at submission time.
//!
//! The algorithm, in order:
//!
//! 1. [`delta`] computes durations in the masked wraparound domain.
//! 2. The submit snapshot anchors the CPU and GPU clock domains.
//! 3. The start tick is un-wrapped past the submit tick, then the tick
//!    delta is converted to nanoseconds through the timer resolution.
//! 4. End and complete are durations from start; a zero completion tick
//!    defaults to the end tick.
//! 5. The result is memoized; repeat queries return cached values.
//!
//! For partitioned execution the boundary pair is the min start / max end
//! over every profiling-capable packet
//! ([`timestamp::boundary_values`]).

use crate::config::EventConfig;

pub mod clock;
pub mod timestamp;

pub use clock::{ClockSource, SimClock, TimePair};
pub use timestamp::{boundary_values, PacketTimestamps, TagPool, TimestampPacket};

/// The profiling milestones an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilingMilestone {
    /// The command was enqueued on the host.
    Queued,
    /// The command was submitted to the device.
    Submit,
    /// The device started executing.
    Start,
    /// The device finished executing.
    End,
    /// All device-side work (including post-sync) completed.
    Complete,
}

/// One timestamp snapshot in all three domains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfilingInfo {
    /// CPU time in nanoseconds.
    pub cpu_ns: u64,
    /// Raw GPU timestamp counter value.
    pub gpu_tick: u64,
    /// GPU time converted to nanoseconds.
    pub gpu_ns: u64,
}

/// Largest value representable in `bits` bits.
#[must_use]
pub const fn max_n_bit_value(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Duration from `start` to `end` in a `valid_bits`-wide wraparound domain.
///
/// Modular subtraction: `(end - start) mod 2^valid_bits`. For a 32-bit
/// counter, `delta(0xFFFF_FFF0, 0x10) == 0x20`.
#[must_use]
pub const fn delta(start: u64, end: u64, valid_bits: u32) -> u64 {
    let mask = max_n_bit_value(valid_bits);
    end.wrapping_sub(start) & mask
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn ticks_to_ns(ticks: u64, resolution: f64) -> u64 {
    (ticks as f64 * resolution) as u64
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn ns_to_ticks(ns: u64, resolution: f64) -> u64 {
    (ns as f64 / resolution) as u64
}

/// The five snapshots an event records, plus the memoization flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfilingSnapshots {
    /// Host enqueue time.
    pub queued: ProfilingInfo,
    /// Submission time; the CPU/GPU anchor point.
    pub submit: ProfilingInfo,
    /// Device execution start.
    pub start: ProfilingInfo,
    /// Device execution end.
    pub end: ProfilingInfo,
    /// Device completion (defaults to end when the hardware records none).
    pub complete: ProfilingInfo,
    /// Whether reconciliation has already run.
    pub calculated: bool,
}

impl ProfilingSnapshots {
    /// Records the host-side enqueue time.
    pub fn record_queued(&mut self, cpu_ns: u64) {
        self.queued.cpu_ns = cpu_ns;
    }

    /// Anchors the submit snapshot from one correlated CPU/GPU sample and
    /// back-fills the queued snapshot's GPU domains relative to it.
    pub fn anchor_submit(&mut self, sample: TimePair, resolution: f64) {
        self.submit.cpu_ns = sample.cpu_ns;
        self.submit.gpu_tick = sample.gpu_tick;
        self.submit.gpu_ns = ticks_to_ns(sample.gpu_tick, resolution);

        let mut queued = self.queued;
        project_relative(&self.submit, &mut queued, resolution);
        self.queued = queued;
    }

    /// Runs reconciliation steps 3-5 over the raw boundary ticks.
    ///
    /// `context_complete` of zero means the hardware never wrote a
    /// distinct completion tick; the end tick is used instead. Runs at
    /// most once; later calls are no-ops.
    pub fn calculate(
        &mut self,
        context_start: u64,
        context_end: u64,
        context_complete: u64,
        global_start: u64,
        clock: &dyn ClockSource,
        raw_timestamps: bool,
    ) {
        if self.calculated {
            return;
        }
        let resolution = clock.timer_resolution();
        let valid_bits = clock.timestamp_valid_bits();

        // Undo wraps that occurred between submit and start.
        self.start.gpu_tick = global_start;
        let wrap_period = 1u64 << clock.global_timestamp_bits().min(63);
        while self.start.gpu_tick < self.submit.gpu_tick {
            self.start.gpu_tick += wrap_period;
        }
        let tick_diff = self.start.gpu_tick - self.submit.gpu_tick;
        self.start.cpu_ns = self.submit.cpu_ns + ticks_to_ns(tick_diff, resolution);
        self.start.gpu_ns = ticks_to_ns(self.start.gpu_tick, resolution);

        let gpu_duration = delta(context_start, context_end, valid_bits);
        let resolved_complete = if context_complete == 0 {
            context_end
        } else {
            context_complete
        };
        let gpu_complete_duration = if context_complete == 0 {
            gpu_duration
        } else {
            delta(context_start, context_complete, valid_bits)
        };
        let cpu_duration = ticks_to_ns(gpu_duration, resolution);
        let cpu_complete_duration = ticks_to_ns(gpu_complete_duration, resolution);

        self.end.cpu_ns = self.start.cpu_ns + cpu_duration;
        self.end.gpu_ns = self.start.gpu_ns + cpu_duration;
        self.end.gpu_tick = self.start.gpu_tick + gpu_duration;

        self.complete.cpu_ns = self.start.cpu_ns + cpu_complete_duration;
        self.complete.gpu_ns = self.start.gpu_ns + cpu_complete_duration;
        self.complete.gpu_tick = self.start.gpu_tick + gpu_complete_duration;

        if raw_timestamps {
            self.start.gpu_tick = context_start;
            self.end.gpu_tick = context_end;
            self.complete.gpu_tick = resolved_complete;
        }

        self.calculated = true;
    }

    /// Snapshot for `milestone`.
    #[must_use]
    pub const fn snapshot(&self, milestone: ProfilingMilestone) -> ProfilingInfo {
        match milestone {
            ProfilingMilestone::Queued => self.queued,
            ProfilingMilestone::Submit => self.submit,
            ProfilingMilestone::Start => self.start,
            ProfilingMilestone::End => self.end,
            ProfilingMilestone::Complete => self.complete,
        }
    }

    /// The value a profiling query returns for `milestone`, selected by
    /// the configuration: raw GPU ticks, GPU-domain ns, or CPU ns.
    #[must_use]
    pub const fn value(&self, milestone: ProfilingMilestone, config: &EventConfig) -> u64 {
        let info = self.snapshot(milestone);
        if config.return_raw_timestamps {
            info.gpu_tick
        } else if config.device_based_timestamps {
            info.gpu_ns
        } else {
            info.cpu_ns
        }
    }
}

/// Projects a CPU-ns-only snapshot into the GPU domains relative to the
/// submit anchor.
fn project_relative(submit: &ProfilingInfo, info: &mut ProfilingInfo, resolution: f64) {
    if info.cpu_ns > submit.cpu_ns {
        let diff = info.cpu_ns - submit.cpu_ns;
        info.gpu_ns = submit.gpu_ns + diff;
        info.gpu_tick = submit.gpu_tick + ns_to_ticks(diff, resolution);
    } else {
        let diff = submit.cpu_ns - info.cpu_ns;
        info.gpu_ns = submit.gpu_ns.saturating_sub(diff);
        info.gpu_tick = submit
            .gpu_tick
            .saturating_sub(ns_to_ticks(diff, resolution));
    }
}
