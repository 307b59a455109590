//! Clock abstraction over the OS/device timing source.
//!
//! The reconciler needs one correlated CPU/GPU sample at submission time
//! plus the device's timer geometry (resolution and counter widths). The
//! trait is the only thing the core consumes; [`SimClock`] is a
//! deterministic implementation for tests.

use std::sync::atomic::{AtomicU64, Ordering};

/// One correlated CPU/GPU clock sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePair {
    /// CPU time in nanoseconds.
    pub cpu_ns: u64,
    /// GPU timestamp counter value at the same instant.
    pub gpu_tick: u64,
}

/// Timing source consumed by the profiling reconciler.
pub trait ClockSource: Send + Sync {
    /// Current CPU time in nanoseconds.
    fn cpu_time_ns(&self) -> u64;

    /// A single correlated CPU/GPU sample.
    fn correlated_time(&self) -> TimePair;

    /// Device timer resolution in nanoseconds per GPU tick.
    fn timer_resolution(&self) -> f64;

    /// Valid bit width of kernel timestamp counters (wraparound domain).
    fn timestamp_valid_bits(&self) -> u32;

    /// Bit width of the global timestamp counter.
    fn global_timestamp_bits(&self) -> u32;
}

/// Deterministic clock for tests: manually advanced CPU time, GPU ticks
/// derived from it through the configured resolution.
#[derive(Debug)]
pub struct SimClock {
    now_ns: AtomicU64,
    resolution: f64,
    valid_bits: u32,
    global_bits: u32,
}

impl SimClock {
    /// Creates a clock at time zero with 1 ns/tick and 32-bit counters.
    #[must_use]
    pub fn new() -> Self {
        Self::with_geometry(1.0, 32, 32)
    }

    /// Creates a clock with explicit timer geometry.
    #[must_use]
    pub fn with_geometry(resolution: f64, valid_bits: u32, global_bits: u32) -> Self {
        Self {
            now_ns: AtomicU64::new(0),
            resolution,
            valid_bits,
            global_bits,
        }
    }

    /// Advances CPU time by `ns` nanoseconds.
    pub fn advance(&self, ns: u64) {
        self.now_ns.fetch_add(ns, Ordering::AcqRel);
    }

    /// Sets the absolute CPU time.
    pub fn set(&self, ns: u64) {
        self.now_ns.store(ns, Ordering::Release);
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for SimClock {
    fn cpu_time_ns(&self) -> u64 {
        self.now_ns.load(Ordering::Acquire)
    }

    fn correlated_time(&self) -> TimePair {
        let cpu_ns = self.cpu_time_ns();
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        #[allow(clippy::cast_sign_loss)]
        let gpu_tick = (cpu_ns as f64 / self.resolution) as u64;
        TimePair { cpu_ns, gpu_tick }
    }

    fn timer_resolution(&self) -> f64 {
        self.resolution
    }

    fn timestamp_valid_bits(&self) -> u32 {
        self.valid_bits
    }

    fn global_timestamp_bits(&self) -> u32 {
        self.global_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_clock_advances() {
        let clock = SimClock::new();
        assert_eq!(clock.cpu_time_ns(), 0);
        clock.advance(500);
        assert_eq!(clock.cpu_time_ns(), 500);
        let pair = clock.correlated_time();
        assert_eq!(pair.cpu_ns, 500);
        assert_eq!(pair.gpu_tick, 500);
    }

    #[test]
    fn resolution_scales_ticks() {
        let clock = SimClock::with_geometry(2.0, 32, 36);
        clock.set(1000);
        let pair = clock.correlated_time();
        assert_eq!(pair.gpu_tick, 500);
        assert_eq!(clock.global_timestamp_bits(), 36);
    }
}
