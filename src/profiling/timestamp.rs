//! Device-written timestamp packets and the reusable tag pool.
//!
//! A [`TimestampPacket`] is host-visible memory the device writes at batch
//! boundaries. Each packet slot starts at [`TimestampPacket::INITIAL`];
//! a context-end value different from the initial marker means the device
//! has written it, which is what the timestamp completion fast path polls.
//!
//! [`TagPool`] is the ring of timestamp-capable slots: events acquire a
//! tag lazily when profiling is enabled and return it on destruction so
//! the slot can be reused.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One packet's worth of device-written timestamps.
#[derive(Debug)]
pub struct PacketTimestamps {
    context_start: AtomicU64,
    context_end: AtomicU64,
    global_start: AtomicU64,
    global_end: AtomicU64,
    context_complete: AtomicU64,
}

impl PacketTimestamps {
    fn new() -> Self {
        Self {
            context_start: AtomicU64::new(TimestampPacket::INITIAL),
            context_end: AtomicU64::new(TimestampPacket::INITIAL),
            global_start: AtomicU64::new(TimestampPacket::INITIAL),
            global_end: AtomicU64::new(TimestampPacket::INITIAL),
            context_complete: AtomicU64::new(0),
        }
    }
}

/// A timestamp slot written by the device, read by the reconciler.
#[derive(Debug)]
pub struct TimestampPacket {
    packets: Vec<PacketTimestamps>,
    profiling_capable: bool,
}

impl TimestampPacket {
    /// Marker meaning "not yet written by the device".
    pub const INITIAL: u64 = 1;

    /// Creates a profiling-capable packet with one slot.
    #[must_use]
    pub fn new() -> Self {
        Self::with_packets(1, true)
    }

    /// Creates a packet with `count` slots (partitioned execution writes
    /// one slot per participating partition).
    #[must_use]
    pub fn with_packets(count: usize, profiling_capable: bool) -> Self {
        let packets = (0..count.max(1)).map(|_| PacketTimestamps::new()).collect();
        Self {
            packets,
            profiling_capable,
        }
    }

    /// Number of slots the device writes.
    #[must_use]
    pub fn packets_used(&self) -> usize {
        self.packets.len()
    }

    /// Whether this packet participates in profiling boundary computation.
    #[must_use]
    pub const fn is_profiling_capable(&self) -> bool {
        self.profiling_capable
    }

    /// Context-domain start tick of slot `index`.
    #[must_use]
    pub fn context_start(&self, index: usize) -> u64 {
        self.packets[index].context_start.load(Ordering::Acquire)
    }

    /// Context-domain end tick of slot `index`.
    #[must_use]
    pub fn context_end(&self, index: usize) -> u64 {
        self.packets[index].context_end.load(Ordering::Acquire)
    }

    /// Global-domain start tick of slot `index`.
    #[must_use]
    pub fn global_start(&self, index: usize) -> u64 {
        self.packets[index].global_start.load(Ordering::Acquire)
    }

    /// Global-domain end tick of slot `index`.
    #[must_use]
    pub fn global_end(&self, index: usize) -> u64 {
        self.packets[index].global_end.load(Ordering::Acquire)
    }

    /// Distinct completion tick of slot `index`; 0 if never written.
    #[must_use]
    pub fn context_complete(&self, index: usize) -> u64 {
        self.packets[index].context_complete.load(Ordering::Acquire)
    }

    /// Device-side write of one slot's start/end values.
    pub fn write(&self, index: usize, context: (u64, u64), global: (u64, u64)) {
        let slot = &self.packets[index];
        slot.context_start.store(context.0, Ordering::Release);
        slot.context_end.store(context.1, Ordering::Release);
        slot.global_start.store(global.0, Ordering::Release);
        slot.global_end.store(global.1, Ordering::Release);
    }

    /// Device-side write of the distinct completion tick.
    pub fn write_complete(&self, index: usize, tick: u64) {
        self.packets[index]
            .context_complete
            .store(tick, Ordering::Release);
    }

    /// Whether every slot has been written by the device.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.packets
            .iter()
            .all(|p| p.context_end.load(Ordering::Acquire) != Self::INITIAL)
    }

    /// Resets all slots to the unwritten state for reuse.
    fn reset(&self) {
        for slot in &self.packets {
            slot.context_start.store(Self::INITIAL, Ordering::Release);
            slot.context_end.store(Self::INITIAL, Ordering::Release);
            slot.global_start.store(Self::INITIAL, Ordering::Release);
            slot.global_end.store(Self::INITIAL, Ordering::Release);
            slot.context_complete.store(0, Ordering::Release);
        }
    }
}

impl Default for TimestampPacket {
    fn default() -> Self {
        Self::new()
    }
}

/// Boundary over the profiling-capable packets: (min global start,
/// max global end). `None` when `packets` is empty.
///
/// The reconciled span covers every participating partition, not any
/// single one. Seeded from the first packet so a container with no
/// capable packets still yields a defined pair.
#[must_use]
pub fn boundary_values(packets: &[Arc<TimestampPacket>]) -> Option<(u64, u64)> {
    let first = packets.first()?;
    let mut global_start = first.global_start(0);
    let mut global_end = first.global_end(0);

    for packet in packets {
        if !packet.is_profiling_capable() {
            continue;
        }
        for i in 0..packet.packets_used() {
            global_start = global_start.min(packet.global_start(i));
            global_end = global_end.max(packet.global_end(i));
        }
    }
    Some((global_start, global_end))
}

/// Ring of reusable timestamp slots.
///
/// Acquisition reuses a released tag when one is available, resetting it
/// to the unwritten state; otherwise a fresh tag is allocated. Tags are
/// shared (`Arc`) because the device side and the event side both hold
/// them.
#[derive(Debug, Default)]
pub struct TagPool {
    free: Mutex<Vec<Arc<TimestampPacket>>>,
}

impl TagPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a tag, reusing a released slot when possible.
    #[must_use]
    pub fn acquire(&self) -> Arc<TimestampPacket> {
        if let Some(tag) = self.free.lock().pop() {
            tag.reset();
            return tag;
        }
        Arc::new(TimestampPacket::new())
    }

    /// Returns a tag to the pool for reuse.
    pub fn release(&self, tag: Arc<TimestampPacket>) {
        self.free.lock().push(tag);
    }

    /// Number of currently free tags.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }
}
