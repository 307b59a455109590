//! Explicit, immutable event configuration.
//!
//! All behavior toggles are fixed at construction time and passed into the
//! event/queue constructors; nothing in the crate consults ambient global
//! state. Flip a flag by building a new config and creating new events
//! with it.

/// Configuration for events created on a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventConfig {
    /// Record and reconcile profiling timestamps for events on this queue.
    pub profiling_enabled: bool,
    /// Profiling queries return raw GPU ticks instead of CPU nanoseconds.
    pub return_raw_timestamps: bool,
    /// Profiling queries return device-domain nanoseconds.
    pub device_based_timestamps: bool,
    /// Allow the timestamp fast path: poll device-written timestamp memory
    /// instead of performing a full kernel-level wait.
    pub timestamp_wait_enabled: bool,
    /// Retain producer edges on consumers for diagnostics.
    pub track_parents: bool,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            profiling_enabled: false,
            return_raw_timestamps: false,
            device_based_timestamps: false,
            timestamp_wait_enabled: false,
            track_parents: false,
        }
    }
}

impl EventConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables profiling timestamp collection.
    #[must_use]
    pub const fn with_profiling(mut self, enabled: bool) -> Self {
        self.profiling_enabled = enabled;
        self
    }

    /// Makes profiling queries return raw GPU ticks.
    #[must_use]
    pub const fn with_raw_timestamps(mut self, enabled: bool) -> Self {
        self.return_raw_timestamps = enabled;
        self
    }

    /// Makes profiling queries return device-domain nanoseconds.
    #[must_use]
    pub const fn with_device_based_timestamps(mut self, enabled: bool) -> Self {
        self.device_based_timestamps = enabled;
        self
    }

    /// Enables the timestamp-polling completion fast path.
    #[must_use]
    pub const fn with_timestamp_wait(mut self, enabled: bool) -> Self {
        self.timestamp_wait_enabled = enabled;
        self
    }

    /// Retains producer edges for diagnostics.
    #[must_use]
    pub const fn with_parent_tracking(mut self, enabled: bool) -> Self {
        self.track_parents = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_flags() {
        let config = EventConfig::new()
            .with_profiling(true)
            .with_timestamp_wait(true);
        assert!(config.profiling_enabled);
        assert!(config.timestamp_wait_enabled);
        assert!(!config.return_raw_timestamps);
    }
}
