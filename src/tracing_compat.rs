//! Structured logging seam.
//!
//! Every module logs through this re-export rather than naming the
//! `tracing` crate directly, keeping the logging backend swappable in
//! one place. Hot paths (status polling, CAS transitions) log at
//! `trace`; state changes that a debugger of a stuck pipeline would
//! want to see log at `debug`.

pub use tracing::{debug, error, info, trace, warn};
