//! Performance utilities: CPU pinning and the calibrated clock.

pub mod clock;
pub mod cpu;

pub use clock::{Clock, LatencyTimer};
pub use cpu::{num_cores, pin_to_core, set_realtime_priority};
