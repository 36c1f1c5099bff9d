//! Small shared utilities: bit/price helpers and the hot-path log ring.

pub mod bits;
pub mod logger;

pub use bits::CompactPrice;
pub use logger::{log_ring, LogDrain, LogLevel, LogSink};
