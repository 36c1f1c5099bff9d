//! Calibrated monotonic clock
//!
//! All hot-path timestamps come from a monotonic counter anchored to the
//! wall clock once at startup: `now_ns()` is monotonic (never jumps with
//! NTP) but reads as nanoseconds since the Unix epoch, so the same value
//! works for requote intervals, snapshot stamps, and the per-second order
//! rate window.

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Monotonic clock anchored to the wall clock at calibration time.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    base: Instant,
    wall_anchor_ns: u64,
}

impl Clock {
    /// Calibrate a new clock: pair a monotonic reading with the wall clock.
    ///
    /// Two wall samples bracket the monotonic base and the midpoint is used
    /// as the anchor, bounding the pairing error to half the bracket.
    pub fn calibrate() -> Self {
        let wall_before = Self::wall_clock_ns();
        let base = Instant::now();
        let wall_after = Self::wall_clock_ns();
        Self {
            base,
            wall_anchor_ns: wall_before + wall_after.saturating_sub(wall_before) / 2,
        }
    }

    /// Monotonic nanoseconds, wall-aligned at calibration.
    #[inline(always)]
    pub fn now_ns(&self) -> u64 {
        self.wall_anchor_ns + self.base.elapsed().as_nanos() as u64
    }

    /// Raw wall clock in nanoseconds since the Unix epoch.
    #[inline]
    pub fn wall_clock_ns() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

static GLOBAL: OnceLock<Clock> = OnceLock::new();

/// The process-wide clock, calibrated on first use.
#[inline]
pub fn global() -> &'static Clock {
    GLOBAL.get_or_init(Clock::calibrate)
}

/// Monotonic wall-aligned nanoseconds from the process-wide clock.
#[inline(always)]
pub fn now_ns() -> u64 {
    global().now_ns()
}

/// Measures the latency of a scope in nanoseconds.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    #[inline(always)]
    pub fn elapsed_ns(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let clock = Clock::calibrate();
        let a = clock.now_ns();
        let b = clock.now_ns();
        assert!(b >= a);
    }

    #[test]
    fn clock_tracks_wall_time() {
        let clock = Clock::calibrate();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let drift = clock.now_ns() as i64 - Clock::wall_clock_ns() as i64;
        // Within 100ms of the wall clock right after calibration.
        assert!(drift.abs() < 100_000_000, "drift {drift}ns");
    }

    #[test]
    fn latency_timer_measures_sleep() {
        let timer = LatencyTimer::start();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.elapsed_ns() >= 5_000_000);
    }
}
