//! Fixed-point arithmetic for lock-free accounting
//!
//! Rust has no atomic f64, so position, notional, and PnL are carried as
//! i64 fixed-point with 9 decimal places inside plain atomics. Conversions
//! happen only at the edges (config load, reporting, risk comparisons).

/// Scale factor: 9 decimal places.
pub const SCALE: i64 = 1_000_000_000;

/// Convert an f64 quantity/price to fixed-point, rounding half away from zero.
#[inline(always)]
pub fn to_fixed(value: f64) -> i64 {
    let scaled = value * SCALE as f64;
    if scaled >= 0.0 {
        (scaled + 0.5) as i64
    } else {
        (scaled - 0.5) as i64
    }
}

/// Convert a fixed-point value back to f64.
#[inline(always)]
pub fn from_fixed(value: i64) -> f64 {
    value as f64 / SCALE as f64
}
