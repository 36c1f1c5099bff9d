//! Lock-free position accounting
//!
//! Position, average entry, realized PnL, and cumulative notional live in
//! fixed-point atomics on one cache line. Written only by the market-data
//! thread (the submitter runs inline with the strategy callback); the
//! control plane reads with relaxed loads.

use crate::core::fixed_point::{from_fixed, to_fixed};
use crate::core::Side;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Cache-aligned position state, shared between the strategy (reads for
/// skew), the submitter (writes on accepted orders), and the control plane
/// (reads for reporting).
#[repr(C, align(64))]
#[derive(Debug)]
pub struct PositionTracker {
    /// Signed quantity, fixed-point. Positive = long.
    quantity: AtomicI64,
    /// Average entry price, f64 bits.
    entry_price: AtomicU64,
    /// Realized PnL, fixed-point.
    realized_pnl: AtomicI64,
    /// Cumulative submitted notional, fixed-point.
    notional: AtomicI64,
    /// Accepted order count.
    trade_count: AtomicU64,
}

impl PositionTracker {
    pub const fn new() -> Self {
        Self {
            quantity: AtomicI64::new(0),
            entry_price: AtomicU64::new(0),
            realized_pnl: AtomicI64::new(0),
            notional: AtomicI64::new(0),
            trade_count: AtomicU64::new(0),
        }
    }

    /// Signed position quantity.
    #[inline(always)]
    pub fn position(&self) -> f64 {
        from_fixed(self.quantity.load(Ordering::Relaxed))
    }

    /// Realized PnL so far.
    #[inline(always)]
    pub fn realized_pnl(&self) -> f64 {
        from_fixed(self.realized_pnl.load(Ordering::Relaxed))
    }

    /// Cumulative submitted notional.
    #[inline(always)]
    pub fn notional(&self) -> f64 {
        from_fixed(self.notional.load(Ordering::Relaxed))
    }

    /// Average entry price of the open position (0 when flat).
    #[inline]
    pub fn entry_price(&self) -> f64 {
        f64::from_bits(self.entry_price.load(Ordering::Relaxed))
    }

    /// Accepted orders applied so far.
    #[inline]
    pub fn trade_count(&self) -> u64 {
        self.trade_count.load(Ordering::Relaxed)
    }

    /// Apply a fill at `price` for `quantity`, updating position, average
    /// entry, and realized PnL. Single-writer (market-data thread).
    pub fn apply_fill(&self, side: Side, price: f64, quantity: f64) {
        let qty = to_fixed(quantity);
        let signed = match side {
            Side::Buy => qty,
            Side::Sell => -qty,
        };

        let old = self.quantity.load(Ordering::Relaxed);
        let new = old + signed;

        if old != 0 && (old > 0) != (signed > 0) {
            // Reducing (or flipping): realize PnL on the closed portion.
            let closed = old.abs().min(qty);
            let entry = self.entry_price();
            let direction = if old > 0 { 1.0 } else { -1.0 };
            let pnl = (price - entry) * from_fixed(closed) * direction;
            self.realized_pnl
                .fetch_add(to_fixed(pnl), Ordering::Relaxed);

            if new == 0 {
                self.entry_price.store(0, Ordering::Relaxed);
            } else if (new > 0) != (old > 0) {
                // Flipped through flat: remainder opens at the fill price.
                self.entry_price.store(price.to_bits(), Ordering::Relaxed);
            }
        } else {
            // Opening or adding: weighted-average entry.
            let entry = if old == 0 {
                price
            } else {
                let old_f = from_fixed(old.abs());
                let add_f = from_fixed(qty);
                (self.entry_price() * old_f + price * add_f) / (old_f + add_f)
            };
            self.entry_price.store(entry.to_bits(), Ordering::Relaxed);
        }

        self.quantity.store(new, Ordering::Relaxed);
        self.notional
            .fetch_add(to_fixed(price * quantity), Ordering::Relaxed);
        self.trade_count.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}
