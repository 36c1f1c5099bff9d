//! Depth-10 order book with versioned copy-out snapshots
//!
//! One writer (the market-data thread) overwrites price levels in place;
//! readers take value copies. Level fields are stored as relaxed atomics -
//! the per-side `sequence` word carries all ordering: every level update
//! bumps it with release, and `snapshot` reads it with acquire before
//! copying, so a snapshot taken after the N-th update observes a sequence
//! >= N on that side.
//!
//! The snapshot is deliberately optimistic: the sequence is not re-checked
//! after the copy, so a reader racing the writer can observe a level mid
//! overwrite. Consumers treat snapshots as consistent-enough for quoting
//! and can compare `sequence` across snapshots to detect staleness. Level
//! ordering (descending bids, ascending asks) is the producer's
//! responsibility; the book publishes exactly what it was given.

use crate::core::Symbol;
use crate::perf::clock;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Number of price levels tracked per side.
pub const MAX_DEPTH: usize = 10;

/// One price level. Aligned to its own cache line so neighbouring levels
/// (and levels of other books in the slab) never false-share.
#[repr(C, align(64))]
pub(crate) struct AtomicLevel {
    /// f64 bits.
    price: AtomicU64,
    /// f64 bits.
    quantity: AtomicU64,
    order_count: AtomicU32,
}

impl AtomicLevel {
    const fn new() -> Self {
        Self {
            price: AtomicU64::new(0),
            quantity: AtomicU64::new(0),
            order_count: AtomicU32::new(0),
        }
    }

    #[inline(always)]
    fn store(&self, price: f64, quantity: f64) {
        // Field order matters for partially-observed writes: price, then
        // quantity, then the (reserved) order count.
        self.price.store(price.to_bits(), Ordering::Relaxed);
        self.quantity.store(quantity.to_bits(), Ordering::Relaxed);
        self.order_count.store(0, Ordering::Relaxed);
    }

    #[inline(always)]
    fn load(&self) -> Level {
        Level {
            price: f64::from_bits(self.price.load(Ordering::Relaxed)),
            quantity: f64::from_bits(self.quantity.load(Ordering::Relaxed)),
            order_count: self.order_count.load(Ordering::Relaxed),
        }
    }
}

/// Plain value copy of a price level.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Level {
    pub price: f64,
    pub quantity: f64,
    pub order_count: u32,
}

/// One side of the book: a fixed ladder plus depth and version counters,
/// each on its own cache line.
struct Ladder {
    levels: [AtomicLevel; MAX_DEPTH],
    /// Highest level index ever written, plus one.
    depth: CachePadded<AtomicU32>,
    /// Bumped once per level update, release-ordered.
    sequence: CachePadded<AtomicU64>,
}

impl Ladder {
    fn new() -> Self {
        Self {
            levels: [const { AtomicLevel::new() }; MAX_DEPTH],
            depth: CachePadded::new(AtomicU32::new(0)),
            sequence: CachePadded::new(AtomicU64::new(0)),
        }
    }

    #[inline(always)]
    fn update(&self, level: usize, price: f64, quantity: f64) {
        if level >= MAX_DEPTH {
            return;
        }

        self.levels[level].store(price, quantity);

        if level as u32 >= self.depth.load(Ordering::Relaxed) {
            self.depth.store(level as u32 + 1, Ordering::Relaxed);
        }

        // Publishes the level writes above to any acquire reader.
        self.sequence.fetch_add(1, Ordering::Release);
    }
}

/// Per-symbol limit order book.
///
/// Created once at symbol registration and never destroyed; level contents
/// are overwritten in place for the life of the process.
pub struct OrderBook {
    symbol: Symbol,
    bids: Ladder,
    asks: Ladder,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: Ladder::new(),
            asks: Ladder::new(),
        }
    }

    #[inline]
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// Overwrite bid level `level`. No-op when `level >= MAX_DEPTH`.
    /// Producer thread only.
    #[inline(always)]
    pub fn update_bid(&self, level: usize, price: f64, quantity: f64) {
        self.bids.update(level, price, quantity);
    }

    /// Overwrite ask level `level`. No-op when `level >= MAX_DEPTH`.
    /// Producer thread only.
    #[inline(always)]
    pub fn update_ask(&self, level: usize, price: f64, quantity: f64) {
        self.asks.update(level, price, quantity);
    }

    /// Best bid price: single-word read of level 0.
    #[inline(always)]
    pub fn best_bid(&self) -> f64 {
        f64::from_bits(self.bids.levels[0].price.load(Ordering::Relaxed))
    }

    /// Best ask price: single-word read of level 0.
    #[inline(always)]
    pub fn best_ask(&self) -> f64 {
        f64::from_bits(self.asks.levels[0].price.load(Ordering::Relaxed))
    }

    /// Mid price from the top-of-book words.
    #[inline(always)]
    pub fn mid_price(&self) -> f64 {
        (self.best_bid() + self.best_ask()) / 2.0
    }

    /// Current bid-side version counter.
    #[inline]
    pub fn bid_sequence(&self) -> u64 {
        self.bids.sequence.load(Ordering::Acquire)
    }

    /// Current ask-side version counter.
    #[inline]
    pub fn ask_sequence(&self) -> u64 {
        self.asks.sequence.load(Ordering::Acquire)
    }

    /// Copy out the whole book. Safe from any thread.
    pub fn snapshot(&self) -> BookSnapshot {
        // Acquire the sequences first so every update published before
        // them is visible in the copies below.
        let bid_sequence = self.bids.sequence.load(Ordering::Acquire);
        let ask_sequence = self.asks.sequence.load(Ordering::Acquire);

        let bid_depth = self.bids.depth.load(Ordering::Relaxed);
        let ask_depth = self.asks.depth.load(Ordering::Relaxed);

        let mut bids = [Level::default(); MAX_DEPTH];
        let mut asks = [Level::default(); MAX_DEPTH];
        for i in 0..MAX_DEPTH {
            bids[i] = self.bids.levels[i].load();
            asks[i] = self.asks.levels[i].load();
        }

        BookSnapshot {
            symbol: self.symbol,
            bids,
            asks,
            bid_depth,
            ask_depth,
            bid_sequence,
            ask_sequence,
            timestamp_ns: clock::now_ns(),
        }
    }
}

/// Point-in-time value copy of a book.
#[derive(Debug, Clone, Copy)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    pub bids: [Level; MAX_DEPTH],
    pub asks: [Level; MAX_DEPTH],
    pub bid_depth: u32,
    pub ask_depth: u32,
    pub bid_sequence: u64,
    pub ask_sequence: u64,
    pub timestamp_ns: u64,
}

impl BookSnapshot {
    /// Best bid, or 0.0 when the bid side is empty.
    #[inline]
    pub fn best_bid(&self) -> f64 {
        if self.bid_depth > 0 {
            self.bids[0].price
        } else {
            0.0
        }
    }

    /// Best ask, or +inf when the ask side is empty.
    #[inline]
    pub fn best_ask(&self) -> f64 {
        if self.ask_depth > 0 {
            self.asks[0].price
        } else {
            f64::INFINITY
        }
    }

    #[inline]
    pub fn mid_price(&self) -> f64 {
        (self.best_bid() + self.best_ask()) / 2.0
    }

    #[inline]
    pub fn spread(&self) -> f64 {
        self.best_ask() - self.best_bid()
    }

    /// Spread in basis points of mid. +inf when either side is empty or
    /// the mid is not positive, so wide-spread gates also reject books
    /// that are not two-sided yet.
    #[inline]
    pub fn spread_bps(&self) -> f64 {
        let mid = self.mid_price();
        if mid > 0.0 && mid.is_finite() {
            self.spread() / mid * 10_000.0
        } else {
            f64::INFINITY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_book() -> OrderBook {
        let book = OrderBook::new(Symbol::new("AAPL"));
        book.update_bid(0, 100.00, 500.0);
        book.update_bid(1, 99.99, 300.0);
        book.update_ask(0, 100.01, 400.0);
        book.update_ask(1, 100.02, 200.0);
        book
    }

    #[test]
    fn top_of_book_and_mid() {
        let book = sample_book();
        assert_eq!(book.best_bid(), 100.00);
        assert_eq!(book.best_ask(), 100.01);
        assert!((book.mid_price() - 100.005).abs() < 1e-9);
    }

    #[test]
    fn snapshot_reflects_updates() {
        let book = sample_book();
        let snap = book.snapshot();

        assert_eq!(snap.bid_depth, 2);
        assert_eq!(snap.ask_depth, 2);
        assert_eq!(snap.best_bid(), 100.00);
        assert_eq!(snap.best_ask(), 100.01);
        assert!((snap.mid_price() - 100.005).abs() < 1e-9);
        assert!((snap.spread() - 0.01).abs() < 1e-9);
        assert_eq!(snap.bids[1].price, 99.99);
        assert_eq!(snap.bids[1].quantity, 300.0);
        assert_eq!(snap.bids[1].order_count, 0);
        assert_eq!(snap.symbol.as_str(), "AAPL");
    }

    #[test]
    fn sequence_increments_once_per_update() {
        let book = OrderBook::new(Symbol::new("TEST"));
        let before = book.bid_sequence();
        book.update_bid(0, 10.0, 1.0);
        book.update_bid(1, 9.0, 1.0);
        assert_eq!(book.bid_sequence(), before + 2);
        assert_eq!(book.ask_sequence(), 0);
    }

    #[test]
    fn depth_tracks_highest_level_written() {
        let book = OrderBook::new(Symbol::new("TEST"));
        book.update_bid(4, 10.0, 1.0);
        let snap = book.snapshot();
        assert_eq!(snap.bid_depth, 5);
        // Depth never shrinks.
        book.update_bid(0, 11.0, 1.0);
        assert_eq!(book.snapshot().bid_depth, 5);
    }

    #[test]
    fn update_at_max_depth_is_noop() {
        let book = sample_book();
        let seq = book.bid_sequence();
        book.update_bid(MAX_DEPTH, 1.0, 1.0);
        let snap = book.snapshot();
        assert_eq!(book.bid_sequence(), seq);
        assert_eq!(snap.bid_depth, 2);
        assert_eq!(snap.best_bid(), 100.00);
    }

    #[test]
    fn empty_sides_have_sentinel_prices() {
        let book = OrderBook::new(Symbol::new("TEST"));
        let snap = book.snapshot();
        assert_eq!(snap.best_bid(), 0.0);
        assert_eq!(snap.best_ask(), f64::INFINITY);
        assert_eq!(snap.spread_bps(), f64::INFINITY);
    }

    #[test]
    fn concurrent_snapshots_while_updating() {
        use std::sync::Arc;
        use std::thread;

        let book = Arc::new(OrderBook::new(Symbol::new("TEST")));

        let writer = {
            let book = Arc::clone(&book);
            thread::spawn(move || {
                for i in 0..10_000 {
                    let px = 100.0 + (i as f64) * 0.001;
                    book.update_bid(0, px, 100.0);
                    book.update_ask(0, px + 0.01, 100.0);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let book = Arc::clone(&book);
                thread::spawn(move || {
                    let mut last_seq = 0;
                    for _ in 0..10_000 {
                        let snap = book.snapshot();
                        // Versions never run backwards.
                        assert!(snap.bid_sequence >= last_seq);
                        last_seq = snap.bid_sequence;
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }

        let snap = book.snapshot();
        assert_eq!(snap.bid_sequence, 10_000);
        assert_eq!(snap.ask_sequence, 10_000);
    }
}
