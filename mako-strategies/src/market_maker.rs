//! Market-making policy
//!
//! Quotes both sides of one instrument around an inventory-skewed fair
//! value. Long inventory shades the fair value down (to get hit on the
//! offer and sell out); short inventory shades it up. Quoting stops
//! one-sided near the position cap and entirely at it.
//!
//! All state is atomic: the market-data thread is the single writer, the
//! control plane reads with relaxed loads.

use mako_core::core::{OrderType, Side, Symbol};
use mako_core::data::{BookSubscriber, OrderRecord};
use mako_core::orderbook::{BookSnapshot, OrderBook};
use mako_core::perf::clock::{self, LatencyTimer};
use mako_core::risk::{OrderSink, OrderSubmitter, PositionTracker, SubmitError};
use mako_core::utils::bits::{set_bit, snap_to_tick, test_bit};
use mako_core::utils::logger::LogSink;
use mako_core::Config;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Markets wider than this are treated as illiquid and not quoted.
const MAX_QUOTE_SPREAD_BPS: f64 = 10.0;

/// Minimum interval between requotes.
const MIN_QUOTE_INTERVAL_NS: u64 = 100_000;

/// Stop adding inventory beyond this fraction of the position cap.
const QUOTE_CUTOFF: f64 = 0.8;

/// Submit latency above this is worth a warning.
const HIGH_LATENCY_WARN_NS: u64 = 10_000;

/// Bit positions in the quoted-sides flag byte.
const BID_QUOTED: u8 = 0;
const ASK_QUOTED: u8 = 1;

/// Quoting parameters.
#[derive(Debug, Clone, Copy)]
pub struct QuoteParams {
    /// Target spread as a fraction of fair value.
    pub spread_target: f64,
    /// Size quoted on each side.
    pub quote_size: f64,
    /// Inventory cap.
    pub max_position: f64,
    /// How aggressively inventory shades the fair value, in [0, 1].
    pub skew_factor: f64,
    /// Extra edge taken on both sides, as a fraction of fair value.
    pub edge: f64,
    /// Venue tick size; quotes are snapped onto this grid.
    pub tick_size: f64,
}

impl Default for QuoteParams {
    fn default() -> Self {
        Self {
            spread_target: 0.0002,
            quote_size: 100.0,
            max_position: 1000.0,
            skew_factor: 0.5,
            edge: 0.0001,
            tick_size: 0.01,
        }
    }
}

impl QuoteParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            spread_target: config.spread_threshold,
            quote_size: config.quote_size,
            max_position: config.max_position_size,
            skew_factor: config.skew_factor,
            edge: config.edge,
            tick_size: config.tick_size,
        }
    }
}

/// Single-instrument market maker.
pub struct MarketMaker<S: OrderSink> {
    params: QuoteParams,
    submitter: OrderSubmitter<S>,
    tracker: Arc<PositionTracker>,
    next_order_id: AtomicU64,
    last_quote_ns: AtomicU64,
    /// Which sides the last cycle actually quoted.
    quoted_sides: AtomicU8,
    quotes_sent: AtomicU64,
    quotes_rejected: AtomicU64,
    log: LogSink,
}

impl<S: OrderSink> MarketMaker<S> {
    pub fn new(params: QuoteParams, submitter: OrderSubmitter<S>, log: LogSink) -> Self {
        let tracker = Arc::clone(submitter.tracker());
        Self {
            params,
            submitter,
            tracker,
            next_order_id: AtomicU64::new(1),
            last_quote_ns: AtomicU64::new(0),
            quoted_sides: AtomicU8::new(0),
            quotes_sent: AtomicU64::new(0),
            quotes_rejected: AtomicU64::new(0),
            log,
        }
    }

    /// Evaluate a snapshot and requote if the gates allow it.
    pub fn on_snapshot(&self, snapshot: &BookSnapshot) {
        // Wide (or one-sided) books signal illiquidity; stand down.
        if snapshot.spread_bps() > MAX_QUOTE_SPREAD_BPS {
            return;
        }

        let now = clock::now_ns();
        if now.saturating_sub(self.last_quote_ns.load(Ordering::Relaxed)) < MIN_QUOTE_INTERVAL_NS
        {
            return;
        }

        let mid = snapshot.mid_price();
        if mid <= 0.0 {
            return;
        }

        let position = self.tracker.position();
        if position.abs() >= self.params.max_position {
            return;
        }

        // Shade fair value against current inventory.
        let skew = position / self.params.max_position * self.params.skew_factor;
        let fair = mid * (1.0 - skew);

        let half_spread = fair * self.params.spread_target / 2.0;
        let bid_px = snap_to_tick(
            fair - half_spread - fair * self.params.edge,
            self.params.tick_size,
        );
        let ask_px = snap_to_tick(
            fair + half_spread + fair * self.params.edge,
            self.params.tick_size,
        );

        let timer = LatencyTimer::start();
        let mut sides = 0u8;

        if position < self.params.max_position * QUOTE_CUTOFF
            && self.send_quote(snapshot.symbol, Side::Buy, bid_px, now)
        {
            set_bit(&mut sides, BID_QUOTED);
        }
        if position > -self.params.max_position * QUOTE_CUTOFF
            && self.send_quote(snapshot.symbol, Side::Sell, ask_px, now)
        {
            set_bit(&mut sides, ASK_QUOTED);
        }

        self.quoted_sides.store(sides, Ordering::Relaxed);
        self.last_quote_ns.store(clock::now_ns(), Ordering::Relaxed);

        if timer.elapsed_ns() > HIGH_LATENCY_WARN_NS {
            self.log.warn("high quote submit latency");
        }
    }

    fn send_quote(&self, symbol: Symbol, side: Side, price: f64, timestamp_ns: u64) -> bool {
        let order = OrderRecord::new(
            symbol,
            self.next_order_id.fetch_add(1, Ordering::Relaxed),
            side,
            OrderType::Limit,
            price,
            self.params.quote_size,
            timestamp_ns,
        );

        match self.submitter.submit(&order) {
            Ok(()) => {
                self.quotes_sent.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(SubmitError::Rejected(_)) => {
                // The gate said no; skip this side and move on.
                self.quotes_rejected.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(SubmitError::Transport(_)) => {
                // No retry at this layer; the submitter counted it.
                self.log.warn("order transport failure");
                false
            }
        }
    }

    pub fn position(&self) -> f64 {
        self.tracker.position()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.tracker.realized_pnl()
    }

    pub fn quotes_sent(&self) -> u64 {
        self.quotes_sent.load(Ordering::Relaxed)
    }

    pub fn quotes_rejected(&self) -> u64 {
        self.quotes_rejected.load(Ordering::Relaxed)
    }

    /// (bid quoted, ask quoted) in the last quoting cycle.
    pub fn quoted_sides(&self) -> (bool, bool) {
        let sides = self.quoted_sides.load(Ordering::Relaxed);
        (test_bit(sides, BID_QUOTED), test_bit(sides, ASK_QUOTED))
    }

    pub fn submitter(&self) -> &OrderSubmitter<S> {
        &self.submitter
    }
}

impl<S: OrderSink> BookSubscriber for MarketMaker<S> {
    #[inline]
    fn on_book_update(&self, book: &OrderBook) {
        let snapshot = book.snapshot();
        self.on_snapshot(&snapshot);
    }
}
