//! End-to-end path: raw datagram bytes through the handler, strategy
//! callback, and risk gates, down to captured outbound records.

use mako_core::core::{OrderType, Side, Symbol};
use mako_core::data::{BookSubscriber, MarketDataEvent, MarketDataHandler, OrderRecord};
use mako_core::orderbook::OrderBook;
use mako_core::perf::clock;
use mako_core::risk::{
    OrderSubmitter, PositionTracker, RiskLimits, RiskRejection, SubmitError,
};
use mako_core::testing::RecordingSink;
use std::sync::Arc;
use zerocopy::AsBytes;

/// Minimal quoting subscriber: join the inside by one tick on every
/// update. Stands in for the full market maker so this crate's tests
/// exercise the subscriber contract without a strategy dependency.
struct InsideJoiner {
    submitter: OrderSubmitter<RecordingSink>,
}

impl BookSubscriber for InsideJoiner {
    fn on_book_update(&self, book: &OrderBook) {
        let snap = book.snapshot();
        if snap.bid_depth == 0 || snap.ask_depth == 0 {
            return;
        }
        let order = OrderRecord::new(
            snap.symbol,
            1,
            Side::Buy,
            OrderType::Limit,
            snap.best_bid() + 0.01,
            10.0,
            clock::now_ns(),
        );
        // Rejections are fine; the strategy just skips.
        let _ = self.submitter.submit(&order);
    }
}

fn event_bytes(symbol: &str, side: Side, level: u8, price: f64, qty: f64) -> Vec<u8> {
    MarketDataEvent::new(Symbol::new(symbol), side, level, price, qty, clock::now_ns())
        .as_bytes()
        .to_vec()
}

fn build_pipeline(limits: RiskLimits) -> MarketDataHandler<InsideJoiner> {
    let submitter = OrderSubmitter::new(
        RecordingSink::new(),
        limits,
        Arc::new(PositionTracker::new()),
    );
    let mut handler = MarketDataHandler::new(InsideJoiner { submitter });
    handler.add_symbol("AAPL").unwrap();
    handler
}

#[test]
fn datagram_to_outbound_order() {
    let handler = build_pipeline(RiskLimits::default());

    let mut datagram = event_bytes("AAPL", Side::Buy, 0, 100.00, 500.0);
    datagram.extend_from_slice(&event_bytes("AAPL", Side::Sell, 0, 100.01, 400.0));
    handler.process_datagram(&datagram);

    // The first record leaves the book one-sided (no order); the second
    // completes it and triggers a quote.
    let sent = handler.subscriber().submitter.sink().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].symbol, Symbol::new("AAPL"));
    let px = sent[0].price;
    assert!((px - 100.01).abs() < 1e-9);

    // Optimistic fill applied to position.
    let tracker = handler.subscriber().submitter.tracker();
    assert!((tracker.position() - 10.0).abs() < 1e-9);
}

#[test]
fn unknown_symbol_never_reaches_strategy() {
    let handler = build_pipeline(RiskLimits::default());

    let mut datagram = event_bytes("TSLA", Side::Buy, 0, 100.0, 500.0);
    datagram.extend_from_slice(&event_bytes("TSLA", Side::Sell, 0, 100.01, 400.0));
    handler.process_datagram(&datagram);

    assert!(handler.subscriber().submitter.sink().sent().is_empty());
    assert_eq!(handler.stats().unknown_symbol, 2);
}

#[test]
fn risk_gate_blocks_oversized_strategy_orders() {
    // Quote size (10.0) above the order-size cap.
    let handler = build_pipeline(RiskLimits {
        max_order_size: 5.0,
        ..RiskLimits::default()
    });

    let mut datagram = event_bytes("AAPL", Side::Buy, 0, 100.00, 500.0);
    datagram.extend_from_slice(&event_bytes("AAPL", Side::Sell, 0, 100.01, 400.0));
    handler.process_datagram(&datagram);

    let submitter = &handler.subscriber().submitter;
    assert!(submitter.sink().sent().is_empty());
    assert_eq!(submitter.rejected(), 1);
    assert_eq!(submitter.tracker().position(), 0.0);
}

#[test]
fn rejection_reason_is_typed() {
    let tracker = Arc::new(PositionTracker::new());
    let submitter = OrderSubmitter::new(
        RecordingSink::new(),
        RiskLimits {
            max_order_size: 100.0,
            ..RiskLimits::default()
        },
        tracker,
    );

    let order = OrderRecord::new(
        Symbol::new("AAPL"),
        1,
        Side::Buy,
        OrderType::Limit,
        100.0,
        101.0,
        clock::now_ns(),
    );
    match submitter.submit(&order) {
        Err(SubmitError::Rejected(reason)) => {
            assert_eq!(reason, RiskRejection::OrderSize);
            assert_eq!(reason.to_string(), "ORDER_SIZE");
        }
        other => panic!("expected ORDER_SIZE rejection, got {other:?}"),
    }
}

#[test]
fn books_update_even_when_strategy_declines() {
    let handler = build_pipeline(RiskLimits::default());

    // One-sided book: subscriber returns without quoting, levels still land.
    handler.process_datagram(&event_bytes("AAPL", Side::Buy, 0, 99.99, 250.0));
    handler.process_datagram(&event_bytes("AAPL", Side::Buy, 1, 99.98, 100.0));

    let book = handler.book("AAPL").unwrap();
    let snap = book.snapshot();
    assert_eq!(snap.bid_depth, 2);
    assert_eq!(snap.best_bid(), 99.99);
    assert_eq!(snap.bids[1].price, 99.98);
    assert!(handler.subscriber().submitter.sink().sent().is_empty());
}
