//! Risk-gated order submitter
//!
//! Every outbound order passes four checks, in order: order size, projected
//! position, per-second rate, cumulative notional. A failed check returns a
//! typed rejection and leaves all state untouched. A passed order is
//! forwarded to the transport and then applied to the position tracker as
//! if it filled immediately.
//!
//! Known limitation, preserved from the system's design: position is
//! updated optimistically on submission rather than reconciled against an
//! acknowledgement or fills stream, so it reflects intent, not confirmed
//! inventory.

use crate::core::Side;
use crate::data::OrderRecord;
use crate::perf::clock;
use crate::risk::PositionTracker;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Outbound transport capability. The send must be bounded and
/// non-blocking: a full buffer is an error, not a stall.
pub trait OrderSink {
    fn send_order(&self, order: &OrderRecord) -> io::Result<()>;
}

/// Risk limits, fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct RiskLimits {
    pub max_order_size: f64,
    pub max_position: f64,
    pub max_notional: f64,
    pub max_orders_per_second: u32,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_order_size: 100.0,
            max_position: 1000.0,
            max_notional: 1_000_000.0,
            max_orders_per_second: 100,
        }
    }
}

/// Which gate rejected the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RiskRejection {
    OrderSize = 0,
    PositionLimit = 1,
    RateLimit = 2,
    NotionalLimit = 3,
}

impl fmt::Display for RiskRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskRejection::OrderSize => write!(f, "ORDER_SIZE"),
            RiskRejection::PositionLimit => write!(f, "POSITION_LIMIT"),
            RiskRejection::RateLimit => write!(f, "RATE_LIMIT"),
            RiskRejection::NotionalLimit => write!(f, "NOTIONAL_LIMIT"),
        }
    }
}

/// Submission failure: a risk gate fired, or the transport failed.
#[derive(Debug)]
pub enum SubmitError {
    Rejected(RiskRejection),
    Transport(io::Error),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Rejected(reason) => write!(f, "risk rejection: {reason}"),
            SubmitError::Transport(e) => write!(f, "transport failure: {e}"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// Gates outbound orders and forwards accepted ones to the transport.
pub struct OrderSubmitter<S: OrderSink> {
    sink: S,
    limits: RiskLimits,
    tracker: Arc<PositionTracker>,
    /// Orders accepted in the current wall-clock second.
    orders_this_second: AtomicU32,
    /// The wall-clock second the counter belongs to.
    current_second: AtomicU64,
    submitted: AtomicU64,
    rejected: AtomicU64,
    transport_failures: AtomicU64,
}

impl<S: OrderSink> OrderSubmitter<S> {
    pub fn new(sink: S, limits: RiskLimits, tracker: Arc<PositionTracker>) -> Self {
        Self {
            sink,
            limits,
            tracker,
            orders_this_second: AtomicU32::new(0),
            current_second: AtomicU64::new(0),
            submitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
        }
    }

    /// Submit an order through the risk gates. Market-data thread only.
    pub fn submit(&self, order: &OrderRecord) -> Result<(), SubmitError> {
        let (quantity, price) = (order.quantity, order.price);
        let side = order.side();

        // 1. Order size.
        if !(quantity > 0.0 && quantity <= self.limits.max_order_size) {
            return self.reject(RiskRejection::OrderSize);
        }

        // 2. Projected position.
        let current = self.tracker.position();
        let projected = match side {
            Side::Buy => current + quantity,
            Side::Sell => current - quantity,
        };
        if projected.abs() > self.limits.max_position {
            return self.reject(RiskRejection::PositionLimit);
        }

        // 3. Rate: reset the counter when the wall-clock second changes.
        let second = clock::now_ns() / 1_000_000_000;
        if self.current_second.swap(second, Ordering::Relaxed) != second {
            self.orders_this_second.store(0, Ordering::Relaxed);
        }
        if self.orders_this_second.load(Ordering::Relaxed) >= self.limits.max_orders_per_second {
            return self.reject(RiskRejection::RateLimit);
        }

        // 4. Notional.
        if self.tracker.notional() + price * quantity > self.limits.max_notional {
            return self.reject(RiskRejection::NotionalLimit);
        }

        // All gates passed: forward, then account as an immediate fill.
        if let Err(e) = self.sink.send_order(order) {
            self.transport_failures.fetch_add(1, Ordering::Relaxed);
            return Err(SubmitError::Transport(e));
        }

        self.orders_this_second.fetch_add(1, Ordering::Relaxed);
        self.tracker.apply_fill(side, price, quantity);
        self.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    #[inline]
    fn reject(&self, reason: RiskRejection) -> Result<(), SubmitError> {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        Err(SubmitError::Rejected(reason))
    }

    #[inline]
    pub fn tracker(&self) -> &Arc<PositionTracker> {
        &self.tracker
    }

    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn transport_failures(&self) -> u64 {
        self.transport_failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OrderType, Symbol};
    use crate::testing::RecordingSink;

    fn order(side: Side, price: f64, quantity: f64) -> OrderRecord {
        OrderRecord::new(
            Symbol::new("AAPL"),
            1,
            side,
            OrderType::Limit,
            price,
            quantity,
            clock::now_ns(),
        )
    }

    fn submitter(limits: RiskLimits) -> OrderSubmitter<RecordingSink> {
        OrderSubmitter::new(
            RecordingSink::new(),
            limits,
            Arc::new(PositionTracker::new()),
        )
    }

    #[test]
    fn accepts_and_applies_valid_order() {
        let s = submitter(RiskLimits::default());
        s.submit(&order(Side::Buy, 100.0, 50.0)).unwrap();

        assert_eq!(s.sink().sent().len(), 1);
        assert!((s.tracker().position() - 50.0).abs() < 1e-9);
        assert_eq!(s.submitted(), 1);
    }

    #[test]
    fn oversized_order_rejected_position_unchanged() {
        let s = submitter(RiskLimits {
            max_order_size: 100.0,
            ..RiskLimits::default()
        });

        let err = s.submit(&order(Side::Buy, 100.0, 101.0)).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Rejected(RiskRejection::OrderSize)
        ));
        assert_eq!(s.tracker().position(), 0.0);
        assert!(s.sink().sent().is_empty());
    }

    #[test]
    fn zero_and_negative_sizes_rejected() {
        let s = submitter(RiskLimits::default());
        for qty in [0.0, -5.0] {
            let err = s.submit(&order(Side::Buy, 100.0, qty)).unwrap_err();
            assert!(matches!(
                err,
                SubmitError::Rejected(RiskRejection::OrderSize)
            ));
        }
    }

    #[test]
    fn position_limit_blocks_projected_breach() {
        let s = submitter(RiskLimits {
            max_position: 100.0,
            ..RiskLimits::default()
        });
        s.submit(&order(Side::Buy, 10.0, 60.0)).unwrap();

        let err = s.submit(&order(Side::Buy, 10.0, 50.0)).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Rejected(RiskRejection::PositionLimit)
        ));
        // Selling away from the limit is still allowed.
        s.submit(&order(Side::Sell, 10.0, 50.0)).unwrap();
    }

    #[test]
    fn rate_limit_caps_orders_per_second() {
        let s = submitter(RiskLimits {
            max_orders_per_second: 3,
            max_notional: f64::MAX,
            ..RiskLimits::default()
        });

        for _ in 0..3 {
            s.submit(&order(Side::Buy, 1.0, 1.0)).unwrap();
        }
        let err = s.submit(&order(Side::Buy, 1.0, 1.0)).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Rejected(RiskRejection::RateLimit)
        ));
        assert_eq!(s.sink().sent().len(), 3);
    }

    #[test]
    fn notional_limit_enforced() {
        let s = submitter(RiskLimits {
            max_notional: 1000.0,
            ..RiskLimits::default()
        });
        s.submit(&order(Side::Buy, 100.0, 8.0)).unwrap();

        let err = s.submit(&order(Side::Buy, 100.0, 3.0)).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Rejected(RiskRejection::NotionalLimit)
        ));
        assert!((s.tracker().notional() - 800.0).abs() < 1e-6);
    }

    #[test]
    fn transport_failure_does_not_touch_position() {
        let sink = RecordingSink::new();
        sink.fail_next();
        let s = OrderSubmitter::new(
            sink,
            RiskLimits::default(),
            Arc::new(PositionTracker::new()),
        );

        let err = s.submit(&order(Side::Buy, 100.0, 10.0)).unwrap_err();
        assert!(matches!(err, SubmitError::Transport(_)));
        assert_eq!(s.tracker().position(), 0.0);
        assert_eq!(s.transport_failures(), 1);
    }
}
