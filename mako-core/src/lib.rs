//! Mako Core - Lock-Free Market Data and Trading Substrate
//!
//! The data-path core of a single-host, low-latency market maker. Market
//! data arrives over UDP multicast, flows through a lock-free pipeline into
//! per-symbol order books, and triggers quote generation on the same
//! cache-warm core; outbound orders leave over TCP after inline risk checks.
//!
//! ## Data Flow
//!
//! ```text
//! UDP datagram ──▶ MarketDataHandler ──▶ OrderBook (versioned levels)
//!                        │                     │
//!                        │ symbol map lookup   │ snapshot (copy-out)
//!                        ▼                     ▼
//!                  SlabPool<OrderBook>   BookSubscriber (strategy)
//!                                              │
//!                                              ▼
//!                                       OrderSubmitter (risk gates)
//!                                              │
//!                                              ▼
//!                                       OrderSink (TCP gateway)
//! ```
//!
//! Everything on the tick-to-trade path is allocation-free and lock-free:
//!
//! - [`sync`] - SPSC/MPSC ring buffers, open-addressed lock-free map,
//!   slab object pool
//! - [`orderbook`] - depth-10 ladder with per-side version counters and
//!   optimistic copy-out snapshots
//! - [`data`] - fixed-layout wire records and the market-data handler
//! - [`risk`] - position tracking and the risk-gated order submitter
//! - [`net`] - UDP multicast ingress and TCP order egress
//! - [`engine`] - thread wiring, CPU pinning, cooperative shutdown
//! - [`perf`] - calibrated monotonic clock, CPU affinity helpers
//! - [`utils`] - bit/price helpers and the drop-on-full log ring
//!
//! ## Threading Model
//!
//! Three logical threads:
//!
//! 1. **Market-data thread** (pinned): drains the socket, updates books,
//!    runs the strategy callback and risk checks, sends orders. Quote
//!    generation is deliberately co-located with decoding so the whole
//!    tick-to-trade path stays on one core.
//! 2. **Control plane** (the caller): registers symbols before start,
//!    observes position/PnL and drop counters, orchestrates shutdown.
//! 3. **Log drain**: pulls records off the lock-free log ring and forwards
//!    them to `tracing`; never on the critical path.
//!
//! Shutdown is cooperative through a single atomic `running` flag.

pub mod config;
pub mod core;
pub mod data;
pub mod engine;
pub mod net;
pub mod orderbook;
pub mod perf;
pub mod risk;
pub mod sync;
pub mod testing;
pub mod utils;

// Re-export the types most callers touch.
pub use crate::core::{fixed_point, OrderType, Side, Symbol};
pub use config::Config;
pub use data::{BookSubscriber, MarketDataHandler};
pub use engine::TradingSystem;
pub use orderbook::{BookSnapshot, OrderBook, MAX_DEPTH};
pub use risk::{OrderSink, OrderSubmitter, PositionTracker, RiskLimits, RiskRejection};

pub use anyhow::{Error, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::core::{fixed_point, OrderType, Side, Symbol};
    pub use crate::data::{BookSubscriber, MarketDataHandler, MarketDataEvent, OrderRecord};
    pub use crate::engine::TradingSystem;
    pub use crate::orderbook::{BookSnapshot, OrderBook, MAX_DEPTH};
    pub use crate::perf::clock;
    pub use crate::risk::{
        OrderSink, OrderSubmitter, PositionTracker, RiskLimits, RiskRejection, SubmitError,
    };
    pub use crate::utils::logger::{log_ring, LogSink};
    pub use crate::{Error, Result};
}
