//! Mako Strategies - quote generation policies
//!
//! Strategies implement [`mako_core::BookSubscriber`] and run inline on
//! the market-data thread: the handler applies a level update, the
//! strategy snapshots the book, decides, and submits synchronously through
//! the risk-gated submitter. Nothing here allocates or blocks per tick.

pub mod market_maker;

pub use market_maker::{MarketMaker, QuoteParams};
