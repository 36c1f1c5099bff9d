//! Market-data wire records and the hot-path handler.

pub mod handler;
pub mod types;

pub use handler::{BookSubscriber, HandlerStats, MarketDataHandler, BOOK_CAPACITY};
pub use types::{MarketDataEvent, OrderRecord, MARKET_DATA_EVENT_SIZE, ORDER_RECORD_SIZE};
