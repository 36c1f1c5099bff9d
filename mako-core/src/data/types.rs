//! Fixed-layout wire records
//!
//! Both directions use packed, native-byte-order records with no framing:
//! inbound datagrams are one or more back-to-back [`MarketDataEvent`]s,
//! the outbound TCP stream is a sequence of [`OrderRecord`]s parsed by
//! size on the far end. `zerocopy` gives us in-place decode (no copy, no
//! allocation) and byte-exact encode; the packed repr makes the structs
//! alignment-1 so they can be viewed at any offset of a receive buffer.

use crate::core::{OrderType, Side, Symbol};
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

/// Inbound level-replace record: 42 bytes, no padding.
#[derive(Clone, Copy, FromZeroes, FromBytes, AsBytes, Unaligned)]
#[repr(C, packed)]
pub struct MarketDataEvent {
    pub symbol: Symbol,
    /// 0 = bid, 1 = ask.
    pub side: u8,
    /// Level index into the depth ladder.
    pub level: u8,
    pub price: f64,
    pub quantity: f64,
    pub timestamp: u64,
}

/// Wire size of one inbound record.
pub const MARKET_DATA_EVENT_SIZE: usize = std::mem::size_of::<MarketDataEvent>();

const _: () = assert!(MARKET_DATA_EVENT_SIZE == 42, "inbound record layout drifted");

impl MarketDataEvent {
    pub fn new(
        symbol: Symbol,
        side: Side,
        level: u8,
        price: f64,
        quantity: f64,
        timestamp: u64,
    ) -> Self {
        Self {
            symbol,
            side: side.as_u8(),
            level,
            price,
            quantity,
            timestamp,
        }
    }

    #[inline(always)]
    pub fn side(&self) -> Side {
        Side::from_u8(self.side)
    }
}

impl std::fmt::Debug for MarketDataEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Copy packed fields before formatting; references into a packed
        // struct are not allowed.
        let (symbol, side, level) = (self.symbol, self.side(), self.level);
        let (price, quantity, timestamp) = (self.price, self.quantity, self.timestamp);
        f.debug_struct("MarketDataEvent")
            .field("symbol", &symbol)
            .field("side", &side)
            .field("level", &level)
            .field("price", &price)
            .field("quantity", &quantity)
            .field("timestamp", &timestamp)
            .finish()
    }
}

/// Outbound order record: 50 bytes, no padding.
#[derive(Clone, Copy, FromZeroes, FromBytes, AsBytes, Unaligned)]
#[repr(C, packed)]
pub struct OrderRecord {
    pub symbol: Symbol,
    pub order_id: u64,
    /// 0 = buy, 1 = sell.
    pub side: u8,
    /// 0 = LIMIT, 1 = MARKET, 2 = IOC.
    pub order_type: u8,
    pub price: f64,
    pub quantity: f64,
    pub timestamp: u64,
}

/// Wire size of one outbound record.
pub const ORDER_RECORD_SIZE: usize = std::mem::size_of::<OrderRecord>();

const _: () = assert!(ORDER_RECORD_SIZE == 50, "outbound record layout drifted");

impl OrderRecord {
    pub fn new(
        symbol: Symbol,
        order_id: u64,
        side: Side,
        order_type: OrderType,
        price: f64,
        quantity: f64,
        timestamp: u64,
    ) -> Self {
        Self {
            symbol,
            order_id,
            side: side.as_u8(),
            order_type: order_type.as_u8(),
            price,
            quantity,
            timestamp,
        }
    }

    #[inline(always)]
    pub fn side(&self) -> Side {
        Side::from_u8(self.side)
    }
}

impl std::fmt::Debug for OrderRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (symbol, order_id, side) = (self.symbol, self.order_id, self.side());
        let (order_type, price, quantity) = (self.order_type, self.price, self.quantity);
        f.debug_struct("OrderRecord")
            .field("symbol", &symbol)
            .field("order_id", &order_id)
            .field("side", &side)
            .field("order_type", &order_type)
            .field("price", &price)
            .field("quantity", &quantity)
            .finish()
    }
}
