//! Market-data handler
//!
//! Owns the book storage (slab pool), the symbol -> book-index map, and
//! the single subscriber. `add_symbol` runs on the control plane before
//! the pipeline starts; `process_datagram`/`process_message` run only on
//! the market-data thread and must never allocate or block.
//!
//! Malformed input is dropped silently on the hot path - truncated
//! records, unknown symbols, and out-of-range levels each bump a relaxed
//! counter that the control plane reports through the log path.

use crate::core::Symbol;
use crate::data::types::{MarketDataEvent, MARKET_DATA_EVENT_SIZE};
use crate::orderbook::{OrderBook, MAX_DEPTH};
use crate::sync::{LockFreeMap, SlabIndex, SlabPool};
use anyhow::{bail, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use zerocopy::FromBytes;

/// Books the handler can track; bounds both the slab and the symbol map.
pub const BOOK_CAPACITY: usize = 256;

/// Subscriber capability: receives a read-only reference to the updated
/// book, on the market-data thread, once per applied record.
///
/// Implementations must not block; the expected shape is snapshot-and-act.
pub trait BookSubscriber {
    fn on_book_update(&self, book: &OrderBook);
}

/// No-op subscriber for tools that only maintain books.
impl BookSubscriber for () {
    #[inline(always)]
    fn on_book_update(&self, _book: &OrderBook) {}
}

/// Relaxed drop/processing counters, copied out for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerStats {
    pub records_applied: u64,
    pub truncated: u64,
    pub unknown_symbol: u64,
    pub invalid_level: u64,
}

/// Decodes inbound records and routes them into per-symbol books.
pub struct MarketDataHandler<S> {
    books: SlabPool<OrderBook>,
    symbols: LockFreeMap<Symbol, SlabIndex>,
    subscriber: S,
    records_applied: AtomicU64,
    truncated: AtomicU64,
    unknown_symbol: AtomicU64,
    invalid_level: AtomicU64,
}

impl<S: BookSubscriber> MarketDataHandler<S> {
    /// Build a handler around its one subscriber.
    pub fn new(subscriber: S) -> Self {
        Self {
            books: SlabPool::with_capacity(BOOK_CAPACITY),
            symbols: LockFreeMap::with_capacity(BOOK_CAPACITY),
            subscriber,
            records_applied: AtomicU64::new(0),
            truncated: AtomicU64::new(0),
            unknown_symbol: AtomicU64::new(0),
            invalid_level: AtomicU64::new(0),
        }
    }

    /// Register a symbol, allocating its book from the slab.
    ///
    /// Control-plane only, before the pipeline starts. Idempotent.
    pub fn add_symbol(&mut self, symbol: &str) -> Result<()> {
        let sym = Symbol::new(symbol);
        if self.symbols.find(&sym).is_some() {
            return Ok(());
        }

        let Some(index) = self.books.allocate(OrderBook::new(sym)) else {
            bail!("book pool exhausted registering '{symbol}' (capacity {BOOK_CAPACITY})");
        };
        if !self.symbols.insert(sym, index) {
            self.books.deallocate(index);
            bail!("symbol table full registering '{symbol}'");
        }
        Ok(())
    }

    /// Look up the live book for a symbol.
    #[inline]
    pub fn book(&self, symbol: &str) -> Option<&OrderBook> {
        self.book_for(&Symbol::new(symbol))
    }

    #[inline]
    fn book_for(&self, symbol: &Symbol) -> Option<&OrderBook> {
        let index = *self.symbols.find(symbol)?;
        self.books.get(index)
    }

    /// Process one datagram of back-to-back records. Market-data thread only.
    pub fn process_datagram(&self, data: &[u8]) {
        let mut offset = 0;
        while data.len() - offset >= MARKET_DATA_EVENT_SIZE {
            self.process_message(&data[offset..offset + MARKET_DATA_EVENT_SIZE]);
            offset += MARKET_DATA_EVENT_SIZE;
        }
        if offset == 0 || offset < data.len() {
            // Short datagram, or trailing partial record.
            self.truncated.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Process a single record, decoded in place from `data`.
    /// Market-data thread only.
    pub fn process_message(&self, data: &[u8]) {
        let Some(event) = MarketDataEvent::ref_from_prefix(data) else {
            self.truncated.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let Some(book) = self.book_for(&{ event.symbol }) else {
            self.unknown_symbol.fetch_add(1, Ordering::Relaxed);
            return;
        };

        if event.level as usize >= MAX_DEPTH {
            self.invalid_level.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let (level, price, quantity) = (event.level as usize, event.price, event.quantity);
        if event.side == 0 {
            book.update_bid(level, price, quantity);
        } else {
            book.update_ask(level, price, quantity);
        }
        self.records_applied.fetch_add(1, Ordering::Relaxed);

        self.subscriber.on_book_update(book);
    }

    /// The subscriber, for control-plane access to strategy state.
    #[inline]
    pub fn subscriber(&self) -> &S {
        &self.subscriber
    }

    /// Copy out the drop/processing counters.
    pub fn stats(&self) -> HandlerStats {
        HandlerStats {
            records_applied: self.records_applied.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
            unknown_symbol: self.unknown_symbol.load(Ordering::Relaxed),
            invalid_level: self.invalid_level.load(Ordering::Relaxed),
        }
    }

    /// Free book slots remaining.
    pub fn available_books(&self) -> usize {
        self.books.available()
    }
}
