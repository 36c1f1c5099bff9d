//! Lock-free primitives for the tick-to-trade path
//!
//! Everything here is fixed-capacity and allocation-free after
//! construction:
//!
//! - [`spsc`] - single-producer/single-consumer ring (split handles)
//! - [`mpsc`] - Vyukov-style multi-producer/single-consumer ring
//! - [`map`] - open-addressed insert-only hash map (symbol lookup)
//! - [`slab`] - typed slab pool with stable indices (book storage)

pub mod map;
pub mod mpsc;
pub mod slab;
pub mod spsc;

pub use map::{LockFreeMap, MapKey};
pub use mpsc::{MpscConsumer, MpscProducer};
pub use slab::{SlabIndex, SlabPool};
pub use spsc::{SpscConsumer, SpscProducer};
