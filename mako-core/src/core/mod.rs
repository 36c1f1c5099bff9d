//! Core zero-overhead types
//!
//! Fundamental building blocks shared by every layer of the pipeline:
//! - [`Symbol`]: fixed 16-byte instrument identifier (no heap, wire-compatible)
//! - [`Side`] / [`OrderType`]: single-byte enums matching the wire encoding
//! - [`fixed_point`]: i64 fixed-point arithmetic for lock-free position/PnL
//!
//! All types are `Copy`, allocation-free, and safe to embed in the packed
//! wire records in [`crate::data`].

pub mod fixed_point;
pub mod types;

pub use types::{OrderType, Side, Symbol, SYMBOL_LEN};
