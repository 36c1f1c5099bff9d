//! Shared binary plumbing for the Mako trader.

pub mod common;
