//! Test and simulation helpers shared across the workspace.

use crate::data::OrderRecord;
use crate::risk::OrderSink;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// An [`OrderSink`] that records every order it is handed; optionally fails
/// the next send to exercise transport-error paths.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<OrderRecord>>,
    fail_next: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `send_order` fail with `BrokenPipe`.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::Relaxed);
    }

    /// Copy of everything sent so far.
    pub fn sent(&self) -> Vec<OrderRecord> {
        self.sent.lock().unwrap().clone()
    }
}

impl OrderSink for RecordingSink {
    fn send_order(&self, order: &OrderRecord) -> io::Result<()> {
        if self.fail_next.swap(false, Ordering::Relaxed) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "injected failure"));
        }
        self.sent.lock().unwrap().push(*order);
        Ok(())
    }
}
