//! Hot-path logging
//!
//! Components on the market-data thread must never block or allocate to
//! log, so they write fixed-size records into a lock-free MPSC ring through
//! an owned [`LogSink`] handle. A dedicated drain thread pops records and
//! forwards them to `tracing`; when the ring is full the record is dropped
//! and a counter incremented - losing a log line is always preferable to
//! stalling the tick path.
//!
//! `tracing`/`tracing-subscriber` remain the backend for everything off
//! the hot path (initialization, control plane, shutdown).

use crate::perf::clock;
use crate::sync::mpsc::{self, MpscConsumer, MpscProducer};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the `tracing` subscriber. Called once from the binary.
pub fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

/// Ring capacity for hot-path log records.
pub const LOG_RING_CAPACITY: usize = 8192;

/// Maximum message bytes carried by one record.
pub const LOG_MSG_LEN: usize = 112;

/// Log severity, single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

/// Fixed-size log record; truncation beats allocation on the hot path.
#[derive(Clone, Copy)]
pub struct LogRecord {
    pub level: LogLevel,
    pub timestamp_ns: u64,
    len: u8,
    msg: [u8; LOG_MSG_LEN],
}

impl LogRecord {
    fn new(level: LogLevel, message: &str) -> Self {
        let mut msg = [0u8; LOG_MSG_LEN];
        let len = message.len().min(LOG_MSG_LEN);
        msg[..len].copy_from_slice(&message.as_bytes()[..len]);
        Self {
            level,
            timestamp_ns: clock::now_ns(),
            len: len as u8,
            msg,
        }
    }

    /// The (possibly truncated) message text.
    pub fn message(&self) -> &str {
        std::str::from_utf8(&self.msg[..self.len as usize]).unwrap_or("?")
    }
}

/// Cloneable non-blocking log handle for hot-path components.
#[derive(Clone)]
pub struct LogSink {
    tx: MpscProducer<LogRecord, LOG_RING_CAPACITY>,
    dropped: Arc<AtomicU64>,
}

impl LogSink {
    #[inline]
    pub fn log(&self, level: LogLevel, message: &str) {
        if self.tx.push(LogRecord::new(level, message)).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Records dropped because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer side of the log ring; owned by the drain thread.
pub struct LogDrain {
    rx: MpscConsumer<LogRecord, LOG_RING_CAPACITY>,
    dropped: Arc<AtomicU64>,
}

impl LogDrain {
    /// Drain until `running` goes false and the ring is empty.
    pub fn run(self, running: &AtomicBool) {
        let mut reported_dropped = 0u64;
        loop {
            match self.rx.pop() {
                Some(record) => emit(&record),
                None => {
                    if !running.load(Ordering::Acquire) {
                        break;
                    }
                    let dropped = self.dropped.load(Ordering::Relaxed);
                    if dropped > reported_dropped {
                        tracing::warn!(
                            "log ring overflow: {} records dropped",
                            dropped - reported_dropped
                        );
                        reported_dropped = dropped;
                    }
                    std::thread::sleep(std::time::Duration::from_micros(200));
                }
            }
        }
    }

    /// Drain whatever is currently queued (used by tests and shutdown).
    pub fn drain_now(&self) -> usize {
        let mut count = 0;
        while let Some(record) = self.rx.pop() {
            emit(&record);
            count += 1;
        }
        count
    }
}

fn emit(record: &LogRecord) {
    match record.level {
        LogLevel::Debug => {
            tracing::debug!(ts_ns = record.timestamp_ns, "{}", record.message())
        }
        LogLevel::Info => tracing::info!(ts_ns = record.timestamp_ns, "{}", record.message()),
        LogLevel::Warn => tracing::warn!(ts_ns = record.timestamp_ns, "{}", record.message()),
        LogLevel::Error => {
            tracing::error!(ts_ns = record.timestamp_ns, "{}", record.message())
        }
    }
}

/// Create a connected sink/drain pair over a fresh ring.
pub fn log_ring() -> (LogSink, LogDrain) {
    let (tx, rx) = mpsc::ring();
    let dropped = Arc::new(AtomicU64::new(0));
    (
        LogSink {
            tx,
            dropped: Arc::clone(&dropped),
        },
        LogDrain { rx, dropped },
    )
}
