//! Pipeline wiring
//!
//! Binds the transports, handler, strategy, and submitter into the
//! process's thread layout:
//!
//! - **market-data thread** (`mako-md`, pinned): socket drain, book
//!   updates, strategy callback, risk checks, outbound send - the whole
//!   tick-to-trade path on one core.
//! - **control plane**: the caller's thread; polls stats, reports, and
//!   orchestrates shutdown.
//! - **log drain** (`mako-log`): empties the lock-free log ring.
//!
//! Per-datagram handling latency flows from the market-data thread to the
//! control plane over an SPSC ring (exactly one producer, one consumer)
//! and is aggregated off the hot path. Shutdown is cooperative via a
//! single atomic `running` flag.

use crate::config::Config;
use crate::data::{BookSubscriber, MarketDataHandler};
use crate::net::MarketDataReceiver;
use crate::perf::clock::LatencyTimer;
use crate::perf::cpu::pin_to_core;
use crate::risk::PositionTracker;
use crate::sync::spsc::{self, SpscConsumer, SpscProducer};
use crate::utils::logger::{LogDrain, LogSink};
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Latency samples in flight between the MD thread and the control plane.
const LATENCY_RING_CAPACITY: usize = 4096;

/// Receive buffer: comfortably larger than any feed datagram.
const RECV_BUF_SIZE: usize = 65536;

/// Aggregated handling-latency statistics, owned by the control plane.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatencyStats {
    pub samples: u64,
    pub total_ns: u64,
    pub max_ns: u64,
}

impl LatencyStats {
    #[inline]
    fn record(&mut self, ns: u64) {
        self.samples += 1;
        self.total_ns += ns;
        self.max_ns = self.max_ns.max(ns);
    }

    pub fn mean_ns(&self) -> u64 {
        if self.samples == 0 {
            0
        } else {
            self.total_ns / self.samples
        }
    }
}

/// The assembled trading pipeline.
///
/// Generic over the subscriber so the binary chooses the strategy; the
/// whole stack monomorphizes with no dynamic dispatch on the tick path.
pub struct TradingSystem<S> {
    running: Arc<AtomicBool>,
    handler: Arc<MarketDataHandler<S>>,
    tracker: Arc<PositionTracker>,
    receiver: Option<MarketDataReceiver>,
    log_sink: LogSink,
    log_drain: Option<LogDrain>,
    latency_tx: Option<SpscProducer<u64, LATENCY_RING_CAPACITY>>,
    latency_rx: SpscConsumer<u64, LATENCY_RING_CAPACITY>,
    latency: LatencyStats,
    md_cpu: i32,
    md_thread: Option<JoinHandle<()>>,
    log_thread: Option<JoinHandle<()>>,
}

impl<S: BookSubscriber + Send + Sync + 'static> TradingSystem<S> {
    /// Assemble the pipeline. The handler arrives fully registered; the
    /// log ring pair is shared with the components that write to it.
    pub fn new(
        config: &Config,
        handler: MarketDataHandler<S>,
        tracker: Arc<PositionTracker>,
        log_sink: LogSink,
        log_drain: LogDrain,
    ) -> Result<Self> {
        let busy_poll_cpu = config
            .enable_kernel_bypass
            .then_some(config.market_data_cpu);
        let receiver = MarketDataReceiver::bind(
            &config.market_data_multicast_ip,
            config.market_data_port,
            busy_poll_cpu,
        )
        .context("market data receiver setup failed")?;

        let (latency_tx, latency_rx) = spsc::ring();

        Ok(Self {
            running: Arc::new(AtomicBool::new(true)),
            handler: Arc::new(handler),
            tracker,
            receiver: Some(receiver),
            log_sink,
            log_drain: Some(log_drain),
            latency_tx: Some(latency_tx),
            latency_rx,
            latency: LatencyStats::default(),
            md_cpu: config.market_data_cpu,
            md_thread: None,
            log_thread: None,
        })
    }

    /// Spawn the market-data and log-drain threads.
    pub fn start(&mut self) -> Result<()> {
        let receiver = self
            .receiver
            .take()
            .context("trading system already started")?;
        let latency_tx = self.latency_tx.take().context("latency ring already taken")?;
        let log_drain = self.log_drain.take().context("log drain already taken")?;

        let running = Arc::clone(&self.running);
        let handler = Arc::clone(&self.handler);
        let sink = self.log_sink.clone();
        let md_cpu = self.md_cpu;

        self.md_thread = Some(
            std::thread::Builder::new()
                .name("mako-md".to_string())
                .spawn(move || {
                    if md_cpu >= 0 {
                        if let Err(e) = pin_to_core(md_cpu as usize) {
                            tracing::warn!("market data thread not pinned: {e}");
                        }
                    }
                    md_loop(&receiver, &handler, &latency_tx, &sink, &running);
                })
                .context("failed to spawn market data thread")?,
        );

        let running = Arc::clone(&self.running);
        self.log_thread = Some(
            std::thread::Builder::new()
                .name("mako-log".to_string())
                .spawn(move || log_drain.run(&running))
                .context("failed to spawn log drain thread")?,
        );

        tracing::info!("trading system started");
        Ok(())
    }

    /// Drain pending latency samples into the aggregate. Control plane.
    pub fn poll_stats(&mut self) {
        while let Some(ns) = self.latency_rx.pop() {
            self.latency.record(ns);
        }
    }

    /// Log a liveness report. Control plane.
    pub fn report(&self) {
        let stats = self.handler.stats();
        tracing::info!(
            position = self.tracker.position(),
            realized_pnl = self.tracker.realized_pnl(),
            records = stats.records_applied,
            truncated = stats.truncated,
            unknown_symbol = stats.unknown_symbol,
            invalid_level = stats.invalid_level,
            handle_mean_ns = self.latency.mean_ns(),
            handle_max_ns = self.latency.max_ns,
            log_dropped = self.log_sink.dropped(),
            "system running"
        );
    }

    /// True while the market-data thread is alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self
                .md_thread
                .as_ref()
                .map(|h| !h.is_finished())
                .unwrap_or(false)
    }

    /// Request cooperative shutdown and join all threads.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.md_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.log_thread.take() {
            let _ = handle.join();
        }
        self.poll_stats();
        tracing::info!(
            final_position = self.tracker.position(),
            final_pnl = self.tracker.realized_pnl(),
            "trading system stopped"
        );
    }

    #[inline]
    pub fn handler(&self) -> &MarketDataHandler<S> {
        &self.handler
    }

    #[inline]
    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    #[inline]
    pub fn latency(&self) -> LatencyStats {
        self.latency
    }
}

/// The market-data thread body: drain the socket until told to stop.
fn md_loop<S: BookSubscriber>(
    receiver: &MarketDataReceiver,
    handler: &MarketDataHandler<S>,
    latency_tx: &SpscProducer<u64, LATENCY_RING_CAPACITY>,
    sink: &LogSink,
    running: &AtomicBool,
) {
    let mut buf = [0u8; RECV_BUF_SIZE];

    sink.info("market data thread started");
    while running.load(Ordering::Acquire) {
        match receiver.recv(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                let timer = LatencyTimer::start();
                handler.process_datagram(&buf[..n]);
                // Sample dropped on overflow; the control plane only needs
                // a statistical picture.
                let _ = latency_tx.push(timer.elapsed_ns());
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            Err(e) => {
                sink.error(&format!("market data receive failed: {e}"));
                break;
            }
        }
    }
    sink.info("market data thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_stats_aggregate() {
        let mut stats = LatencyStats::default();
        for ns in [100, 200, 600] {
            stats.record(ns);
        }
        assert_eq!(stats.samples, 3);
        assert_eq!(stats.mean_ns(), 300);
        assert_eq!(stats.max_ns, 600);
    }
}
