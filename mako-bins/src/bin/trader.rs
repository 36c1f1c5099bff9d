//! Mako trader binary
//!
//! Wires the whole pipeline from a config file: UDP market data in, books,
//! market-making strategy, risk gates, TCP orders out. Exits 0 on clean
//! SIGINT/SIGTERM shutdown, nonzero on any initialization failure.

use anyhow::{Context, Result};
use clap::Parser;
use mako_bins::common::{init_logging, install_signal_handlers, shutdown_requested, Args};
use mako_core::net::OrderGateway;
use mako_core::perf::clock;
use mako_core::risk::{OrderSubmitter, PositionTracker};
use mako_core::utils::logger::log_ring;
use mako_core::{Config, MarketDataHandler, TradingSystem};
use mako_strategies::{MarketMaker, QuoteParams};
use std::sync::Arc;
use std::time::Duration;

/// Liveness report cadence, in control-loop ticks (1 tick = 1s).
const REPORT_EVERY_TICKS: u32 = 10;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging("info")?;
    install_signal_handlers();

    tracing::info!("Mako trading system starting");

    // Anchor the monotonic clock to the wall clock before anything else
    // takes timestamps.
    let clock_skew = clock::now_ns() as i64 - mako_core::perf::Clock::wall_clock_ns() as i64;
    tracing::info!("clock calibrated (skew {}ns)", clock_skew);

    let config = match &args.config {
        Some(path) => {
            tracing::info!("loading config from {:?}", path);
            Config::load(path)?
        }
        None => {
            tracing::info!("no config file given; using defaults");
            Config::default()
        }
    };

    tracing::info!(
        "market data {}:{}, order gateway {}:{}",
        config.market_data_multicast_ip,
        config.market_data_port,
        config.order_gateway_ip,
        config.order_gateway_port,
    );

    let mut system = build_system(&config).context("initialization failed")?;
    system.start()?;

    tracing::info!("trading {} symbols: {}", config.symbol_list().len(), config.symbols);

    // Control plane loop: poll stats, report, watch for shutdown.
    let mut ticks = 0u32;
    while !shutdown_requested() && system.is_running() {
        std::thread::sleep(Duration::from_secs(1));
        system.poll_stats();
        ticks += 1;
        if ticks % REPORT_EVERY_TICKS == 0 {
            system.report();
            let maker = system.handler().subscriber();
            tracing::info!(
                quotes_sent = maker.quotes_sent(),
                quotes_rejected = maker.quotes_rejected(),
                position = maker.position(),
                realized_pnl = maker.realized_pnl(),
                "strategy status"
            );
        }
    }

    tracing::info!("shutting down");
    system.shutdown();
    Ok(())
}

/// Assemble gateway -> submitter -> strategy -> handler -> system.
fn build_system(config: &Config) -> Result<TradingSystem<MarketMaker<OrderGateway>>> {
    let (log_sink, log_drain) = log_ring();

    let gateway = OrderGateway::connect(&config.order_gateway_ip, config.order_gateway_port)?;

    let tracker = Arc::new(PositionTracker::new());
    let submitter = OrderSubmitter::new(gateway, config.risk_limits(), Arc::clone(&tracker));
    let maker = MarketMaker::new(QuoteParams::from_config(config), submitter, log_sink.clone());

    let mut handler = MarketDataHandler::new(maker);
    for symbol in config.symbol_list() {
        handler.add_symbol(symbol)?;
        tracing::info!("registered symbol {}", symbol);
    }

    TradingSystem::new(config, handler, tracker, log_sink, log_drain)
}
