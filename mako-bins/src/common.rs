//! Common utilities for binaries: CLI parsing, logging, signal handling.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// CLI arguments: a single optional config-file path.
#[derive(Parser, Debug)]
#[command(author, version, about = "Mako low-latency market maker")]
pub struct Args {
    /// Path to a key=value configuration file.
    pub config: Option<PathBuf>,
}

/// Initialize tracing. `RUST_LOG` overrides the default level.
pub fn init_logging(default_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_thread_ids(true))
        .with(filter)
        .init();

    Ok(())
}

/// Set when SIGINT/SIGTERM arrives.
pub static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn handle_signal(_signal: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Install SIGINT/SIGTERM handlers that flip [`SHUTDOWN`].
#[cfg(unix)]
pub fn install_signal_handlers() {
    let handler: extern "C" fn(libc::c_int) = handle_signal;
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
pub fn install_signal_handlers() {
    tracing::warn!("signal handling not supported on this platform; use process kill");
}

/// True once the operator asked us to stop.
pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}
