//! CPU affinity and thread priority
//!
//! Pinning the market-data thread to an isolated core keeps its caches warm
//! and removes scheduler-induced latency jitter.

use anyhow::Result;
use core_affinity::CoreId;

/// Pin the current thread to a specific CPU core.
pub fn pin_to_core(core: usize) -> Result<()> {
    let core_id = CoreId { id: core };

    if core_affinity::set_for_current(core_id) {
        tracing::info!("Pinned thread to CPU core {}", core);
        Ok(())
    } else {
        anyhow::bail!("Failed to pin thread to core {}", core)
    }
}

/// Set SCHED_FIFO real-time priority (Linux only).
///
/// Requires CAP_SYS_NICE or root.
#[cfg(target_os = "linux")]
pub fn set_realtime_priority(priority: i32) -> Result<()> {
    use libc::{sched_param, sched_setscheduler, SCHED_FIFO};

    unsafe {
        let param = sched_param {
            sched_priority: priority,
        };

        if sched_setscheduler(0, SCHED_FIFO, &param) == 0 {
            tracing::info!("Set thread priority to SCHED_FIFO:{}", priority);
            Ok(())
        } else {
            anyhow::bail!("Failed to set thread priority (may need CAP_SYS_NICE or root)")
        }
    }
}

/// Real-time priority is a no-op off Linux.
#[cfg(not(target_os = "linux"))]
pub fn set_realtime_priority(_priority: i32) -> Result<()> {
    tracing::warn!("Real-time priority setting not supported on this platform");
    Ok(())
}

/// Number of available CPU cores.
pub fn num_cores() -> usize {
    core_affinity::get_core_ids()
        .map(|ids| ids.len())
        .unwrap_or(1)
}
