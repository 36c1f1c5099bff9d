//! UDP multicast market-data ingress
//!
//! Joins the feed's multicast group and hands raw datagrams to the caller.
//! The receive loop lives in the engine; this type only owns socket setup:
//! a large receive buffer, optional busy-polling when kernel bypass is
//! requested, and a short read timeout so the market-data thread can
//! observe the shutdown flag.

use anyhow::{Context, Result};
use std::net::{Ipv4Addr, UdpSocket};
use std::time::Duration;

/// How long a blocking receive waits before giving the loop a chance to
/// poll the running flag.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Receive buffer request: market data bursts hard around opens/closes.
const RECV_BUFFER_BYTES: i32 = 2 * 1024 * 1024;

/// Multicast receiver for the market-data feed.
pub struct MarketDataReceiver {
    socket: UdpSocket,
}

impl MarketDataReceiver {
    /// Bind, join the multicast group, and tune the socket.
    ///
    /// `busy_poll_cpu` enables SO_BUSY_POLL (and pins the socket's softirq
    /// processing to the given core) when kernel bypass is configured;
    /// both are Linux-only and silently unavailable elsewhere.
    pub fn bind(multicast_ip: &str, port: u16, busy_poll_cpu: Option<i32>) -> Result<Self> {
        let group: Ipv4Addr = multicast_ip
            .parse()
            .with_context(|| format!("invalid multicast address '{multicast_ip}'"))?;

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
            .with_context(|| format!("failed to bind UDP port {port}"))?;
        socket
            .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
            .with_context(|| format!("failed to join multicast group {group}"))?;
        socket
            .set_read_timeout(Some(RECV_TIMEOUT))
            .context("failed to set UDP read timeout")?;

        let receiver = Self { socket };
        receiver.tune(busy_poll_cpu);
        Ok(receiver)
    }

    /// Receive one datagram into `buf`. Timeouts surface as
    /// `WouldBlock`/`TimedOut`; the caller's loop treats those as idle.
    #[inline]
    pub fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.socket.recv(buf)
    }

    #[cfg(unix)]
    fn tune(&self, busy_poll_cpu: Option<i32>) {
        use super::set_sockopt_i32;
        use std::os::fd::AsRawFd;

        let fd = self.socket.as_raw_fd();
        // Best-effort: a refused option is a log line, not a startup error.
        if !set_sockopt_i32(fd, libc::SOL_SOCKET, libc::SO_RCVBUF, RECV_BUFFER_BYTES) {
            tracing::warn!("failed to set SO_RCVBUF to {} bytes", RECV_BUFFER_BYTES);
        }

        #[cfg(target_os = "linux")]
        if let Some(cpu) = busy_poll_cpu {
            // Busy-poll the NIC queue instead of sleeping on interrupts.
            if set_sockopt_i32(fd, libc::SOL_SOCKET, libc::SO_BUSY_POLL, 50) {
                tracing::info!("SO_BUSY_POLL enabled (50us)");
            } else {
                tracing::warn!("SO_BUSY_POLL unavailable");
            }
            if cpu >= 0 && !set_sockopt_i32(fd, libc::SOL_SOCKET, libc::SO_INCOMING_CPU, cpu) {
                tracing::warn!("SO_INCOMING_CPU unavailable");
            }
        }
        #[cfg(not(target_os = "linux"))]
        if busy_poll_cpu.is_some() {
            tracing::warn!("kernel bypass options not supported on this platform");
        }
    }

    #[cfg(not(unix))]
    fn tune(&self, _busy_poll_cpu: Option<i32>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Side, Symbol};
    use crate::data::types::MarketDataEvent;
    use zerocopy::AsBytes;

    #[test]
    fn rejects_bad_multicast_address() {
        assert!(MarketDataReceiver::bind("not-an-ip", 0, None).is_err());
    }

    #[test]
    fn receives_a_datagram_loopback() {
        // 224.0.0.1 is all-hosts; joining is a no-op but valid everywhere.
        let receiver = match MarketDataReceiver::bind("224.0.0.1", 0, None) {
            Ok(r) => r,
            Err(_) => return, // sandboxed environments may forbid multicast
        };
        let port = receiver.socket.local_addr().unwrap().port();

        let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let event = MarketDataEvent::new(Symbol::new("AAPL"), Side::Buy, 0, 100.0, 1.0, 1);
        sender
            .send_to(event.as_bytes(), (Ipv4Addr::LOCALHOST, port))
            .unwrap();

        let mut buf = [0u8; 2048];
        let n = receiver.recv(&mut buf).unwrap();
        assert_eq!(n, event.as_bytes().len());
    }
}
