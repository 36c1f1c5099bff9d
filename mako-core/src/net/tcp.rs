//! TCP order gateway egress
//!
//! Streams fixed-layout order records to the gateway with every
//! latency-relevant socket option set before the first byte: Nagle off,
//! quick ACKs, a large prioritized send buffer, and a user timeout so a
//! dead peer surfaces as a send failure within seconds rather than
//! minutes. The socket is non-blocking - on the hot path a full send
//! buffer is an error returned to the strategy, never a stall.

use crate::data::OrderRecord;
use crate::risk::OrderSink;
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};
use zerocopy::AsBytes;

const SEND_BUFFER_BYTES: i32 = 256 * 1024;
const USER_TIMEOUT_MS: i32 = 5_000;
const SOCKET_PRIORITY: i32 = 6;

/// Order gateway connection.
pub struct OrderGateway {
    stream: TcpStream,
    sent: AtomicU64,
    failures: AtomicU64,
}

impl OrderGateway {
    /// Connect and apply the low-latency socket options.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .with_context(|| format!("failed to connect to order gateway {host}:{port}"))?;

        stream
            .set_nodelay(true)
            .context("failed to disable Nagle's algorithm")?;
        stream
            .set_nonblocking(true)
            .context("failed to set non-blocking mode")?;
        Self::tune(&stream);

        tracing::info!("connected to order gateway {}:{}", host, port);
        Ok(Self {
            stream,
            sent: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        })
    }

    #[cfg(unix)]
    fn tune(stream: &TcpStream) {
        use super::set_sockopt_i32;
        use std::os::fd::AsRawFd;

        let fd = stream.as_raw_fd();
        if !set_sockopt_i32(fd, libc::SOL_SOCKET, libc::SO_SNDBUF, SEND_BUFFER_BYTES) {
            tracing::warn!("failed to set SO_SNDBUF to {} bytes", SEND_BUFFER_BYTES);
        }

        #[cfg(target_os = "linux")]
        {
            if !set_sockopt_i32(fd, libc::IPPROTO_TCP, libc::TCP_QUICKACK, 1) {
                tracing::warn!("TCP_QUICKACK unavailable");
            }
            if !set_sockopt_i32(fd, libc::SOL_SOCKET, libc::SO_PRIORITY, SOCKET_PRIORITY) {
                tracing::warn!("SO_PRIORITY unavailable");
            }
            // Give up on an unacknowledged send after 5s instead of the
            // kernel's default retransmission schedule.
            if !set_sockopt_i32(fd, libc::IPPROTO_TCP, libc::TCP_USER_TIMEOUT, USER_TIMEOUT_MS) {
                tracing::warn!("TCP_USER_TIMEOUT unavailable");
            }
        }
    }

    #[cfg(not(unix))]
    fn tune(_stream: &TcpStream) {}

    /// Records successfully written to the socket.
    pub fn orders_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Failed or short sends.
    pub fn send_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl OrderSink for OrderGateway {
    fn send_order(&self, order: &OrderRecord) -> io::Result<()> {
        let bytes = order.as_bytes();
        // io::Write is implemented for &TcpStream, so the hot path needs
        // no lock and no &mut.
        match (&self.stream).write(bytes) {
            Ok(n) if n == bytes.len() => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Ok(n) => {
                // Short write would shear the record stream; the record is
                // lost and the peer resynchronizes on reconnect.
                self.failures.fetch_add(1, Ordering::Relaxed);
                Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write: {n} of {} bytes", bytes.len()),
                ))
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OrderType, Side, Symbol};
    use crate::data::types::ORDER_RECORD_SIZE;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn connect_failure_is_an_error() {
        // Port 1 on localhost should refuse.
        assert!(OrderGateway::connect("127.0.0.1", 1).is_err());
    }

    #[test]
    fn sends_byte_exact_records() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let gateway = OrderGateway::connect("127.0.0.1", port).unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        let order = OrderRecord::new(
            Symbol::new("AAPL"),
            7,
            Side::Buy,
            OrderType::Limit,
            100.0,
            5.0,
            1,
        );
        gateway.send_order(&order).unwrap();
        assert_eq!(gateway.orders_sent(), 1);

        let mut buf = vec![0u8; ORDER_RECORD_SIZE];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(buf.as_slice(), order.as_bytes());
    }
}
