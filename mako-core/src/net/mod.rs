//! Network edges: UDP multicast ingress and TCP order egress.
//!
//! The sockets themselves are external collaborators; this module only
//! configures them for low latency and adapts them to the pipeline's
//! ingress/egress contracts.

pub mod tcp;
pub mod udp;

pub use tcp::OrderGateway;
pub use udp::MarketDataReceiver;

/// Set an integer socket option, returning whether the kernel accepted it.
#[cfg(unix)]
pub(crate) fn set_sockopt_i32(fd: i32, level: i32, option: i32, value: i32) -> bool {
    unsafe {
        libc::setsockopt(
            fd,
            level,
            option,
            &value as *const i32 as *const libc::c_void,
            std::mem::size_of::<i32>() as libc::socklen_t,
        ) == 0
    }
}
