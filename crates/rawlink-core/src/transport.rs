//! Transport abstraction for pluggable I/O.

use std::{io::Result, net::SocketAddr};

/// Low-level datagram socket abstraction.
///
/// This trait allows various transports (UDP, in-memory, etc.) to be plugged
/// into the network thread without coupling to a concrete implementation.
/// Each instance is used by exactly one thread; [`Transport::try_clone`] hands out
/// an independent instance over the same underlying socket.
pub trait Transport: Send {
    /// Sends a single datagram. Attempted exactly once.
    fn try_send(&mut self, addr: &SocketAddr, payload: &[u8]) -> Result<usize>;

    /// Waits a bounded time for a datagram.
    ///
    /// Returns `Ok(None)` when nothing arrived before the transport's poll timeout.
    fn try_receive(&mut self, buffer: &mut [u8]) -> Result<Option<(usize, SocketAddr)>>;

    /// Returns the socket address this transport is bound to.
    fn local_addr(&self) -> Result<SocketAddr>;

    /// Creates another handle on the same socket for use by a different thread.
    fn try_clone(&self) -> Result<Box<dyn Transport>>;
}
