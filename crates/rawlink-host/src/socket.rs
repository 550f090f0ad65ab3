use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    time::Duration,
};

use rawlink_core::{config::Config, transport::Transport};
use socket2::Socket as Socket2;

/// Applies socket options from configuration to a UdpSocket.
fn apply_socket_options(socket: &UdpSocket, config: &Config) -> io::Result<()> {
    // Create socket2::Socket from UdpSocket for advanced options
    let socket2 = Socket2::from(socket.try_clone()?);

    if let Some(size) = config.socket_recv_buffer_size {
        socket2.set_recv_buffer_size(size)?;
    }

    if let Some(size) = config.socket_send_buffer_size {
        socket2.set_send_buffer_size(size)?;
    }

    if let Some(ttl) = config.socket_ttl {
        socket.set_ttl(ttl)?;
    }

    if config.socket_broadcast {
        socket.set_broadcast(true)?;
    }

    // A zero read timeout is rejected by the OS, so poll at least every millisecond.
    let poll = config.socket_polling_timeout.max(Duration::from_millis(1));
    socket.set_read_timeout(Some(poll))?;

    Ok(())
}

/// Wildcard address of the same family as `endpoint`, on an ephemeral port.
pub(crate) fn unspecified_for(endpoint: &SocketAddr) -> SocketAddr {
    match endpoint {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    }
}

/// UDP transport with a bounded receive wait.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Binds a socket and applies the configured options.
    pub fn bind(address: SocketAddr, config: &Config) -> io::Result<Self> {
        let socket = UdpSocket::bind(address)?;
        apply_socket_options(&socket, config)?;
        Ok(UdpTransport { socket })
    }
}

impl Transport for UdpTransport {
    fn try_send(&mut self, addr: &SocketAddr, payload: &[u8]) -> io::Result<usize> {
        self.socket.send_to(payload, addr)
    }

    fn try_receive(&mut self, buffer: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buffer) {
            Ok((len, address)) => Ok(Some((len, address))),
            Err(err)
                if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn try_clone(&self) -> io::Result<Box<dyn Transport>> {
        Ok(Box::new(UdpTransport { socket: self.socket.try_clone()? }))
    }
}
