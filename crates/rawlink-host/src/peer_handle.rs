//! Application-side handle on a peer.

use std::{
    fmt, io,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
};

use crossbeam_channel::Sender;
use rawlink_core::{
    constants::{DEFAULT_MTU, MAX_PAYLOAD_DATA_SIZE},
    error::{ErrorKind, Result},
    transport::Transport,
    ByteBuffer,
};
use rawlink_peer::{CloseReason, Direction, PeerShared, PeerState};
use rawlink_protocol::{DisconnectReason, Packet};
use tracing::debug;

use crate::controller::{send_packet, Command};

/// Writer used by the application thread, separate from the network thread's handle
/// on the same socket so neither touches the other's send buffer.
pub(crate) struct AppSender {
    transport: Box<dyn Transport>,
    buffer: ByteBuffer,
    packet: Packet,
    /// Reports failed sends to the network thread, which owns peer state.
    commands: Sender<Command>,
}

impl AppSender {
    pub(crate) fn new(transport: Box<dyn Transport>, commands: Sender<Command>) -> Self {
        Self {
            transport,
            buffer: ByteBuffer::with_capacity(DEFAULT_MTU),
            packet: Packet::default(),
            commands,
        }
    }

    fn send(&mut self, addr: &SocketAddr) -> io::Result<usize> {
        send_packet(self.transport.as_mut(), &mut self.buffer, &self.packet, addr)
    }
}

/// Writer slot shared by every handle of one core. `None` while the core is stopped.
pub(crate) type SharedSender = Arc<Mutex<Option<AppSender>>>;

pub(crate) fn lock_sender(sender: &SharedSender) -> MutexGuard<'_, Option<AppSender>> {
    sender.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle on one remote endpoint, handed out by `NetCore::connect` and event callbacks.
///
/// The state is a mirror updated while events are dispatched by `NetCore::poll_events`.
/// Clones refer to the same peer.
#[derive(Clone)]
pub struct PeerHandle {
    shared: Arc<PeerShared>,
    sender: SharedSender,
}

impl PeerHandle {
    pub(crate) fn new(shared: Arc<PeerShared>, sender: SharedSender) -> Self {
        Self { shared, sender }
    }

    pub(crate) fn shared(&self) -> &Arc<PeerShared> {
        &self.shared
    }

    /// Current state as last reported by an event.
    pub fn state(&self) -> PeerState {
        self.shared.state()
    }

    /// Remote endpoint.
    pub fn endpoint(&self) -> SocketAddr {
        self.shared.endpoint()
    }

    /// Handshake token sent (outbound) or received (inbound).
    pub fn token(&self) -> &str {
        self.shared.token()
    }

    /// Session id chosen by the initiator.
    pub fn connection_id(&self) -> u32 {
        self.shared.connection_id()
    }

    /// Which side opened the session.
    pub fn direction(&self) -> Direction {
        self.shared.direction()
    }

    /// Sends one payload datagram, attempted exactly once.
    ///
    /// Returns the number of bytes the transport accepted. There is no
    /// acknowledgement or retransmission. A transport failure is returned as is
    /// and also closes the peer, reported later as a closed event.
    pub fn send(&self, data: &[u8]) -> Result<usize> {
        if data.len() > MAX_PAYLOAD_DATA_SIZE {
            return Err(ErrorKind::PayloadTooLarge { len: data.len(), max: MAX_PAYLOAD_DATA_SIZE });
        }
        if !self.state().is_connected() || self.shared.is_closed_by_user() {
            return Err(ErrorKind::NotConnected);
        }

        let mut guard = lock_sender(&self.sender);
        let sender = guard.as_mut().ok_or(ErrorKind::NotRunning)?;
        sender.packet.set_payload(self.shared.next_sequence(), data);
        match sender.send(&self.endpoint()) {
            Ok(sent) => Ok(sent),
            Err(e) => {
                debug!("payload to {} failed: {}", self.endpoint(), e);
                let command = Command::TransportError(Arc::clone(&self.shared), e.kind());
                if sender.commands.send(command).is_err() {
                    debug!("network thread gone, failure not reported");
                }
                Err(e.into())
            }
        }
    }

    /// Closes the session from this side.
    ///
    /// One best-effort Disconnect carrying `user_reason` is sent, and no further
    /// events are dispatched for this peer. Closing twice does nothing.
    pub fn close(&self, user_reason: u8) {
        if !self.shared.mark_closed_by_user(user_reason) {
            return;
        }
        self.shared.set_state(PeerState::Closed(CloseReason::Kicked(user_reason)));

        let mut guard = lock_sender(&self.sender);
        if let Some(sender) = guard.as_mut() {
            sender.packet.set_disconnect(DisconnectReason::Kicked, user_reason);
            if let Err(e) = sender.send(&self.endpoint()) {
                debug!("disconnect to {} failed: {}", self.endpoint(), e);
            }
        }
    }
}

impl fmt::Debug for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerHandle")
            .field("endpoint", &self.endpoint())
            .field("connection_id", &self.connection_id())
            .field("state", &self.state())
            .finish()
    }
}

impl PartialEq for PeerHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for PeerHandle {}
