use std::io;

use rawlink_protocol::RejectReason;

/// Peer connection state machine.
///
/// A peer only moves forward: `Connecting -> Connected -> Closed` or
/// `Connecting -> Closed`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeerState {
    /// Handshake in progress
    #[default]
    Connecting,

    /// Handshake complete - payloads flow in both directions
    Connected,

    /// Session over, with the reason it ended
    Closed(CloseReason),
}

impl PeerState {
    /// Returns true if payloads may be sent and received
    pub fn is_connected(&self) -> bool {
        matches!(self, PeerState::Connected)
    }

    /// Returns true if the handshake has not completed yet
    pub fn is_connecting(&self) -> bool {
        matches!(self, PeerState::Connecting)
    }

    /// Returns true once the session has ended
    pub fn is_closed(&self) -> bool {
        matches!(self, PeerState::Closed(_))
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The transport failed while talking to the peer.
    Error(io::ErrorKind),
    /// Nothing was heard from the peer within the inactivity window.
    Timeout,
    /// One side stopped its network thread.
    Shutdown,
    /// An application closed the session with the given reason byte.
    Kicked(u8),
    /// The remote side refused the connect.
    Rejected(RejectReason),
    /// No answer to the connect arrived before the deadline.
    TimedOutConnecting,
}
