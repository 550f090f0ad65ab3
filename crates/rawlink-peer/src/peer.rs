use std::{
    io,
    net::SocketAddr,
    sync::Arc,
    time::Instant,
};

use rawlink_core::{config::Config, sequence::WrappingSequence};
use rawlink_protocol::{DisconnectReason, Packet, PacketView, RejectReason};
use tracing::{debug, trace};

use crate::{
    peer_state::{CloseReason, PeerState},
    shared::{Direction, PeerShared},
};

/// Control packets a peer asks the network thread to send on its behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Connect carrying this peer's connection id and token
    Connect,
    /// Accept echoing the initiator's connection id and token
    Accept,
    /// Reject echoing the initiator's connection id and token
    Reject(RejectReason),
    /// Liveness probe
    Ping,
    /// Liveness reply
    Pong,
    /// Teardown notice
    Disconnect {
        /// Protocol reason
        reason: DisconnectReason,
        /// Application reason byte
        user_reason: u8,
    },
}

/// Lifecycle occurrences a peer reports to the network thread.
///
/// `Payload` refers to the data of the packet that was just processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerEvent {
    /// An inbound session was admitted.
    Connected,
    /// Our connect was accepted.
    ConnectAccepted,
    /// Our connect was refused.
    ConnectRejected(RejectReason),
    /// Our connect got no answer in time.
    ConnectTimedOut,
    /// A fresh payload arrived.
    Payload,
    /// An established session ended.
    Closed(CloseReason),
}

/// Instructions from a peer to the network thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Send a control packet to the peer's endpoint.
    Send(ControlMessage),
    /// Hand an event to the application.
    Emit(PeerEvent),
}

/// Represents a remote endpoint's connection lifecycle.
///
/// Owned by the network thread. Packets and timer ticks go in, [`Action`]s come out
/// through a caller-supplied vector so the hot path does not allocate.
#[derive(Debug)]
pub struct Peer {
    /// Last time we received a packet from this peer
    pub last_heard: Instant,
    /// Last time we sent a control packet to this peer
    pub last_sent: Instant,

    shared: Arc<PeerShared>,
    state: PeerState,
    /// Newest payload sequence delivered so far
    last_received_sequence: Option<u8>,
    /// When an unanswered connect gives up
    connect_deadline: Instant,
    /// When the initiator re-sends Connect
    next_connect_attempt: Instant,
    config: Config,
}

impl Peer {
    /// Creates a peer in the `Connecting` state.
    pub fn new(shared: Arc<PeerShared>, config: &Config, time: Instant) -> Peer {
        Peer {
            last_heard: time,
            last_sent: time,
            shared,
            state: PeerState::Connecting,
            last_received_sequence: None,
            connect_deadline: time + config.connect_timeout,
            next_connect_attempt: time,
            config: config.to_owned(),
        }
    }

    /// Starts an outbound handshake by sending the first Connect.
    pub fn begin_connect(&mut self, time: Instant, actions: &mut Vec<Action>) {
        debug_assert_eq!(self.shared.direction(), Direction::Outbound);
        debug!("connecting to {} (id {:#010x})", self.endpoint(), self.shared.connection_id());
        actions.push(Action::Send(ControlMessage::Connect));
        self.next_connect_attempt = time + self.config.connect_retry_interval;
    }

    /// Returns the authoritative state.
    pub fn state(&self) -> PeerState {
        self.state
    }

    /// Returns the identity shared with the application thread.
    pub fn shared(&self) -> &Arc<PeerShared> {
        &self.shared
    }

    /// Remote endpoint.
    pub fn endpoint(&self) -> SocketAddr {
        self.shared.endpoint()
    }

    /// Returns true once the peer reached `Closed` and can be dropped.
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Records that a control packet was sent to this peer.
    pub fn record_send(&mut self, time: Instant) {
        self.last_sent = time;
    }

    fn close(&mut self, reason: CloseReason) {
        debug!("peer {} closed: {:?}", self.endpoint(), reason);
        self.state = PeerState::Closed(reason);
    }

    /// Processes one decoded packet from this peer's endpoint.
    pub fn process_packet(&mut self, packet: &Packet, time: Instant, actions: &mut Vec<Action>) {
        if self.is_closed() {
            return;
        }
        self.last_heard = time;

        match packet.view() {
            PacketView::Connect { connection_id, .. } => {
                self.on_connect(connection_id, actions);
            }
            PacketView::Accept { connection_id, .. } => {
                if self.is_own_session(connection_id) && self.state.is_connecting() {
                    self.state = PeerState::Connected;
                    debug!("connect to {} accepted", self.endpoint());
                    actions.push(Action::Emit(PeerEvent::ConnectAccepted));
                }
            }
            PacketView::Reject { reason, connection_id, .. } => {
                if self.is_own_session(connection_id) && self.state.is_connecting() {
                    self.close(CloseReason::Rejected(reason));
                    actions.push(Action::Emit(PeerEvent::ConnectRejected(reason)));
                }
            }
            PacketView::Ping => {
                if self.state.is_connected() {
                    actions.push(Action::Send(ControlMessage::Pong));
                }
            }
            PacketView::Pong => {
                trace!("pong from {}", self.endpoint());
            }
            PacketView::Disconnect { reason, user_reason } => {
                // Only Accept, Reject or the deadline end a handshake.
                if self.state.is_connecting() {
                    trace!("ignoring disconnect from {} during handshake", self.endpoint());
                    return;
                }
                let close_reason = match reason {
                    DisconnectReason::Kicked => CloseReason::Kicked(user_reason),
                    DisconnectReason::Shutdown => CloseReason::Shutdown,
                    DisconnectReason::Timeout => CloseReason::Timeout,
                };
                self.close(close_reason);
                actions.push(Action::Emit(PeerEvent::Closed(close_reason)));
            }
            PacketView::Payload { sequence, .. } => {
                if !self.state.is_connected() {
                    trace!("payload from {} before the handshake completed", self.endpoint());
                    return;
                }
                let fresh = self
                    .last_received_sequence
                    .map_or(true, |last| sequence.is_newer_than(last));
                if fresh {
                    self.last_received_sequence = Some(sequence);
                    actions.push(Action::Emit(PeerEvent::Payload));
                } else {
                    trace!(
                        "dropping stale payload {} from {} (last {:?})",
                        sequence,
                        self.endpoint(),
                        self.last_received_sequence
                    );
                }
            }
        }
    }

    fn is_own_session(&self, connection_id: u32) -> bool {
        self.shared.direction() == Direction::Outbound
            && self.shared.connection_id() == connection_id
    }

    fn on_connect(&mut self, connection_id: u32, actions: &mut Vec<Action>) {
        if self.shared.direction() != Direction::Inbound
            || self.shared.connection_id() != connection_id
        {
            trace!("ignoring connect {:#010x} from {}", connection_id, self.endpoint());
            return;
        }
        match self.state {
            PeerState::Connecting => {
                self.state = PeerState::Connected;
                debug!("accepted {} (token {:?})", self.endpoint(), self.shared.token());
                actions.push(Action::Send(ControlMessage::Accept));
                actions.push(Action::Emit(PeerEvent::Connected));
            }
            // Our Accept was lost, answer the retry without a second event.
            PeerState::Connected => actions.push(Action::Send(ControlMessage::Accept)),
            PeerState::Closed(_) => {}
        }
    }

    /// Runs timer-driven transitions: connect retries and deadline, pings, inactivity.
    pub fn update(&mut self, time: Instant, actions: &mut Vec<Action>) {
        match self.state {
            PeerState::Connecting => {
                if time >= self.connect_deadline {
                    self.close(CloseReason::TimedOutConnecting);
                    if self.shared.direction() == Direction::Outbound {
                        actions.push(Action::Emit(PeerEvent::ConnectTimedOut));
                    }
                } else if self.shared.direction() == Direction::Outbound
                    && time >= self.next_connect_attempt
                {
                    actions.push(Action::Send(ControlMessage::Connect));
                    self.next_connect_attempt = time + self.config.connect_retry_interval;
                }
            }
            PeerState::Connected => {
                if time.saturating_duration_since(self.last_heard)
                    >= self.config.idle_connection_timeout
                {
                    self.close(CloseReason::Timeout);
                    actions.push(Action::Send(ControlMessage::Disconnect {
                        reason: DisconnectReason::Timeout,
                        user_reason: 0,
                    }));
                    actions.push(Action::Emit(PeerEvent::Closed(CloseReason::Timeout)));
                } else if time.saturating_duration_since(self.last_sent) >= self.config.ping_interval
                {
                    actions.push(Action::Send(ControlMessage::Ping));
                }
            }
            PeerState::Closed(_) => {}
        }
    }

    /// Closes the peer after the transport failed to reach it.
    pub fn on_transport_error(&mut self, kind: io::ErrorKind, actions: &mut Vec<Action>) {
        if self.is_closed() {
            return;
        }
        let reason = CloseReason::Error(kind);
        self.close(reason);
        actions.push(Action::Emit(PeerEvent::Closed(reason)));
    }

    /// Closes the peer because the local network thread is stopping.
    pub fn shutdown(&mut self, actions: &mut Vec<Action>) {
        if self.is_closed() {
            return;
        }
        self.close(CloseReason::Shutdown);
        actions.push(Action::Send(ControlMessage::Disconnect {
            reason: DisconnectReason::Shutdown,
            user_reason: 0,
        }));
        actions.push(Action::Emit(PeerEvent::Closed(CloseReason::Shutdown)));
    }

    /// Closes the peer silently after the local application closed it.
    /// The application already sent the Disconnect.
    pub fn abandon(&mut self) {
        if !self.is_closed() {
            self.close(CloseReason::Kicked(self.shared.user_close_reason()));
        }
    }
}
