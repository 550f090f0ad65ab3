use std::{
    collections::HashMap,
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Instant,
};

use crossbeam_channel::Receiver;
use rawlink_core::{
    config::Config,
    constants::{DEFAULT_MTU, PROTOCOL_VERSION},
    transport::Transport,
    ByteBuffer, ObjectPool,
};
use rawlink_peer::{Action, ControlMessage, Direction, Peer, PeerEvent, PeerShared};
use rawlink_protocol::{Packet, PacketDecoder, PacketEncoder, PacketKind, RejectReason};
use tracing::{debug, error, trace, warn};

use crate::{
    event_queue::EventProducer,
    event_types::{EventKind, NetEvent},
    time::Clock,
};

/// Requests from the application thread to the network thread.
#[derive(Debug)]
pub(crate) enum Command {
    /// Start an outbound handshake for this peer.
    Connect(Arc<PeerShared>),
    /// A payload send from the application thread failed.
    TransportError(Arc<PeerShared>, io::ErrorKind),
}

// ============================================================================
// Outbound helpers
// ============================================================================

/// Encodes `packet` into `buffer` and sends it in one attempt.
pub(crate) fn send_packet(
    transport: &mut dyn Transport,
    buffer: &mut ByteBuffer,
    packet: &Packet,
    addr: &SocketAddr,
) -> io::Result<usize> {
    buffer.reset();
    PacketEncoder::encode_into(buffer, packet);
    transport.try_send(addr, buffer.as_slice())
}

fn send_control(
    transport: &mut dyn Transport,
    buffer: &mut ByteBuffer,
    packet: &mut Packet,
    shared: &PeerShared,
    message: ControlMessage,
) -> io::Result<usize> {
    let (id, token) = (shared.connection_id(), shared.token());
    match message {
        ControlMessage::Connect => packet.set_connect(id, token),
        ControlMessage::Accept => packet.set_accept(id, token),
        ControlMessage::Reject(reason) => packet.set_reject(reason, id, token),
        ControlMessage::Ping => packet.set_ping(),
        ControlMessage::Pong => packet.set_pong(),
        ControlMessage::Disconnect { reason, user_reason } => {
            packet.set_disconnect(reason, user_reason)
        }
    }
    send_packet(transport, buffer, packet, &shared.endpoint())
}

fn emit(
    events: &mut EventProducer,
    shared: &Arc<PeerShared>,
    event: PeerEvent,
    packet: Option<&Packet>,
) {
    if shared.is_closed_by_user() {
        trace!("suppressing {:?} for {}, closed locally", event, shared.endpoint());
        return;
    }
    let mut net_event: NetEvent = events.acquire();
    let peer = Arc::clone(shared);
    match event {
        PeerEvent::Connected => net_event.set(peer, EventKind::PeerConnected),
        PeerEvent::ConnectAccepted => net_event.set(peer, EventKind::ConnectAccepted),
        PeerEvent::ConnectRejected(reason) => {
            net_event.set(peer, EventKind::ConnectRejected(reason))
        }
        PeerEvent::ConnectTimedOut => net_event.set(peer, EventKind::ConnectTimedOut),
        PeerEvent::Closed(reason) => net_event.set(peer, EventKind::PeerClosed(reason)),
        PeerEvent::Payload => net_event.set_payload(peer, packet.map_or(&[][..], Packet::data)),
    }
    events.push(net_event);
}

// ============================================================================
// Controller
// ============================================================================

/// Owns every peer and runs the receive, process, sweep loop on the network thread.
pub(crate) struct Controller {
    config: Config,
    transport: Box<dyn Transport>,
    peers: HashMap<SocketAddr, Peer>,
    receive_buffer: ByteBuffer,
    send_buffer: ByteBuffer,
    packets: ObjectPool<Packet>,
    /// Scratch packet for control-plane sends
    outgoing: Packet,
    actions: Vec<Action>,
    sweep_list: Vec<SocketAddr>,
    events: EventProducer,
    commands: Receiver<Command>,
    clock: Arc<dyn Clock>,
    accept_inbound: bool,
    stop: Arc<AtomicBool>,
    /// Consecutive failed receives
    receive_errors: u32,
}

impl Controller {
    pub(crate) fn new(
        config: Config,
        transport: Box<dyn Transport>,
        events: EventProducer,
        commands: Receiver<Command>,
        clock: Arc<dyn Clock>,
        accept_inbound: bool,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Controller {
            receive_buffer: ByteBuffer::with_capacity(config.receive_buffer_max_size),
            send_buffer: ByteBuffer::with_capacity(DEFAULT_MTU),
            packets: ObjectPool::with_warm_up(config.packet_pool_size.min(4), config.packet_pool_size),
            outgoing: Packet::default(),
            actions: Vec::with_capacity(8),
            sweep_list: Vec::new(),
            peers: HashMap::new(),
            config,
            transport,
            events,
            commands,
            clock,
            accept_inbound,
            stop,
            receive_errors: 0,
        }
    }

    /// Runs until the stop flag is raised, then shuts every peer down.
    pub(crate) fn run(mut self) {
        let mut next_sweep = self.clock.now();
        while !self.stop.load(Ordering::Acquire) {
            let now = self.clock.now();
            self.receive(now);
            let now = self.clock.now();
            self.process_commands(now);
            if now >= next_sweep {
                self.sweep(now);
                next_sweep = now + self.config.socket_polling_timeout;
            }
        }
        self.shutdown();
    }

    /// Number of peers currently tracked.
    #[cfg(test)]
    pub(crate) fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Waits once for a datagram and dispatches it.
    pub(crate) fn receive(&mut self, time: Instant) {
        let slot = self.receive_buffer.recv_slot();
        match self.transport.try_receive(slot) {
            Ok(Some((len, address))) => {
                self.receive_errors = 0;
                self.receive_buffer.set_len(len);
                self.handle_datagram(address, time);
            }
            Ok(None) => self.receive_errors = 0,
            // ICMP port unreachable surfaces here on some platforms.
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                debug!("receive reported connection reset: {}", e);
            }
            Err(e) => {
                self.receive_errors = self.receive_errors.saturating_add(1);
                if self.receive_errors.is_power_of_two() {
                    error!(
                        "Encountered an error receiving data ({} in a row): {:?}",
                        self.receive_errors, e
                    );
                }
                // The socket did not wait, so back off before the next attempt.
                thread::sleep(self.config.socket_polling_timeout);
            }
        }
    }

    fn handle_datagram(&mut self, address: SocketAddr, time: Instant) {
        let mut packet = self.packets.acquire();
        if let Err(e) = PacketDecoder::decode_into(&mut self.receive_buffer, &mut packet) {
            warn!("dropping malformed datagram from {}: {}", address, e);
            self.packets.release(packet);
            return;
        }

        if let Some(peer) = self.peers.get_mut(&address) {
            peer.process_packet(&packet, time, &mut self.actions);
            self.apply_actions(address, Some(&packet), time);
        } else if packet.kind() == PacketKind::Connect {
            self.admit(address, &packet, time);
        } else {
            trace!("ignoring {:?} from unknown endpoint {}", packet.kind(), address);
        }
        self.packets.release(packet);
    }

    /// Creates an inbound peer for a Connect, or answers it with a Reject.
    fn admit(&mut self, address: SocketAddr, packet: &Packet, time: Instant) {
        let rejection = if packet.version() != PROTOCOL_VERSION {
            Some(RejectReason::VersionMismatch)
        } else if !self.accept_inbound {
            Some(RejectReason::NotAccepting)
        } else if self.peers.len() >= self.config.max_peers {
            Some(RejectReason::ServerFull)
        } else if packet.token().len() > self.config.token_limit() {
            Some(RejectReason::TokenTooLong)
        } else {
            None
        };

        if let Some(reason) = rejection {
            warn!("rejecting connect from {}: {:?}", address, reason);
            self.outgoing.set_reject(reason, packet.connection_id(), packet.token());
            if let Err(e) = send_packet(
                self.transport.as_mut(),
                &mut self.send_buffer,
                &self.outgoing,
                &address,
            ) {
                warn!("failed to send reject to {}: {}", address, e);
            }
            return;
        }

        let shared = PeerShared::new(address, packet.token(), packet.connection_id(), Direction::Inbound);
        let mut peer = Peer::new(Arc::new(shared), &self.config, time);
        peer.process_packet(packet, time, &mut self.actions);
        self.peers.insert(address, peer);
        self.apply_actions(address, Some(packet), time);
    }

    /// Drains pending requests from the application thread.
    pub(crate) fn process_commands(&mut self, time: Instant) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Connect(shared) => self.start_connect(shared, time),
                Command::TransportError(shared, kind) => self.fail_peer(&shared, kind, time),
            }
        }
    }

    fn fail_peer(&mut self, shared: &Arc<PeerShared>, kind: io::ErrorKind, time: Instant) {
        let endpoint = shared.endpoint();
        let Some(peer) = self.peers.get_mut(&endpoint) else {
            return;
        };
        // The session may already have been replaced.
        if !Arc::ptr_eq(peer.shared(), shared) {
            return;
        }
        warn!("send to {} failed: {:?}", endpoint, kind);
        peer.on_transport_error(kind, &mut self.actions);
        self.apply_actions(endpoint, None, time);
    }

    fn start_connect(&mut self, shared: Arc<PeerShared>, time: Instant) {
        if shared.is_closed_by_user() {
            return;
        }
        let endpoint = shared.endpoint();
        if self.peers.contains_key(&endpoint) {
            debug!("already have a peer for {}", endpoint);
            emit(
                &mut self.events,
                &shared,
                PeerEvent::ConnectRejected(RejectReason::AlreadyConnected),
                None,
            );
            return;
        }
        let mut peer = Peer::new(shared, &self.config, time);
        peer.begin_connect(time, &mut self.actions);
        self.peers.insert(endpoint, peer);
        self.apply_actions(endpoint, None, time);
    }

    /// Runs timers on every peer and drops the ones the application closed.
    pub(crate) fn sweep(&mut self, time: Instant) {
        self.sweep_list.clear();
        self.sweep_list.extend(self.peers.keys().copied());
        for index in 0..self.sweep_list.len() {
            let address = self.sweep_list[index];
            if let Some(peer) = self.peers.get_mut(&address) {
                if peer.shared().is_closed_by_user() {
                    peer.abandon();
                } else {
                    peer.update(time, &mut self.actions);
                }
            }
            self.apply_actions(address, None, time);
        }
    }

    /// Closes every peer, telling each remote side we are going away.
    pub(crate) fn shutdown(&mut self) {
        let time = self.clock.now();
        self.sweep_list.clear();
        self.sweep_list.extend(self.peers.keys().copied());
        for index in 0..self.sweep_list.len() {
            let address = self.sweep_list[index];
            if let Some(peer) = self.peers.get_mut(&address) {
                if peer.shared().is_closed_by_user() {
                    peer.abandon();
                } else {
                    peer.shutdown(&mut self.actions);
                }
            }
            self.apply_actions(address, None, time);
        }
        debug!("network thread stopped");
    }

    /// Carries out the actions a peer requested, then drops it if it closed.
    fn apply_actions(&mut self, address: SocketAddr, packet: Option<&Packet>, time: Instant) {
        let Some(peer) = self.peers.get_mut(&address) else {
            self.actions.clear();
            return;
        };

        // Send failures may append a Closed event, so iterate by index.
        let mut index = 0;
        while index < self.actions.len() {
            let action = self.actions[index];
            index += 1;
            match action {
                Action::Send(message) => {
                    match send_control(
                        self.transport.as_mut(),
                        &mut self.send_buffer,
                        &mut self.outgoing,
                        peer.shared(),
                        message,
                    ) {
                        Ok(_) => peer.record_send(time),
                        Err(e) => {
                            warn!("failed to send {:?} to {}: {}", message, address, e);
                            peer.on_transport_error(e.kind(), &mut self.actions);
                        }
                    }
                }
                Action::Emit(event) => emit(&mut self.events, peer.shared(), event, packet),
            }
        }
        self.actions.clear();

        if peer.is_closed() {
            self.peers.remove(&address);
            trace!("removed peer {}", address);
        }
    }
}
