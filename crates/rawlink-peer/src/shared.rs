//! Peer identity shared between the network thread and the application thread.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Mutex, MutexGuard,
    },
};

use crate::peer_state::PeerState;

/// Which side opened the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// We sent the Connect.
    Outbound,
    /// The remote endpoint sent the Connect.
    Inbound,
}

/// Identity and cross-thread flags of one peer.
///
/// The immutable identity is set at creation. `state` is a mirror written only by
/// the application thread while it dispatches events; the network thread keeps the
/// authoritative state in its [`Peer`](crate::Peer).
#[derive(Debug)]
pub struct PeerShared {
    endpoint: SocketAddr,
    token: String,
    connection_id: u32,
    direction: Direction,
    state: Mutex<PeerState>,
    closed_by_user: AtomicBool,
    user_close_reason: AtomicU8,
    outgoing_sequence: AtomicU8,
}

impl PeerShared {
    /// Creates the shared part of a peer in the `Connecting` state.
    pub fn new(endpoint: SocketAddr, token: &str, connection_id: u32, direction: Direction) -> Self {
        Self {
            endpoint,
            token: token.to_owned(),
            connection_id,
            direction,
            state: Mutex::new(PeerState::Connecting),
            closed_by_user: AtomicBool::new(false),
            user_close_reason: AtomicU8::new(0),
            outgoing_sequence: AtomicU8::new(0),
        }
    }

    /// Remote endpoint.
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    /// Handshake token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Session discriminator chosen by the initiator.
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    /// Which side opened the session.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn state_guard(&self) -> MutexGuard<'_, PeerState> {
        // PeerState is Copy, a poisoned lock still holds a valid value.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Last state mirrored by the application thread.
    pub fn state(&self) -> PeerState {
        *self.state_guard()
    }

    /// Updates the mirror. Closed is terminal and never overwritten.
    pub fn set_state(&self, state: PeerState) {
        let mut guard = self.state_guard();
        if !guard.is_closed() {
            *guard = state;
        }
    }

    /// Marks the session as closed by the local application. Returns false if it already was.
    pub fn mark_closed_by_user(&self, user_reason: u8) -> bool {
        if self.closed_by_user.load(Ordering::Acquire) {
            return false;
        }
        self.user_close_reason.store(user_reason, Ordering::Relaxed);
        !self.closed_by_user.swap(true, Ordering::AcqRel)
    }

    /// Reason byte passed when the local application closed the session.
    pub fn user_close_reason(&self) -> u8 {
        self.user_close_reason.load(Ordering::Relaxed)
    }

    /// Returns true once the local application closed the session.
    pub fn is_closed_by_user(&self) -> bool {
        self.closed_by_user.load(Ordering::Acquire)
    }

    /// Stamps the next outbound payload sequence id (post-increment, wraps at 256).
    pub fn next_sequence(&self) -> u8 {
        self.outgoing_sequence.fetch_add(1, Ordering::Relaxed)
    }
}
