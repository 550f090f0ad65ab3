//! Event types handed from the network thread to the application thread.
//!
//! - `EventKind`: what happened, carrying exactly the data that occurrence needs
//! - `NetEvent`: a pooled envelope tying an `EventKind` to the peer it concerns

use std::{mem, sync::Arc};

use rawlink_core::Poolable;
use rawlink_peer::{CloseReason, PeerShared};
use rawlink_protocol::RejectReason;

/// Lifecycle occurrences and payloads surfaced to the application.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A recycled event that was never filled. Reaching dispatch with it is a bug.
    #[default]
    Empty,
    /// A remote endpoint connected to us.
    PeerConnected,
    /// Our connect was accepted.
    ConnectAccepted,
    /// Our connect was refused.
    ConnectRejected(RejectReason),
    /// Our connect got no answer before the deadline.
    ConnectTimedOut,
    /// An established session ended.
    PeerClosed(CloseReason),
    /// A fresh payload arrived. The bytes are owned by the event.
    Payload(Vec<u8>),
}

/// One event crossing the queue.
///
/// The event owns its payload bytes, so the network thread can reuse its receive
/// buffer as soon as the event is queued.
#[derive(Debug, Default)]
pub struct NetEvent {
    peer: Option<Arc<PeerShared>>,
    kind: EventKind,
    /// Payload storage kept from a previous tenant
    spare: Vec<u8>,
}

impl NetEvent {
    /// Fills the event with a non-payload occurrence.
    pub(crate) fn set(&mut self, peer: Arc<PeerShared>, kind: EventKind) {
        debug_assert!(!matches!(kind, EventKind::Empty | EventKind::Payload(_)));
        self.peer = Some(peer);
        self.kind = kind;
    }

    /// Fills the event with a copy of `data`, reusing storage when possible.
    pub(crate) fn set_payload(&mut self, peer: Arc<PeerShared>, data: &[u8]) {
        let mut bytes = mem::take(&mut self.spare);
        bytes.clear();
        bytes.extend_from_slice(data);
        self.peer = Some(peer);
        self.kind = EventKind::Payload(bytes);
    }

    /// The peer this event concerns. `None` only for an empty event.
    pub fn peer(&self) -> Option<&Arc<PeerShared>> {
        self.peer.as_ref()
    }

    /// What happened.
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }
}

impl Poolable for NetEvent {
    fn reset(&mut self) {
        self.peer = None;
        if let EventKind::Payload(mut bytes) = mem::take(&mut self.kind) {
            bytes.clear();
            self.spare = bytes;
        }
    }
}
