#![warn(missing_docs)]

//! rawlink-peer: peer state machine for managing remote endpoints.

mod peer;
mod peer_state;
mod shared;

pub use peer::{Action, ControlMessage, Peer, PeerEvent};
pub use peer_state::{CloseReason, PeerState};
pub use shared::{Direction, PeerShared};
