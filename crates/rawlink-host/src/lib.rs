#![warn(missing_docs)]

//! rawlink-host: network thread, event queue and application facade.

/// Event types handed to the application (NetEvent, EventKind).
pub mod event_types;
/// UDP transport over the operating system socket.
pub mod socket;
/// Time utilities for the network thread.
pub mod time;

mod controller;
mod event_queue;
mod net_core;
mod peer_handle;

pub use event_types::{EventKind, NetEvent};
pub use net_core::{EventHandler, NetCore};
pub use peer_handle::PeerHandle;
pub use socket::UdpTransport;
pub use time::{Clock, ManualClock, SystemClock};
