#![warn(missing_docs)]

//! rawlink: connection lifecycle and ordered payloads over raw UDP.
//!
//! This crate re-exports the surface needed to build an application:
//!
//! - The entry point and callbacks (`NetCore`, `EventHandler`, `PeerHandle`)
//! - Peer states and close reasons (`PeerState`, `CloseReason`, `RejectReason`)
//! - Configuration and errors (`Config`, `ErrorKind`)
//!
//! Example
//! ```no_run
//! use std::{thread, time::Duration};
//!
//! use rawlink::prelude::*;
//!
//! struct Printer;
//!
//! impl EventHandler for Printer {
//!     fn on_connect_accepted(&mut self, peer: &PeerHandle) {
//!         peer.send(b"hello").unwrap();
//!     }
//!
//!     fn on_payload(&mut self, peer: &PeerHandle, data: &[u8]) {
//!         println!("{} says {:?}", peer.endpoint(), data);
//!     }
//! }
//!
//! let mut core = NetCore::new(Config::default());
//! let _server = core.connect("127.0.0.1:9000".parse().unwrap(), "abc123").unwrap();
//! loop {
//!     core.poll_events(&mut Printer);
//!     thread::sleep(Duration::from_millis(10));
//! }
//! ```

// Core config, errors and constants
pub use rawlink_core::{
    config::Config,
    constants::{MAX_PAYLOAD_DATA_SIZE, PROTOCOL_VERSION},
    error::{DecodingErrorKind, ErrorKind, Result},
    id::{IdGenerator, RandomIdGenerator},
};
// Host: network thread, events and the application facade
pub use rawlink_host::{
    Clock, EventHandler, EventKind, ManualClock, NetCore, PeerHandle, SystemClock,
};
// Peer states
pub use rawlink_peer::{CloseReason, Direction, PeerState};
// Protocol reasons carried on the wire
pub use rawlink_protocol::{DisconnectReason, RejectReason};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        CloseReason, Config, ErrorKind, EventHandler, NetCore, PeerHandle, PeerState,
        RejectReason,
    };
}
