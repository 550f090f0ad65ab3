#![warn(missing_docs)]

//! rawlink-protocol: packet types and the datagram codec.

/// Packet encoding and decoding.
pub mod codec;
/// Packet types and wire enums.
pub mod packet;

pub use codec::{PacketDecoder, PacketEncoder};
pub use packet::{DisconnectReason, Packet, PacketKind, PacketView, RejectReason};
