//! Packet serialization and deserialization.
//!
//! Encodes packets into, and decodes them out of, [`ByteBuffer`]s using the fixed
//! big-endian layout below. Byte 0 is always the [`PacketKind`] discriminant.
//!
//! | kind       | layout after the discriminant                           |
//! |------------|---------------------------------------------------------|
//! | Connect    | version u8, connection id u32, token len u8, token      |
//! | Accept     | connection id u32, token len u8, token                  |
//! | Reject     | reason u8, connection id u32, token len u8, token       |
//! | Ping/Pong  | nothing                                                 |
//! | Disconnect | reason u8, user reason u8                               |
//! | Payload    | sequence u8, user data up to the end of the datagram    |
//!
//! # Module Organization
//!
//! - [`encoder`] - Packet encoding to binary format
//! - [`decoder`] - Packet decoding from binary format
//!
//! [`ByteBuffer`]: rawlink_core::ByteBuffer
//! [`PacketKind`]: crate::packet::PacketKind

pub mod decoder;
pub mod encoder;

#[cfg(test)]
mod tests;

pub use decoder::PacketDecoder;
pub use encoder::PacketEncoder;
