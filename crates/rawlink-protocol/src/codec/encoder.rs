//! Packet encoding.

use rawlink_core::{constants::DEFAULT_MTU, ByteBuffer};

use crate::packet::{EnumConverter, Packet, PacketView};

/// Serializes packets into bytes for transmission.
pub struct PacketEncoder;

impl PacketEncoder {
    /// Appends the wire form of `packet` at the buffer's write cursor.
    ///
    /// Panics if the buffer lacks room; callers size send buffers to `DEFAULT_MTU`.
    pub fn encode_into(buffer: &mut ByteBuffer, packet: &Packet) {
        buffer.write_u8(packet.kind().to_u8());

        match packet.view() {
            PacketView::Connect { version, connection_id, token } => {
                buffer.write_u8(version);
                buffer.write_u32(connection_id);
                Self::write_token(buffer, token);
            }
            PacketView::Accept { connection_id, token } => {
                buffer.write_u32(connection_id);
                Self::write_token(buffer, token);
            }
            PacketView::Reject { reason, connection_id, token } => {
                buffer.write_u8(reason.to_u8());
                buffer.write_u32(connection_id);
                Self::write_token(buffer, token);
            }
            PacketView::Ping | PacketView::Pong => {}
            PacketView::Disconnect { reason, user_reason } => {
                buffer.write_u8(reason.to_u8());
                buffer.write_u8(user_reason);
            }
            PacketView::Payload { sequence, data } => {
                buffer.write_u8(sequence);
                buffer.write_bytes(data);
            }
        }
    }

    /// Encodes a packet into a fresh MTU-sized buffer.
    pub fn encode(packet: &Packet) -> ByteBuffer {
        let mut buffer = ByteBuffer::with_capacity(DEFAULT_MTU);
        Self::encode_into(&mut buffer, packet);
        buffer
    }

    fn write_token(buffer: &mut ByteBuffer, token: &str) {
        // Packet setters cap tokens at 255 bytes.
        buffer.write_u8(token.len() as u8);
        buffer.write_bytes(token.as_bytes());
    }
}
