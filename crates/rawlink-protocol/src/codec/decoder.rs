//! Packet decoding.
//!
//! Every check happens before the corresponding read, so a malformed datagram
//! yields a [`DecodingErrorKind`] instead of tripping the buffer's bounds asserts.

use std::{convert::TryFrom, str};

use rawlink_core::{
    constants::MAX_PAYLOAD_DATA_SIZE,
    error::{DecodingErrorKind, Result},
    ByteBuffer,
};

use crate::packet::{DisconnectReason, Packet, PacketKind, RejectReason};

/// Deserializes packets from network bytes.
pub struct PacketDecoder;

impl PacketDecoder {
    /// Decodes the unread content of `buffer` into `packet`, overwriting it.
    ///
    /// On error `packet` holds partial content and should be released to its pool.
    pub fn decode_into(buffer: &mut ByteBuffer, packet: &mut Packet) -> Result<()> {
        if buffer.remaining() == 0 {
            return Err(DecodingErrorKind::Empty.into());
        }
        let kind = PacketKind::try_from(buffer.read_u8())?;
        if buffer.remaining() < kind.header_size() - 1 {
            return Err(DecodingErrorKind::Truncated.into());
        }
        packet.clear(kind);

        match kind {
            PacketKind::Connect => {
                packet.version = buffer.read_u8();
                packet.connection_id = buffer.read_u32();
                Self::read_token(buffer, &mut packet.token)?;
            }
            PacketKind::Accept => {
                packet.connection_id = buffer.read_u32();
                Self::read_token(buffer, &mut packet.token)?;
            }
            PacketKind::Reject => {
                packet.reject_reason = RejectReason::try_from(buffer.read_u8())?;
                packet.connection_id = buffer.read_u32();
                Self::read_token(buffer, &mut packet.token)?;
            }
            PacketKind::Ping | PacketKind::Pong => {}
            PacketKind::Disconnect => {
                packet.disconnect_reason = DisconnectReason::try_from(buffer.read_u8())?;
                packet.user_reason = buffer.read_u8();
            }
            PacketKind::Payload => {
                packet.sequence = buffer.read_u8();
                let len = buffer.remaining();
                if len > MAX_PAYLOAD_DATA_SIZE {
                    return Err(DecodingErrorKind::PayloadTooLarge(len).into());
                }
                buffer.extract_remaining(&mut packet.data);
            }
        }

        if buffer.remaining() > 0 {
            return Err(DecodingErrorKind::TrailingBytes.into());
        }
        Ok(())
    }

    /// Decodes a standalone datagram.
    pub fn decode(datagram: &[u8]) -> Result<Packet> {
        let mut buffer = ByteBuffer::from_slice(datagram);
        let mut packet = Packet::default();
        Self::decode_into(&mut buffer, &mut packet)?;
        Ok(packet)
    }

    fn read_token(buffer: &mut ByteBuffer, token: &mut String) -> Result<()> {
        let len = usize::from(buffer.read_u8());
        if buffer.remaining() < len {
            return Err(DecodingErrorKind::Truncated.into());
        }
        let text =
            str::from_utf8(buffer.read_bytes(len)).map_err(|_| DecodingErrorKind::InvalidToken)?;
        token.push_str(text);
        Ok(())
    }
}
