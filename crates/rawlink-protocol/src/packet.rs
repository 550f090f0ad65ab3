//! Packet types for the datagram protocol.
//!
//! This module provides the wire-level vocabulary:
//! - `PacketKind`: one byte discriminant leading every datagram
//! - `DisconnectReason` / `RejectReason`: reason codes carried on the wire
//! - `Packet`: pooled, reusable wire unit filled by the decoder or by the sender
//! - `PacketView`: borrowed tagged view over a `Packet` for matching

use std::convert::TryFrom;

use rawlink_core::{
    constants::{MAX_PAYLOAD_DATA_SIZE, MAX_TOKEN_LENGTH, PROTOCOL_VERSION},
    error::{DecodingErrorKind, ErrorKind},
    pool::Poolable,
};

/// Helper trait to convert enums to u8 values for wire format.
pub trait EnumConverter {
    /// The enum type this converter works with.
    type Enum;

    /// Converts the enum to a u8 for serialization.
    fn to_u8(&self) -> u8;
}

// ============================================================================
// Wire Enums
// ============================================================================

/// Discriminant written as byte 0 of every datagram.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum PacketKind {
    /// Initiator asks to open a session
    #[default]
    Connect = 0,
    /// Host admits the session
    Accept = 1,
    /// Host refuses the session
    Reject = 2,
    /// Liveness probe
    Ping = 3,
    /// Reply to a liveness probe
    Pong = 4,
    /// Session is being torn down
    Disconnect = 5,
    /// Sequenced user data
    Payload = 6,
}

impl PacketKind {
    /// Fixed number of bytes preceding variable-length content (token or user data).
    pub fn header_size(self) -> usize {
        match self {
            // kind + version + connection id + token length
            PacketKind::Connect => 7,
            // kind + connection id + token length
            PacketKind::Accept => 6,
            // kind + reason + connection id + token length
            PacketKind::Reject => 7,
            PacketKind::Ping | PacketKind::Pong => 1,
            // kind + reason + user reason
            PacketKind::Disconnect => 3,
            // kind + sequence
            PacketKind::Payload => 2,
        }
    }
}

impl EnumConverter for PacketKind {
    type Enum = PacketKind;

    fn to_u8(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for PacketKind {
    type Error = ErrorKind;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PacketKind::Connect),
            1 => Ok(PacketKind::Accept),
            2 => Ok(PacketKind::Reject),
            3 => Ok(PacketKind::Ping),
            4 => Ok(PacketKind::Pong),
            5 => Ok(PacketKind::Disconnect),
            6 => Ok(PacketKind::Payload),
            _ => Err(ErrorKind::DecodingError(DecodingErrorKind::UnknownPacketKind(value))),
        }
    }
}

/// Why a session is being torn down.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum DisconnectReason {
    /// The sending side is stopping.
    #[default]
    Shutdown = 0,
    /// The application closed the session; the user reason byte is meaningful.
    Kicked = 1,
    /// The sending side stopped hearing from us.
    Timeout = 2,
}

impl EnumConverter for DisconnectReason {
    type Enum = DisconnectReason;

    fn to_u8(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for DisconnectReason {
    type Error = ErrorKind;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DisconnectReason::Shutdown),
            1 => Ok(DisconnectReason::Kicked),
            2 => Ok(DisconnectReason::Timeout),
            _ => Err(ErrorKind::DecodingError(DecodingErrorKind::DisconnectReason(value))),
        }
    }
}

/// Why a host refused a connect.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum RejectReason {
    /// The remote side does not accept inbound sessions.
    #[default]
    NotAccepting = 0,
    /// The remote side reached its peer limit.
    ServerFull = 1,
    /// The handshake token exceeds the remote side's limit.
    TokenTooLong = 2,
    /// Protocol versions differ.
    VersionMismatch = 3,
    /// A session with this endpoint already exists.
    AlreadyConnected = 4,
}

impl EnumConverter for RejectReason {
    type Enum = RejectReason;

    fn to_u8(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for RejectReason {
    type Error = ErrorKind;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RejectReason::NotAccepting),
            1 => Ok(RejectReason::ServerFull),
            2 => Ok(RejectReason::TokenTooLong),
            3 => Ok(RejectReason::VersionMismatch),
            4 => Ok(RejectReason::AlreadyConnected),
            _ => Err(ErrorKind::DecodingError(DecodingErrorKind::RejectReason(value))),
        }
    }
}

// ============================================================================
// Packet
// ============================================================================

/// One datagram's logical content.
///
/// Packets are pooled: the `set_*` methods overwrite every field, and `reset`
/// clears them, so nothing leaks from one use to the next.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Packet {
    pub(crate) kind: PacketKind,
    pub(crate) version: u8,
    pub(crate) connection_id: u32,
    pub(crate) reject_reason: RejectReason,
    pub(crate) disconnect_reason: DisconnectReason,
    pub(crate) user_reason: u8,
    pub(crate) sequence: u8,
    pub(crate) token: String,
    pub(crate) data: Vec<u8>,
}

/// Borrowed view of a packet, one variant per packet kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketView<'a> {
    /// Connect request
    Connect {
        /// Protocol version of the initiator
        version: u8,
        /// Session discriminator chosen by the initiator
        connection_id: u32,
        /// Handshake token
        token: &'a str,
    },
    /// Connect accepted
    Accept {
        /// Echoed session discriminator
        connection_id: u32,
        /// Echoed handshake token
        token: &'a str,
    },
    /// Connect refused
    Reject {
        /// Refusal reason
        reason: RejectReason,
        /// Echoed session discriminator
        connection_id: u32,
        /// Echoed handshake token
        token: &'a str,
    },
    /// Liveness probe
    Ping,
    /// Liveness reply
    Pong,
    /// Session teardown
    Disconnect {
        /// Protocol reason
        reason: DisconnectReason,
        /// Application reason, meaningful for `Kicked`
        user_reason: u8,
    },
    /// Sequenced user data
    Payload {
        /// 8-bit wrapping sequence id
        sequence: u8,
        /// User bytes
        data: &'a [u8],
    },
}

impl Packet {
    pub(crate) fn clear(&mut self, kind: PacketKind) {
        self.kind = kind;
        self.version = 0;
        self.connection_id = 0;
        self.reject_reason = RejectReason::default();
        self.disconnect_reason = DisconnectReason::default();
        self.user_reason = 0;
        self.sequence = 0;
        self.token.clear();
        self.data.clear();
    }

    fn set_token(&mut self, token: &str) {
        assert!(token.len() <= MAX_TOKEN_LENGTH, "token of {} bytes cannot be framed", token.len());
        self.token.push_str(token);
    }

    /// Overwrites this packet with a Connect at the current protocol version.
    pub fn set_connect(&mut self, connection_id: u32, token: &str) {
        self.clear(PacketKind::Connect);
        self.version = PROTOCOL_VERSION;
        self.connection_id = connection_id;
        self.set_token(token);
    }

    /// Overwrites this packet with an Accept.
    pub fn set_accept(&mut self, connection_id: u32, token: &str) {
        self.clear(PacketKind::Accept);
        self.connection_id = connection_id;
        self.set_token(token);
    }

    /// Overwrites this packet with a Reject.
    pub fn set_reject(&mut self, reason: RejectReason, connection_id: u32, token: &str) {
        self.clear(PacketKind::Reject);
        self.reject_reason = reason;
        self.connection_id = connection_id;
        self.set_token(token);
    }

    /// Overwrites this packet with a Ping.
    pub fn set_ping(&mut self) {
        self.clear(PacketKind::Ping);
    }

    /// Overwrites this packet with a Pong.
    pub fn set_pong(&mut self) {
        self.clear(PacketKind::Pong);
    }

    /// Overwrites this packet with a Disconnect.
    pub fn set_disconnect(&mut self, reason: DisconnectReason, user_reason: u8) {
        self.clear(PacketKind::Disconnect);
        self.disconnect_reason = reason;
        self.user_reason = user_reason;
    }

    /// Overwrites this packet with a Payload.
    pub fn set_payload(&mut self, sequence: u8, data: &[u8]) {
        assert!(data.len() <= MAX_PAYLOAD_DATA_SIZE, "payload of {} bytes cannot be framed", data.len());
        self.clear(PacketKind::Payload);
        self.sequence = sequence;
        self.data.extend_from_slice(data);
    }

    /// Returns the packet kind.
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// Returns the protocol version (Connect only).
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the connection id (Connect, Accept, Reject).
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    /// Returns the handshake token (Connect, Accept, Reject).
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the payload sequence id.
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Returns the payload user data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a tagged view over the fields relevant to this packet's kind.
    pub fn view(&self) -> PacketView<'_> {
        match self.kind {
            PacketKind::Connect => PacketView::Connect {
                version: self.version,
                connection_id: self.connection_id,
                token: &self.token,
            },
            PacketKind::Accept => {
                PacketView::Accept { connection_id: self.connection_id, token: &self.token }
            }
            PacketKind::Reject => PacketView::Reject {
                reason: self.reject_reason,
                connection_id: self.connection_id,
                token: &self.token,
            },
            PacketKind::Ping => PacketView::Ping,
            PacketKind::Pong => PacketView::Pong,
            PacketKind::Disconnect => PacketView::Disconnect {
                reason: self.disconnect_reason,
                user_reason: self.user_reason,
            },
            PacketKind::Payload => PacketView::Payload { sequence: self.sequence, data: &self.data },
        }
    }
}

impl Poolable for Packet {
    fn reset(&mut self) {
        self.clear(PacketKind::default());
    }
}

#[cfg(test)]
mod tests {
    use rawlink_core::ObjectPool;

    use super::*;

    #[test]
    fn test_kind_round_trips_through_u8() {
        for value in 0..=6u8 {
            let kind = PacketKind::try_from(value).unwrap();
            assert_eq!(kind.to_u8(), value);
        }
        assert!(matches!(
            PacketKind::try_from(7),
            Err(ErrorKind::DecodingError(DecodingErrorKind::UnknownPacketKind(7)))
        ));
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(DisconnectReason::try_from(1).unwrap(), DisconnectReason::Kicked);
        assert!(DisconnectReason::try_from(9).is_err());
        assert_eq!(RejectReason::try_from(3).unwrap(), RejectReason::VersionMismatch);
        assert!(RejectReason::try_from(200).is_err());
    }

    #[test]
    fn test_set_overwrites_previous_fields() {
        let mut packet = Packet::default();
        packet.set_connect(77, "secret");
        packet.set_payload(3, &[1, 2]);

        assert_eq!(packet.kind(), PacketKind::Payload);
        assert_eq!(packet.connection_id(), 0);
        assert_eq!(packet.token(), "");
        assert_eq!(packet.view(), PacketView::Payload { sequence: 3, data: &[1, 2] });
    }

    #[test]
    fn test_pooled_packet_is_reset() {
        let mut pool = ObjectPool::<Packet>::new(1);
        let mut packet = pool.acquire();
        packet.set_reject(RejectReason::ServerFull, 5, "abc");
        pool.release(packet);

        let reused = pool.acquire();
        assert_eq!(reused, Packet::default());
    }

    #[test]
    #[should_panic(expected = "cannot be framed")]
    fn test_oversized_payload_panics() {
        let mut packet = Packet::default();
        packet.set_payload(0, &vec![0; MAX_PAYLOAD_DATA_SIZE + 1]);
    }
}
