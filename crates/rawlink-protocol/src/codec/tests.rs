//! Integration tests for packet encoding and decoding.

use rawlink_core::{
    constants::{MAX_PAYLOAD_DATA_SIZE, PAYLOAD_HEADER_SIZE},
    error::{DecodingErrorKind, ErrorKind},
    ByteBuffer, ObjectPool,
};

use super::{PacketDecoder, PacketEncoder};
use crate::packet::{DisconnectReason, Packet, PacketKind, PacketView, RejectReason};

fn every_variant() -> Vec<Packet> {
    let mut packets = Vec::new();

    let mut p = Packet::default();
    p.set_connect(0xA1B2_C3D4, "abc123");
    packets.push(p);

    let mut p = Packet::default();
    p.set_connect(1, "");
    packets.push(p);

    let mut p = Packet::default();
    p.set_accept(42, "héllo");
    packets.push(p);

    let mut p = Packet::default();
    p.set_reject(RejectReason::ServerFull, 9, "token");
    packets.push(p);

    let mut p = Packet::default();
    p.set_ping();
    packets.push(p);

    let mut p = Packet::default();
    p.set_pong();
    packets.push(p);

    let mut p = Packet::default();
    p.set_disconnect(DisconnectReason::Kicked, 17);
    packets.push(p);

    let mut p = Packet::default();
    p.set_payload(0, &[]);
    packets.push(p);

    let mut p = Packet::default();
    p.set_payload(255, &vec![0xAB; MAX_PAYLOAD_DATA_SIZE]);
    packets.push(p);

    packets
}

fn decode_error(bytes: &[u8]) -> DecodingErrorKind {
    match PacketDecoder::decode(bytes) {
        Err(ErrorKind::DecodingError(kind)) => kind,
        other => panic!("expected a decoding error, got {:?}", other),
    }
}

#[test]
fn test_every_variant_reencodes_to_same_bytes() {
    for packet in every_variant() {
        let bytes = PacketEncoder::encode(&packet);
        let decoded = PacketDecoder::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, packet);

        let again = PacketEncoder::encode(&decoded);
        assert_eq!(again.as_slice(), bytes.as_slice(), "kind {:?}", packet.kind());
    }
}

#[test]
fn test_payload_layout() {
    let mut packet = Packet::default();
    packet.set_payload(12, &[1, 2, 3]);
    let bytes = PacketEncoder::encode(&packet);

    assert_eq!(bytes.as_slice(), &[PacketKind::Payload as u8, 12, 1, 2, 3]);
    assert_eq!(bytes.len() - PAYLOAD_HEADER_SIZE, 3);
}

#[test]
fn test_disconnect_layout() {
    let mut packet = Packet::default();
    packet.set_disconnect(DisconnectReason::Timeout, 0);
    assert_eq!(PacketEncoder::encode(&packet).as_slice(), &[5, 2, 0]);
}

#[test]
fn test_connect_layout() {
    let mut packet = Packet::default();
    packet.set_connect(0x0102_0304, "ab");
    assert_eq!(
        PacketEncoder::encode(&packet).as_slice(),
        &[0, rawlink_core::constants::PROTOCOL_VERSION, 1, 2, 3, 4, 2, b'a', b'b']
    );
}

#[test]
fn test_zero_length_payload_is_legal() {
    let packet = PacketDecoder::decode(&[6, 4]).unwrap();
    assert_eq!(packet.view(), PacketView::Payload { sequence: 4, data: &[] });
}

#[test]
fn test_rejects_malformed_datagrams() {
    assert_eq!(decode_error(&[]), DecodingErrorKind::Empty);
    assert_eq!(decode_error(&[99]), DecodingErrorKind::UnknownPacketKind(99));
    assert_eq!(decode_error(&[6]), DecodingErrorKind::Truncated);
    assert_eq!(decode_error(&[5, 1]), DecodingErrorKind::Truncated);
    assert_eq!(decode_error(&[5, 9, 0]), DecodingErrorKind::DisconnectReason(9));
    assert_eq!(decode_error(&[3, 0]), DecodingErrorKind::TrailingBytes);
    // Token length claims more bytes than the datagram carries.
    assert_eq!(decode_error(&[1, 0, 0, 0, 1, 5, b'a']), DecodingErrorKind::Truncated);
    assert_eq!(decode_error(&[1, 0, 0, 0, 1, 1, 0xFF]), DecodingErrorKind::InvalidToken);
    assert_eq!(decode_error(&[2, 77, 0, 0, 0, 1, 0]), DecodingErrorKind::RejectReason(77));
}

#[test]
fn test_rejects_oversized_payload() {
    let mut datagram = vec![6, 0];
    datagram.extend(std::iter::repeat(1).take(MAX_PAYLOAD_DATA_SIZE + 1));
    assert_eq!(decode_error(&datagram), DecodingErrorKind::PayloadTooLarge(MAX_PAYLOAD_DATA_SIZE + 1));
}

#[test]
fn test_decode_into_pooled_packet_overwrites_previous_tenant() {
    let mut pool = ObjectPool::<Packet>::new(1);
    let mut packet = pool.acquire();
    let mut buffer = ByteBuffer::from_slice(&[0, 1, 0, 0, 0, 7, 3, b'x', b'y', b'z']);
    PacketDecoder::decode_into(&mut buffer, &mut packet).unwrap();
    assert_eq!(packet.token(), "xyz");
    pool.release(packet);

    let mut packet = pool.acquire();
    let mut buffer = ByteBuffer::from_slice(&[6, 1, 9]);
    PacketDecoder::decode_into(&mut buffer, &mut packet).unwrap();
    assert_eq!(packet.token(), "");
    assert_eq!(packet.connection_id(), 0);
    assert_eq!(packet.data(), &[9]);
}
