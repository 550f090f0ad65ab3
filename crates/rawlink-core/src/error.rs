//! Error types and results.

use std::{io, result};

use thiserror::Error;

/// Wrapped result type for rawlink operations.
pub type Result<T> = result::Result<T, ErrorKind>;

/// Errors surfaced by the rawlink crates.
#[derive(Error, Debug)]
pub enum ErrorKind {
    /// A datagram could not be decoded into a packet.
    #[error("could not decode datagram: {0}")]
    DecodingError(DecodingErrorKind),
    /// The underlying socket reported a failure.
    #[error("an IO error occurred: {0}")]
    IOError(#[from] io::Error),
    /// Handshake token exceeds the configured maximum.
    #[error("handshake token is {len} bytes, maximum is {max}")]
    TokenTooLong {
        /// Length of the rejected token.
        len: usize,
        /// Configured maximum.
        max: usize,
    },
    /// Payload exceeds `MAX_PAYLOAD_DATA_SIZE`.
    #[error("payload is {len} bytes, maximum is {max}")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
        /// Largest payload that fits in one datagram.
        max: usize,
    },
    /// The peer is not in the connected state.
    #[error("peer is not connected")]
    NotConnected,
    /// The network thread is not running.
    #[error("network thread is not running")]
    NotRunning,
    /// The network thread is already running.
    #[error("network thread is already running")]
    AlreadyRunning,
}

/// Reasons a datagram is refused by the codec.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodingErrorKind {
    /// Zero-length datagram.
    #[error("empty datagram")]
    Empty,
    /// The discriminant byte names no known packet.
    #[error("unknown packet kind {0}")]
    UnknownPacketKind(u8),
    /// Fewer bytes than the packet shape requires.
    #[error("datagram truncated")]
    Truncated,
    /// Bytes left over after a fixed-shape packet.
    #[error("unexpected trailing bytes")]
    TrailingBytes,
    /// Handshake token is not valid UTF-8.
    #[error("handshake token is not valid UTF-8")]
    InvalidToken,
    /// Payload user data larger than `MAX_PAYLOAD_DATA_SIZE`.
    #[error("payload of {0} bytes exceeds the maximum")]
    PayloadTooLarge(usize),
    /// Unknown disconnect reason code.
    #[error("unknown disconnect reason {0}")]
    DisconnectReason(u8),
    /// Unknown reject reason code.
    #[error("unknown reject reason {0}")]
    RejectReason(u8),
}

impl From<DecodingErrorKind> for ErrorKind {
    fn from(inner: DecodingErrorKind) -> Self {
        ErrorKind::DecodingError(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoding_error_converts() {
        let err: ErrorKind = DecodingErrorKind::UnknownPacketKind(42).into();
        assert!(matches!(
            err,
            ErrorKind::DecodingError(DecodingErrorKind::UnknownPacketKind(42))
        ));
        assert_eq!(err.to_string(), "could not decode datagram: unknown packet kind 42");
    }

    #[test]
    fn test_io_error_converts() {
        let err: ErrorKind = io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into();
        match err {
            ErrorKind::IOError(inner) => assert_eq!(inner.kind(), io::ErrorKind::ConnectionRefused),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
