#![warn(missing_docs)]

//! rawlink-core: foundational types and utilities.
//!
//! This crate provides the leaf building blocks shared across all layers:
//! - Configuration types
//! - Error handling
//! - Protocol constants
//! - Byte buffers with read/write cursors
//! - Wrap-around sequence arithmetic
//! - Object pooling
//! - Transport and id generator capabilities

/// Protocol constants shared across layers.
pub mod constants {
    /// This is the current protocol version, carried by Connect packets.
    pub const PROTOCOL_VERSION: u8 = 1;
    /// Maximum transmission unit of a datagram.
    ///
    /// Derived from ethernet_mtu - ipv6_header_size - udp_header_size
    ///       1452 = 1500         - 40               - 8
    pub const DEFAULT_MTU: usize = 1452;
    /// Size of the payload header: packet kind + sequence id.
    pub const PAYLOAD_HEADER_SIZE: usize = 2;
    /// Largest user payload that fits in one datagram.
    pub const MAX_PAYLOAD_DATA_SIZE: usize = DEFAULT_MTU - PAYLOAD_HEADER_SIZE;
    /// Hard cap on the handshake token, bounded by its one byte length prefix.
    pub const MAX_TOKEN_LENGTH: usize = u8::MAX as usize;
}

/// Fixed-capacity byte buffer with read and write cursors.
pub mod byte_buffer;
/// Configuration options for the protocol and runtime.
pub mod config;
/// Error types and results.
pub mod error;
/// Connection id generation.
pub mod id;
/// Object pooling for packets and events.
pub mod pool;
/// Wrap-around comparison of sequence counters.
pub mod sequence;
/// Transport abstraction for pluggable I/O.
pub mod transport;

pub use byte_buffer::ByteBuffer;
pub use pool::{ObjectPool, Poolable};
