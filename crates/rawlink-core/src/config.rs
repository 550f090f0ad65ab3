use std::{default::Default, time::Duration};

use crate::constants::MAX_TOKEN_LENGTH;

#[derive(Clone, Debug)]
/// Configuration options to tune protocol and runtime behavior.
pub struct Config {
    /// How long an outbound connect may wait for Accept or Reject.
    pub connect_timeout: Duration,
    /// Interval at which the initiator re-sends Connect while waiting.
    pub connect_retry_interval: Duration,
    /// Max time without inbound traffic before a connected peer is closed.
    pub idle_connection_timeout: Duration,
    /// A connected peer that has sent nothing for this long sends a Ping.
    pub ping_interval: Duration,
    /// Upper bound on a single receive wait of the network thread.
    pub socket_polling_timeout: Duration,
    /// Capacity of the network thread's receive buffer in bytes.
    pub receive_buffer_max_size: usize,
    /// Max handshake token length in bytes (capped at 255 by the wire format).
    pub max_token_length: usize,
    /// Max number of peers the network thread tracks; further inbound connects are rejected.
    pub max_peers: usize,
    /// Number of recycled events kept for reuse.
    pub event_pool_size: usize,
    /// Number of recycled packets kept for reuse.
    pub packet_pool_size: usize,
    /// Join bound applied when a running core is dropped.
    pub stop_timeout: Duration,
    /// Socket receive buffer size in bytes (None = use system default).
    /// Corresponds to SO_RCVBUF socket option.
    pub socket_recv_buffer_size: Option<usize>,
    /// Socket send buffer size in bytes (None = use system default).
    /// Corresponds to SO_SNDBUF socket option.
    pub socket_send_buffer_size: Option<usize>,
    /// Time-to-live for outgoing packets (None = use system default).
    pub socket_ttl: Option<u32>,
    /// Enable broadcast mode (default: false).
    pub socket_broadcast: bool,
}

impl Config {
    /// Effective token limit after applying the wire format cap.
    pub fn token_limit(&self) -> usize {
        self.max_token_length.min(MAX_TOKEN_LENGTH)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            connect_retry_interval: Duration::from_millis(500),
            idle_connection_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(1),
            socket_polling_timeout: Duration::from_millis(15),
            receive_buffer_max_size: 2048,
            max_token_length: 64,
            max_peers: 64,
            event_pool_size: 256,
            packet_pool_size: 16,
            stop_timeout: Duration::from_secs(1),
            socket_recv_buffer_size: None,
            socket_send_buffer_size: None,
            socket_ttl: None,
            socket_broadcast: false,
        }
    }
}
