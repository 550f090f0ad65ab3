//! End-to-end tests over real loopback UDP.
//!
//! Two `NetCore` instances talk through the operating system's sockets; each test
//! polls both sides with short sleeps until the expected events show up.

use std::{
    net::{Ipv4Addr, SocketAddr, UdpSocket},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use rawlink_core::{config::Config, id::RandomIdGenerator};
use rawlink_host::{EventHandler, ManualClock, NetCore, PeerHandle};
use rawlink_peer::{CloseReason, PeerState};
use rawlink_protocol::RejectReason;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seen {
    Connected(String),
    Accepted,
    Rejected(RejectReason),
    TimedOut,
    Closed(CloseReason),
    Payload(Vec<u8>),
}

#[derive(Default)]
struct Recorder {
    seen: Vec<Seen>,
    peers: Vec<PeerHandle>,
}

impl Recorder {
    fn contains(&self, event: &Seen) -> bool {
        self.seen.contains(event)
    }
}

impl EventHandler for Recorder {
    fn on_peer_connected(&mut self, peer: &PeerHandle) {
        self.seen.push(Seen::Connected(peer.token().to_owned()));
        self.peers.push(peer.clone());
    }

    fn on_connect_accepted(&mut self, _peer: &PeerHandle) {
        self.seen.push(Seen::Accepted);
    }

    fn on_connect_rejected(&mut self, _peer: &PeerHandle, reason: RejectReason) {
        self.seen.push(Seen::Rejected(reason));
    }

    fn on_connect_timed_out(&mut self, _peer: &PeerHandle) {
        self.seen.push(Seen::TimedOut);
    }

    fn on_peer_closed(&mut self, _peer: &PeerHandle, reason: CloseReason) {
        self.seen.push(Seen::Closed(reason));
    }

    fn on_payload(&mut self, _peer: &PeerHandle, data: &[u8]) {
        self.seen.push(Seen::Payload(data.to_vec()));
    }
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.socket_polling_timeout = Duration::from_millis(5);
    config
}

/// Polls both cores until `done` holds or about two seconds pass.
fn pump<F>(a: &mut NetCore, ra: &mut Recorder, b: &mut NetCore, rb: &mut Recorder, done: F) -> bool
where
    F: Fn(&Recorder, &Recorder) -> bool,
{
    for _ in 0..400 {
        a.poll_events(ra);
        b.poll_events(rb);
        if done(ra, rb) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn host_address(host: &NetCore) -> SocketAddr {
    let port = host.local_addr().unwrap().port();
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

/// Hosts on an ephemeral port and completes a handshake with token "abc123".
fn connected_pair() -> (NetCore, Recorder, NetCore, Recorder, PeerHandle) {
    let mut host = NetCore::new(fast_config());
    host.host(0).unwrap();
    let mut client = NetCore::new(fast_config());
    let peer = client.connect(host_address(&host), "abc123").unwrap();

    let mut host_events = Recorder::default();
    let mut client_events = Recorder::default();
    let connected = pump(&mut host, &mut host_events, &mut client, &mut client_events, |h, c| {
        h.contains(&Seen::Connected("abc123".to_owned())) && c.contains(&Seen::Accepted)
    });
    assert!(connected, "handshake did not complete: {:?} / {:?}", host_events.seen, client_events.seen);
    (host, host_events, client, client_events, peer)
}

#[test]
fn test_handshake_and_payload_exchange() {
    let (mut host, mut host_events, mut client, mut client_events, peer) = connected_pair();
    assert_eq!(peer.state(), PeerState::Connected);
    assert_eq!(host_events.seen, vec![Seen::Connected("abc123".to_owned())]);
    assert_eq!(client_events.seen, vec![Seen::Accepted]);

    let data: Vec<u8> = (0..200u8).collect();
    assert_eq!(peer.send(&data).unwrap(), data.len() + 2);
    let remote = host_events.peers[0].clone();
    assert_eq!(remote.state(), PeerState::Connected);
    remote.send(b"pong").unwrap();

    let delivered = pump(&mut host, &mut host_events, &mut client, &mut client_events, |h, c| {
        h.seen.len() == 2 && c.seen.len() == 2
    });
    assert!(delivered);
    assert_eq!(host_events.seen[1], Seen::Payload(data));
    assert_eq!(client_events.seen[1], Seen::Payload(b"pong".to_vec()));

    // Nothing is delivered twice.
    thread::sleep(Duration::from_millis(50));
    host.poll_events(&mut host_events);
    client.poll_events(&mut client_events);
    assert_eq!(host_events.seen.len(), 2);
    assert_eq!(client_events.seen.len(), 2);
}

#[test]
fn test_subscriber_sees_inbound_peers() {
    let mut host = NetCore::new(fast_config());
    let count = Arc::new(AtomicUsize::new(0));
    let observed = Arc::clone(&count);
    host.subscribe_peer_connected(move |peer| {
        assert_eq!(peer.token(), "player-1");
        observed.fetch_add(1, Ordering::SeqCst);
    });
    host.host(0).unwrap();

    let mut client = NetCore::new(fast_config());
    client.connect(host_address(&host), "player-1").unwrap();

    let mut host_events = Recorder::default();
    let mut client_events = Recorder::default();
    assert!(pump(&mut host, &mut host_events, &mut client, &mut client_events, |_, c| {
        c.contains(&Seen::Accepted)
    }));
    assert!(pump(&mut host, &mut host_events, &mut client, &mut client_events, |h, _| {
        !h.peers.is_empty()
    }));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_connect_times_out_once() {
    // A bound socket that never answers, so no ICMP error short-circuits the wait.
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let mut config = fast_config();
    config.connect_timeout = Duration::from_millis(200);
    config.connect_retry_interval = Duration::from_millis(50);

    let mut client = NetCore::new(config);
    let peer = client.connect(silent.local_addr().unwrap(), "abc123").unwrap();
    let mut events = Recorder::default();
    for _ in 0..400 {
        client.poll_events(&mut events);
        if !events.seen.is_empty() {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(events.seen, vec![Seen::TimedOut]);
    assert_eq!(peer.state(), PeerState::Closed(CloseReason::TimedOutConnecting));

    thread::sleep(Duration::from_millis(100));
    client.poll_events(&mut events);
    assert_eq!(events.seen, vec![Seen::TimedOut], "no events follow a timeout");

    // The silent endpoint saw the initial connect and its retries.
    silent.set_nonblocking(true).unwrap();
    let mut buffer = [0u8; 64];
    let mut connects = 0;
    while let Ok((len, _)) = silent.recv_from(&mut buffer) {
        assert_eq!(buffer[0], 0, "only Connect packets are sent");
        assert!(len > 7);
        connects += 1;
    }
    assert!(connects >= 2, "expected retries, saw {}", connects);
}

#[test]
fn test_connect_deadline_follows_injected_clock() {
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let config = fast_config();
    let connect_timeout = config.connect_timeout;
    let clock = Arc::new(ManualClock::new());
    let mut client =
        NetCore::with_id_generator_and_clock(config, Arc::new(RandomIdGenerator), clock.clone());
    let peer = client.connect(silent.local_addr().unwrap(), "abc123").unwrap();

    // Real time passes but the network thread's clock does not.
    let mut events = Recorder::default();
    for _ in 0..20 {
        client.poll_events(&mut events);
        thread::sleep(Duration::from_millis(5));
    }
    assert!(events.seen.is_empty());
    assert_eq!(peer.state(), PeerState::Connecting);

    clock.advance(connect_timeout);
    for _ in 0..400 {
        client.poll_events(&mut events);
        if !events.seen.is_empty() {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(events.seen, vec![Seen::TimedOut]);

    // Frozen time means no retries went out, only the first Connect.
    silent.set_nonblocking(true).unwrap();
    let mut buffer = [0u8; 64];
    let mut connects = 0;
    while silent.recv_from(&mut buffer).is_ok() {
        connects += 1;
    }
    assert_eq!(connects, 1);
}

#[test]
fn test_host_rejects_long_token() {
    let mut host_config = fast_config();
    host_config.max_token_length = 2;
    let mut host = NetCore::new(host_config);
    host.host(0).unwrap();
    let mut client = NetCore::new(fast_config());
    let peer = client.connect(host_address(&host), "abc123").unwrap();

    let mut host_events = Recorder::default();
    let mut client_events = Recorder::default();
    assert!(pump(&mut host, &mut host_events, &mut client, &mut client_events, |_, c| {
        !c.seen.is_empty()
    }));
    assert_eq!(client_events.seen, vec![Seen::Rejected(RejectReason::TokenTooLong)]);
    assert_eq!(peer.state(), PeerState::Closed(CloseReason::Rejected(RejectReason::TokenTooLong)));
    assert!(host_events.seen.is_empty());
}

#[test]
fn test_non_hosting_core_rejects_connects() {
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let mut a = NetCore::new(fast_config());
    // Connecting starts a's network thread without hosting.
    a.connect(silent.local_addr().unwrap(), "x").unwrap();
    let a_address = SocketAddr::from((Ipv4Addr::LOCALHOST, a.local_addr().unwrap().port()));

    let mut b = NetCore::new(fast_config());
    b.connect(a_address, "abc123").unwrap();

    let mut a_events = Recorder::default();
    let mut b_events = Recorder::default();
    assert!(pump(&mut a, &mut a_events, &mut b, &mut b_events, |_, b| !b.seen.is_empty()));
    assert_eq!(b_events.seen, vec![Seen::Rejected(RejectReason::NotAccepting)]);
}

#[test]
fn test_close_kicks_remote_and_silences_local() {
    let (mut host, mut host_events, mut client, mut client_events, peer) = connected_pair();

    peer.close(7);
    assert_eq!(peer.state(), PeerState::Closed(CloseReason::Kicked(7)));
    assert!(peer.send(b"late").is_err());

    assert!(pump(&mut host, &mut host_events, &mut client, &mut client_events, |h, _| {
        h.contains(&Seen::Closed(CloseReason::Kicked(7)))
    }));
    thread::sleep(Duration::from_millis(50));
    client.poll_events(&mut client_events);
    assert_eq!(client_events.seen, vec![Seen::Accepted]);
}

#[test]
fn test_stop_disconnects_peers() {
    let (mut host, mut host_events, mut client, mut client_events, _peer) = connected_pair();

    assert!(host.stop(Duration::from_secs(2)));
    assert!(!host.is_running());

    // Shutdown events queued by the stopped thread are still delivered.
    host.poll_events(&mut host_events);
    assert_eq!(host_events.seen.last(), Some(&Seen::Closed(CloseReason::Shutdown)));

    for _ in 0..400 {
        client.poll_events(&mut client_events);
        if client_events.seen.len() > 1 {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(client_events.seen, vec![Seen::Accepted, Seen::Closed(CloseReason::Shutdown)]);
}
