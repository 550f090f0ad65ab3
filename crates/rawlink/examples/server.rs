//! Simple echo server using rawlink.
//!
//! Run:
//! - cargo run -p rawlink --example server
//! - cargo run -p rawlink --example server -- 7777

use std::{env, thread, time::Duration};

use rawlink::prelude::*;

struct Echo;

impl EventHandler for Echo {
    fn on_peer_connected(&mut self, peer: &PeerHandle) {
        println!("[connect] {} token=\"{}\"", peer.endpoint(), peer.token());
    }

    fn on_peer_closed(&mut self, peer: &PeerHandle, reason: CloseReason) {
        println!("[closed] {} {:?}", peer.endpoint(), reason);
    }

    fn on_payload(&mut self, peer: &PeerHandle, data: &[u8]) {
        println!("[payload] from={} payload=\"{}\"", peer.endpoint(), String::from_utf8_lossy(data));
        if let Err(e) = peer.send(data) {
            println!("[echo failed] {}: {}", peer.endpoint(), e);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port: u16 = env::args().nth(1).and_then(|s| s.parse().ok()).unwrap_or(9000);

    let mut core = NetCore::new(Config::default());
    core.host(port)?;
    println!("rawlink echo server listening on {}", core.local_addr()?);
    println!("Run the client example against this port to see echoes.");

    let mut handler = Echo;
    loop {
        core.poll_events(&mut handler);
        thread::sleep(Duration::from_millis(10));
    }
}
