//! Simple client that sends messages to a rawlink server and prints replies.
//!
//! Run the server first:
//! - cargo run -p rawlink --example server -- 7777
//!
//! Then run the client:
//! - cargo run -p rawlink --example client -- 127.0.0.1:7777
//! - cargo run -p rawlink --example client -- 127.0.0.1:7777 10 200
//!   (sends 10 messages, 200ms apart)

use std::{
    env,
    net::SocketAddr,
    thread,
    time::{Duration, Instant},
};

use rawlink::prelude::*;

#[derive(Default)]
struct Client {
    done: bool,
}

impl EventHandler for Client {
    fn on_connect_accepted(&mut self, peer: &PeerHandle) {
        println!("[accepted] {} (id {:#010x})", peer.endpoint(), peer.connection_id());
    }

    fn on_connect_rejected(&mut self, peer: &PeerHandle, reason: RejectReason) {
        println!("[rejected] {} {:?}", peer.endpoint(), reason);
        self.done = true;
    }

    fn on_connect_timed_out(&mut self, peer: &PeerHandle) {
        println!("[timeout] {}", peer.endpoint());
        self.done = true;
    }

    fn on_peer_closed(&mut self, peer: &PeerHandle, reason: CloseReason) {
        println!("[closed] {} {:?}", peer.endpoint(), reason);
        self.done = true;
    }

    fn on_payload(&mut self, peer: &PeerHandle, data: &[u8]) {
        println!("[reply] from={} payload=\"{}\"", peer.endpoint(), String::from_utf8_lossy(data));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Args: <server_addr> [count] [interval_ms]
    let mut args = env::args().skip(1);
    let server_addr: SocketAddr = args
        .next()
        .unwrap_or_else(|| "127.0.0.1:9000".to_string())
        .parse()?;
    let count: usize = args.next().unwrap_or_else(|| "5".into()).parse().unwrap_or(5);
    let interval_ms: u64 = args
        .next()
        .unwrap_or_else(|| "300".into())
        .parse()
        .unwrap_or(300);

    let mut core = NetCore::new(Config::default());
    let server = core.connect(server_addr, "rawlink-client")?;
    println!(
        "rawlink client bound to {} -> sending {} messages to {} (every {}ms)",
        core.local_addr()?,
        count,
        server_addr,
        interval_ms
    );

    let mut handler = Client::default();
    let mut sent = 0;
    let mut last_send = Instant::now();
    while sent < count && !handler.done {
        core.poll_events(&mut handler);

        if server.state().is_connected()
            && last_send.elapsed() >= Duration::from_millis(interval_ms)
        {
            server.send(format!("hello {}", sent).as_bytes())?;
            sent += 1;
            last_send = Instant::now();
        }
        thread::sleep(Duration::from_millis(10));
    }

    // Collect the last replies, then say goodbye.
    let linger = Instant::now();
    while linger.elapsed() < Duration::from_millis(interval_ms) && !handler.done {
        core.poll_events(&mut handler);
        thread::sleep(Duration::from_millis(10));
    }
    server.close(0);
    core.stop(Duration::from_secs(1));

    println!("done");
    Ok(())
}
