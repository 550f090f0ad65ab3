use std::{
    fmt,
    net::{Ipv4Addr, SocketAddr},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use rawlink_core::{
    config::Config,
    error::{ErrorKind, Result},
    id::{IdGenerator, RandomIdGenerator},
    transport::Transport,
};
use rawlink_peer::{CloseReason, Direction, PeerShared, PeerState};
use rawlink_protocol::RejectReason;
use tracing::{debug, error};

use crate::{
    controller::{Command, Controller},
    event_queue::EventQueue,
    event_types::EventKind,
    peer_handle::{lock_sender, AppSender, PeerHandle, SharedSender},
    socket::{unspecified_for, UdpTransport},
    time::{Clock, SystemClock},
};

/// Typed callbacks fired by [`NetCore::poll_events`]. Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait EventHandler {
    /// A remote endpoint connected to us.
    fn on_peer_connected(&mut self, peer: &PeerHandle) {}
    /// Our connect was accepted.
    fn on_connect_accepted(&mut self, peer: &PeerHandle) {}
    /// Our connect was refused.
    fn on_connect_rejected(&mut self, peer: &PeerHandle, reason: RejectReason) {}
    /// Our connect got no answer in time.
    fn on_connect_timed_out(&mut self, peer: &PeerHandle) {}
    /// An established session ended.
    fn on_peer_closed(&mut self, peer: &PeerHandle, reason: CloseReason) {}
    /// A payload arrived. `data` is only valid for the duration of the call.
    fn on_payload(&mut self, peer: &PeerHandle, data: &[u8]) {}
}

type PeerConnectedCallback = Box<dyn FnMut(&PeerHandle) + Send>;

/// A started network thread.
struct Running {
    thread: JoinHandle<()>,
    stop: Arc<AtomicBool>,
    done: Receiver<()>,
    commands: Sender<Command>,
    local_addr: SocketAddr,
}

/// Entry point of the library, used from one application thread.
///
/// Owns the network thread and the event queue. Events are only delivered from
/// inside [`NetCore::poll_events`].
pub struct NetCore {
    config: Config,
    id_generator: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    queue: EventQueue,
    sender: SharedSender,
    running: Option<Running>,
    peer_connected: Vec<PeerConnectedCallback>,
}

impl fmt::Debug for NetCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetCore")
            .field("config", &self.config)
            .field("local_addr", &self.running.as_ref().map(|r| r.local_addr))
            .field("pending_events", &self.queue.len())
            .finish()
    }
}

impl NetCore {
    /// Creates a stopped core with random connection ids.
    pub fn new(config: Config) -> Self {
        Self::with_id_generator(config, Arc::new(RandomIdGenerator))
    }

    /// Creates a stopped core drawing connection ids from `id_generator`.
    pub fn with_id_generator(config: Config, id_generator: Arc<dyn IdGenerator>) -> Self {
        Self::with_id_generator_and_clock(config, id_generator, Arc::new(SystemClock))
    }

    /// Creates a stopped core with a custom id source and time source for testing.
    pub fn with_id_generator_and_clock(
        config: Config,
        id_generator: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        NetCore {
            config,
            id_generator,
            clock,
            queue: EventQueue::new(),
            sender: Arc::new(Mutex::new(None)),
            running: None,
            peer_connected: Vec::new(),
        }
    }

    /// Returns the configuration this core was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Binds `port` on all IPv4 interfaces and starts accepting inbound connects.
    pub fn host(&mut self, port: u16) -> Result<()> {
        self.reap();
        if self.running.is_some() {
            return Err(ErrorKind::AlreadyRunning);
        }
        self.start(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)), true)
    }

    /// Starts a handshake with `endpoint` and returns its handle immediately.
    ///
    /// Binds an ephemeral port first if the core is not running. The outcome arrives
    /// later as a connect accepted, rejected or timed out event.
    pub fn connect(&mut self, endpoint: SocketAddr, token: &str) -> Result<PeerHandle> {
        let max = self.config.token_limit();
        if token.len() > max {
            return Err(ErrorKind::TokenTooLong { len: token.len(), max });
        }
        self.reap();
        if self.running.is_none() {
            self.start(unspecified_for(&endpoint), false)?;
        }
        let running = self.running.as_ref().ok_or(ErrorKind::NotRunning)?;

        let connection_id = self.id_generator.next_id();
        let shared = Arc::new(PeerShared::new(endpoint, token, connection_id, Direction::Outbound));
        running
            .commands
            .send(Command::Connect(Arc::clone(&shared)))
            .map_err(|_| ErrorKind::NotRunning)?;
        Ok(PeerHandle::new(shared, Arc::clone(&self.sender)))
    }

    /// Registers a callback fired for every inbound connection, before
    /// [`EventHandler::on_peer_connected`].
    pub fn subscribe_peer_connected<F>(&mut self, callback: F)
    where
        F: FnMut(&PeerHandle) + Send + 'static,
    {
        self.peer_connected.push(Box::new(callback));
    }

    /// Dispatches every queued event to `handler` and returns how many were delivered.
    ///
    /// Events for peers closed through [`PeerHandle::close`] are discarded.
    pub fn poll_events<H: EventHandler>(&mut self, handler: &mut H) -> usize {
        let mut dispatched = 0;
        while let Some(event) = self.queue.pop() {
            let shared = match event.peer() {
                Some(shared) => Arc::clone(shared),
                None => unreachable!("event {:?} reached dispatch without a peer", event.kind()),
            };
            if shared.is_closed_by_user() {
                self.queue.recycle(event);
                continue;
            }
            let peer = PeerHandle::new(shared, Arc::clone(&self.sender));

            match event.kind() {
                EventKind::Empty => unreachable!("empty event reached dispatch"),
                EventKind::PeerConnected => {
                    peer.shared().set_state(PeerState::Connected);
                    for callback in self.peer_connected.iter_mut() {
                        callback(&peer);
                    }
                    handler.on_peer_connected(&peer);
                }
                EventKind::ConnectAccepted => {
                    peer.shared().set_state(PeerState::Connected);
                    handler.on_connect_accepted(&peer);
                }
                EventKind::ConnectRejected(reason) => {
                    peer.shared().set_state(PeerState::Closed(CloseReason::Rejected(*reason)));
                    handler.on_connect_rejected(&peer, *reason);
                }
                EventKind::ConnectTimedOut => {
                    peer.shared().set_state(PeerState::Closed(CloseReason::TimedOutConnecting));
                    handler.on_connect_timed_out(&peer);
                }
                EventKind::PeerClosed(reason) => {
                    peer.shared().set_state(PeerState::Closed(*reason));
                    handler.on_peer_closed(&peer, *reason);
                }
                EventKind::Payload(data) => handler.on_payload(&peer, data),
            }
            self.queue.recycle(event);
            dispatched += 1;
        }
        dispatched
    }

    /// Number of events waiting for [`NetCore::poll_events`].
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Signals the network thread to stop and waits up to `timeout` for it.
    ///
    /// Connected peers are sent a Disconnect and reported closed with
    /// [`CloseReason::Shutdown`] on the next poll. Returns false if the thread did
    /// not finish in time; it is then left to exit on its own.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        let Some(running) = self.running.take() else {
            return true;
        };
        running.stop.store(true, Ordering::Release);

        let stopped = match running.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if running.thread.join().is_err() {
                    error!("network thread panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                error!("network thread did not stop within {:?}", timeout);
                false
            }
        };
        // Dropping the writer closes our handle on the socket.
        *lock_sender(&self.sender) = None;
        stopped
    }

    /// Returns true while the network thread is alive.
    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|running| !running.thread.is_finished())
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr).ok_or(ErrorKind::NotRunning)
    }

    fn start(&mut self, address: SocketAddr, accept_inbound: bool) -> Result<()> {
        let transport = UdpTransport::bind(address, &self.config)?;
        let local_addr = transport.local_addr()?;
        let app_transport = transport.try_clone()?;

        let stop = Arc::new(AtomicBool::new(false));
        let (commands_tx, commands_rx) = unbounded();
        let (done_tx, done_rx) = bounded(1);
        let controller = Controller::new(
            self.config.clone(),
            Box::new(transport),
            self.queue.producer(self.config.event_pool_size),
            commands_rx,
            Arc::clone(&self.clock),
            accept_inbound,
            Arc::clone(&stop),
        );
        let thread = thread::Builder::new().name("rawlink-net".to_owned()).spawn(move || {
            controller.run();
            let _ = done_tx.send(());
        })?;

        *lock_sender(&self.sender) = Some(AppSender::new(app_transport, commands_tx.clone()));
        debug!("network thread started on {} (hosting: {})", local_addr, accept_inbound);
        self.running = Some(Running { thread, stop, done: done_rx, commands: commands_tx, local_addr });
        Ok(())
    }

    /// Cleans up after a network thread that exited on its own.
    fn reap(&mut self) {
        if self.running.as_ref().is_some_and(|running| running.thread.is_finished()) {
            self.stop(Duration::ZERO);
        }
    }
}

impl Drop for NetCore {
    fn drop(&mut self) {
        if self.running.is_some() {
            self.stop(self.config.stop_timeout);
        }
    }
}
