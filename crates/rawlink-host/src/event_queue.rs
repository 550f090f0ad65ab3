//! Hand-off of events from the network thread to the application thread.
//!
//! Events travel forward over one channel and come back for reuse over another.
//! Ownership moves with the event: the producer cannot touch an event it pushed
//! until the consumer recycles it, and recycling consumes the event.

use crossbeam_channel::{unbounded, Receiver, Sender};
use rawlink_core::{ObjectPool, Poolable};

use crate::event_types::NetEvent;

/// Consumer side of the queue, owned by the application thread.
///
/// The queue outlives any single network thread: a restarted thread gets a fresh
/// [`EventProducer`] feeding the same channel.
#[derive(Debug)]
pub(crate) struct EventQueue {
    events_tx: Sender<NetEvent>,
    events_rx: Receiver<NetEvent>,
    recycle_tx: Sender<NetEvent>,
    recycle_rx: Receiver<NetEvent>,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        let (events_tx, events_rx) = unbounded();
        let (recycle_tx, recycle_rx) = unbounded();
        Self { events_tx, events_rx, recycle_tx, recycle_rx }
    }

    /// Creates the producer handed to a network thread.
    pub(crate) fn producer(&self, pool_size: usize) -> EventProducer {
        EventProducer {
            tx: self.events_tx.clone(),
            recycled: self.recycle_rx.clone(),
            pool: ObjectPool::with_warm_up(pool_size.min(16), pool_size),
        }
    }

    /// Takes the next queued event, if any.
    pub(crate) fn pop(&self) -> Option<NetEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Returns a consumed event to the producer's pool.
    pub(crate) fn recycle(&self, mut event: NetEvent) {
        // Drop the peer reference now rather than when the producer reuses the event.
        event.reset();
        let _ = self.recycle_tx.send(event);
    }

    /// Number of events waiting to be consumed.
    pub(crate) fn len(&self) -> usize {
        self.events_rx.len()
    }
}

/// Producer side of the queue, owned by the network thread.
#[derive(Debug)]
pub(crate) struct EventProducer {
    tx: Sender<NetEvent>,
    recycled: Receiver<NetEvent>,
    pool: ObjectPool<NetEvent>,
}

impl EventProducer {
    /// Takes a reset event, preferring ones the consumer has recycled.
    pub(crate) fn acquire(&mut self) -> NetEvent {
        while let Ok(event) = self.recycled.try_recv() {
            self.pool.release(event);
        }
        self.pool.acquire()
    }

    /// Queues a filled event. Never blocks; the channel grows with the backlog.
    pub(crate) fn push(&mut self, event: NetEvent) {
        if let Err(err) = self.tx.send(event) {
            // Consumer gone: keep the event for reuse.
            self.pool.release(err.into_inner());
        }
    }
}
