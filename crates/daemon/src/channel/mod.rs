// Dev-server event channel: an in-process bus plus its WebSocket transport.

pub mod ws;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use storysave_common::protocol::channel::ChannelEvent;
use tokio::sync::mpsc;

/// Routes events between client transports and server-side listeners.
///
/// Events arriving from clients (`deliver` / `subscribe`) go to every
/// listener over a bounded queue; `deliver` waits for room, so a slow
/// listener slows the sending socket instead of losing requests. Events the
/// server sends (`emit` / `subscribe_outgoing`) are queued per transport
/// without a bound and are never dropped for a live transport.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

struct EventBusInner {
    capacity: usize,
    listeners: Mutex<Vec<mpsc::Sender<ChannelEvent>>>,
    transports: Mutex<Vec<mpsc::UnboundedSender<ChannelEvent>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(EventBusInner {
                capacity: capacity.max(1),
                listeners: Mutex::new(Vec::new()),
                transports: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Hand an event received from a client to the server-side listeners,
    /// waiting while a listener's queue is full. Returns how many listeners
    /// received it.
    pub async fn deliver(&self, event: ChannelEvent) -> usize {
        let listeners = {
            let mut listeners = lock(&self.inner.listeners);
            listeners.retain(|listener| !listener.is_closed());
            listeners.clone()
        };

        let mut delivered = 0;
        for listener in listeners {
            if listener.send(event.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Listen for events received from clients.
    pub fn subscribe(&self) -> mpsc::Receiver<ChannelEvent> {
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        lock(&self.inner.listeners).push(tx);
        rx
    }

    /// Send an event to every connected client. Returns how many transports
    /// received it.
    pub fn emit(&self, event: ChannelEvent) -> usize {
        let mut transports = lock(&self.inner.transports);
        transports.retain(|transport| transport.send(event.clone()).is_ok());
        transports.len()
    }

    /// Listen for events the server sends to clients.
    pub fn subscribe_outgoing(&self) -> mpsc::UnboundedReceiver<ChannelEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.inner.transports).push(tx);
        rx
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
