use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use futures_util::{stream, Stream};
use tokio::{sync::mpsc, task::JoinHandle, time::{interval_at, Instant, MissedTickBehavior}};
use uuid::Uuid;

use crate::{messages::Message, ChatError};

use super::LiveEvent;

/// Events queued per connection before it counts as stalled and gets dropped.
pub const OUTBOX: usize = 32;

const MIN_HEARTBEAT: Duration = Duration::from_secs(1);

/// Sending side of one live connection.
#[derive(Debug, Clone)]
pub struct Handle {
    id: Uuid,
    tx: mpsc::Sender<LiveEvent>,
}

impl Handle {
    pub fn channel() -> (Handle, mpsc::Receiver<LiveEvent>) {
        let (tx, rx) = mpsc::channel(OUTBOX);
        (Handle { id: Uuid::now_v7(), tx }, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn deliver(&self, event: LiveEvent) -> Result<(), ChatError> {
        self.tx
            .try_send(event)
            .map_err(|err| ChatError::DeliveryFailure(format!("connection {}: {err}", self.id)))
    }
}

/// The set of open live connections.
///
/// A connection is CONNECTING until [`Registry::register`] has stored it and
/// queued its `connected` event, OPEN while it is in the set, and CLOSED once
/// removed. Closed handles are never re-added by the registry itself. No
/// method awaits while holding the lock.
#[derive(Clone)]
pub struct Registry {
    connections: Arc<Mutex<HashMap<Uuid, Handle>>>,
    heartbeat: Duration,
}

impl Registry {
    /// `heartbeat` is raised to one second if shorter.
    pub fn new(heartbeat: Duration) -> Registry {
        Registry {
            connections: Arc::default(),
            heartbeat: heartbeat.max(MIN_HEARTBEAT),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Handle>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.lock().contains_key(&id)
    }

    /// Opens `handle` and sends it the `connected` acknowledgment. Registering
    /// an already open handle does nothing.
    pub fn register(&self, handle: Handle) -> Result<(), ChatError> {
        let mut connections = self.lock();
        if connections.contains_key(&handle.id) {
            return Ok(());
        }

        handle.deliver(LiveEvent::Connected { client_id: handle.id })?;
        let id = handle.id;
        connections.insert(id, handle);

        tracing::info!(%id, open = connections.len(), "live connection opened");
        Ok(())
    }

    /// Returns whether the handle was open.
    pub fn unregister(&self, id: Uuid) -> bool {
        let mut connections = self.lock();
        let removed = connections.remove(&id).is_some();
        if removed {
            tracing::info!(%id, open = connections.len(), "live connection closed");
        }
        removed
    }

    /// Queues `message` on every open connection and returns how many took it.
    /// A connection that cannot take it is closed; the rest are unaffected.
    pub fn broadcast(&self, message: &Message) -> usize {
        let mut connections = self.lock();

        let mut failed = Vec::new();
        for handle in connections.values() {
            let event = LiveEvent::NewMessage { message: message.clone() };
            if let Err(err) = handle.deliver(event) {
                tracing::warn!("{err}");
                failed.push(handle.id);
            }
        }

        for id in &failed {
            connections.remove(id);
        }

        let delivered = connections.len();
        tracing::info!(id = %message.id, delivered, dropped = failed.len(), "message broadcast");
        delivered
    }

    /// Sends a heartbeat to one connection. `false` means the connection is
    /// closed, either already or because this write failed.
    pub fn heartbeat(&self, id: Uuid) -> bool {
        let mut connections = self.lock();
        let Some(handle) = connections.get(&id) else {
            return false;
        };

        match handle.deliver(LiveEvent::heartbeat()) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("heartbeat: {err}");
                connections.remove(&id);
                false
            }
        }
    }

    /// Registers a fresh connection and starts its heartbeat. Dropping the
    /// returned feed closes the connection and stops the heartbeat.
    pub fn open(&self) -> Result<LiveFeed, ChatError> {
        let (handle, rx) = Handle::channel();
        let id = handle.id();
        self.register(handle)?;

        let registry = self.clone();
        let period = self.heartbeat;
        let heartbeat = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if !registry.heartbeat(id) {
                    break;
                }
            }
        });

        Ok(LiveFeed {
            rx,
            guard: FeedGuard {
                id,
                registry: self.clone(),
                heartbeat,
            },
        })
    }
}

/// Receiving side of a connection opened with [`Registry::open`].
pub struct LiveFeed {
    rx: mpsc::Receiver<LiveEvent>,
    guard: FeedGuard,
}

struct FeedGuard {
    id: Uuid,
    registry: Registry,
    heartbeat: JoinHandle<()>,
}

impl Drop for FeedGuard {
    fn drop(&mut self) {
        self.heartbeat.abort();
        self.registry.unregister(self.id);
    }
}

impl LiveFeed {
    pub fn id(&self) -> Uuid {
        self.guard.id
    }

    /// `None` once the registry has closed this connection and the queue is drained.
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        self.rx.recv().await
    }

    pub fn into_stream(self) -> impl Stream<Item = LiveEvent> + Send + 'static {
        stream::unfold(self, |mut feed| async move {
            let event = feed.recv().await?;
            Some((event, feed))
        })
    }
}
