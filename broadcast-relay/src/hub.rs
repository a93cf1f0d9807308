//! The single consumer of the event queue.
//!
//! The hub owns the registry of live connections outright. Readers and the
//! acceptor only ever talk to it through a [`HubHandle`], so the registry is
//! read and mutated on one task and needs no lock.

use std::collections::HashMap;

use clap::ValueEnum;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    net::tcp::OwnedWriteHalf,
    sync::mpsc,
};
use tracing::{debug, info, warn};

use crate::{
    event::{ConnectionId, Event, HubHandle},
    redact::Redactor,
};

/// What the hub does with a recipient whose write failed mid-broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum WriteFailurePolicy {
    /// Log and keep the entry; it leaves when its reader reports a disconnect.
    #[default]
    Keep,
    /// Log and drop the entry once the broadcast finishes.
    Prune,
}

pub struct Hub<W = OwnedWriteHalf> {
    events: mpsc::UnboundedReceiver<Event<W>>,
    registry: HashMap<ConnectionId, W>,
    on_write_failure: WriteFailurePolicy,
    redactor: Redactor,
}

impl<W> Hub<W>
where
    W: AsyncWrite + Unpin,
{
    /// Creates an empty hub plus the handle producers use to reach it.
    pub fn new(on_write_failure: WriteFailurePolicy, redactor: Redactor) -> (Self, HubHandle<W>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Self {
            events: rx,
            registry: HashMap::new(),
            on_write_failure,
            redactor,
        };
        (hub, HubHandle::new(tx))
    }

    /// Processes events one at a time until every handle has been dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            self.handle_event(event).await;
        }
        debug!("event queue closed, hub stopping");
    }

    pub async fn handle_event(&mut self, event: Event<W>) {
        match event {
            Event::Connected { id, writer } => self.register(id, writer),
            Event::Disconnected { id } => self.unregister(&id),
            Event::Received { id, bytes } => self.broadcast(&id, &bytes).await,
        }
    }

    /// Identities currently registered, sorted.
    pub fn registered(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.registry.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn register(&mut self, id: ConnectionId, writer: W) {
        info!(peer = %self.redactor.peer(&id), "client connected");
        // A repeated identity replaces the earlier handle.
        self.registry.insert(id, writer);
    }

    fn unregister(&mut self, id: &ConnectionId) {
        info!(peer = %self.redactor.peer(id), "client disconnected");
        self.registry.remove(id);
    }

    async fn broadcast(&mut self, sender: &ConnectionId, bytes: &[u8]) {
        info!(
            peer = %self.redactor.peer(sender),
            len = bytes.len(),
            text = %String::from_utf8_lossy(bytes),
            "client sent message"
        );

        let mut failed = Vec::new();
        for (id, writer) in self.registry.iter_mut() {
            if id == sender {
                continue;
            }
            if let Err(err) = deliver(writer, bytes).await {
                warn!(peer = %self.redactor.peer(id), error = ?err, "could not send data");
                failed.push(id.clone());
            }
        }

        if self.on_write_failure == WriteFailurePolicy::Prune {
            for id in failed {
                info!(peer = %self.redactor.peer(&id), "dropping recipient after failed write");
                self.registry.remove(&id);
            }
        }
    }
}

async fn deliver<W>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await?;
    writer.flush().await
}
