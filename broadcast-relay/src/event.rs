use std::{fmt, net::SocketAddr};

use anyhow::{Context, Result};
use tokio::{net::tcp::OwnedWriteHalf, sync::mpsc};

/// Stable identity of a connection: the remote address string captured at
/// accept time. The registry is keyed by this, never by the handle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<SocketAddr> for ConnectionId {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the hub learns about the outside world arrives as one of these.
///
/// `W` is the write side of a connection. Production code uses the
/// [`OwnedWriteHalf`] of an accepted `TcpStream`; tests plug in in-memory
/// pipes.
#[derive(Debug)]
pub enum Event<W = OwnedWriteHalf> {
    Connected { id: ConnectionId, writer: W },
    Disconnected { id: ConnectionId },
    Received { id: ConnectionId, bytes: Vec<u8> },
}

impl<W> Event<W> {
    pub fn id(&self) -> &ConnectionId {
        match self {
            Event::Connected { id, .. }
            | Event::Disconnected { id }
            | Event::Received { id, .. } => id,
        }
    }
}

/// Producer side of the event queue, shared by the acceptor and every reader.
pub struct HubHandle<W = OwnedWriteHalf> {
    events: mpsc::UnboundedSender<Event<W>>,
}

// Derive would require `W: Clone`, which write halves are not.
impl<W> Clone for HubHandle<W> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
        }
    }
}

impl<W> HubHandle<W> {
    pub(crate) fn new(events: mpsc::UnboundedSender<Event<W>>) -> Self {
        Self { events }
    }

    pub fn connected(&self, id: ConnectionId, writer: W) -> Result<()> {
        self.send(Event::Connected { id, writer })
    }

    pub fn disconnected(&self, id: ConnectionId) -> Result<()> {
        self.send(Event::Disconnected { id })
    }

    pub fn received(&self, id: ConnectionId, bytes: Vec<u8>) -> Result<()> {
        self.send(Event::Received { id, bytes })
    }

    pub fn send(&self, event: Event<W>) -> Result<()> {
        self.events
            .send(event)
            .ok()
            .context("hub is no longer running")
    }

    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_comes_from_remote_address() {
        let addr: SocketAddr = "10.0.0.7:50123".parse().expect("valid addr");
        let id = ConnectionId::from(addr);
        assert_eq!(id.as_str(), "10.0.0.7:50123");
        assert_eq!(id, ConnectionId::new("10.0.0.7:50123"));
    }

    #[test]
    fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel::<Event<Vec<u8>>>();
        let handle = HubHandle::new(tx);
        handle
            .disconnected("a".into())
            .expect("queue open while receiver alive");

        drop(rx);
        assert!(handle.is_closed());
        assert!(handle.received("a".into(), b"late".to_vec()).is_err());
    }
}
