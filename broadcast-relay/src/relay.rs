use std::{future::Future, net::SocketAddr};

use anyhow::Result;
use tokio::{
    net::{TcpListener, TcpStream},
    select,
};
use tracing::{info, warn};

use crate::{
    event::{ConnectionId, HubHandle},
    hub::{Hub, WriteFailurePolicy},
    reader::read_connection,
    redact::Redactor,
};

pub const DEFAULT_PORT: u16 = 6969;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayConfig {
    pub redact_peers: bool,
    pub write_failure: WriteFailurePolicy,
}

/// Accepts TCP clients and wires each one to the hub.
pub struct Relay {
    listener: TcpListener,
    config: RelayConfig,
}

impl Relay {
    pub fn new(listener: TcpListener, config: RelayConfig) -> Self {
        Self { listener, config }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// Resolving `shutdown` only stops the accept loop. Connections already
    /// handed to the hub keep relaying until their readers fail, and the hub
    /// stops once the last of them is gone.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Relay { listener, config } = self;
        let redactor = Redactor::new(config.redact_peers);
        let (hub, handle): (Hub, HubHandle) = Hub::new(config.write_failure, redactor);
        tokio::spawn(hub.run());
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("no longer accepting connections");
                    break;
                }
                accept_result = listener.accept() => {
                    handle_accept_result(accept_result, &handle, redactor);
                }
            }
        }

        Ok(())
    }
}

fn handle_accept_result(
    result: std::io::Result<(TcpStream, SocketAddr)>,
    hub: &HubHandle,
    redactor: Redactor,
) {
    match result {
        Ok((stream, peer)) => spawn_reader(stream, peer, hub, redactor),
        Err(err) => warn!(error = ?err, "could not accept a connection"),
    }
}

fn spawn_reader(stream: TcpStream, peer: SocketAddr, hub: &HubHandle, redactor: Redactor) {
    let id = ConnectionId::from(peer);
    info!(peer = %redactor.peer(&id), "accepted connection");

    let (reader, writer) = stream.into_split();
    // Announce before reading so the hub never sees bytes from an unknown peer.
    if let Err(err) = hub.connected(id.clone(), writer) {
        warn!(peer = %redactor.peer(&id), error = ?err, "dropping connection");
        return;
    }

    let hub = hub.clone();
    tokio::spawn(read_connection(id, reader, hub, redactor));
}
