use std::net::{Ipv4Addr, SocketAddr};

use clap::Parser;

use crate::{
    hub::WriteFailurePolicy,
    relay::{DEFAULT_PORT, RelayConfig},
};

/// Relays raw bytes from every TCP client to every other connected client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Socket address to listen on. Use port 0 for an ephemeral port.
    #[arg(long, default_value_t = default_listen())]
    pub listen: SocketAddr,

    /// Log `[REDACTED]` in place of client addresses.
    #[arg(long)]
    pub redact: bool,

    /// What to do with a client whose write fails during a broadcast.
    #[arg(long, value_enum, default_value_t = WriteFailurePolicy::Keep)]
    pub on_write_failure: WriteFailurePolicy,
}

impl Cli {
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            redact_peers: self.redact,
            write_failure: self.on_write_failure,
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))
}
