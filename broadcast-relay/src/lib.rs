//! TCP broadcast relay.
//!
//! Every byte a client writes is forwarded verbatim to every other connected
//! client. The moving parts:
//!
//! - [`relay`] accepts TCP connections, announces each to the hub and spawns
//!   a reader for it.
//! - [`reader`] turns one connection's reads into events on the hub's queue.
//! - [`hub`] is the only consumer of that queue and the only owner of the
//!   connection registry; it registers, removes and broadcasts.
//! - [`event`] defines the events and the producer handle.
//! - [`redact`] hides peer addresses in logs when asked to.
//! - [`cli`] parses the command line into a [`relay::RelayConfig`].

pub mod cli;
pub mod event;
pub mod hub;
pub mod reader;
pub mod redact;
pub mod relay;
