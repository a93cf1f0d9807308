use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

use crate::{
    event::{ConnectionId, HubHandle},
    redact::Redactor,
};

pub const READ_BUFFER_SIZE: usize = 512;

/// Pumps one connection's bytes into the hub until the first read failure.
///
/// Each successful read becomes one `Received` event carrying exactly the bytes
/// read; no framing is applied. End of stream and I/O errors both end the
/// connection: the read side is dropped and a single `Disconnected` event is
/// sent. Nothing is sent for this identity afterwards.
pub async fn read_connection<R, W>(
    id: ConnectionId,
    mut reader: R,
    hub: HubHandle<W>,
    redactor: Redactor,
) where
    R: AsyncRead + Unpin,
{
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => {
                info!(peer = %redactor.peer(&id), "connection closed by peer");
                break;
            }
            Ok(n) => {
                if hub.received(id.clone(), buffer[..n].to_vec()).is_err() {
                    debug!(peer = %redactor.peer(&id), "hub gone, stopping reader");
                    return;
                }
            }
            Err(err) => {
                log_read_error(&redactor, &id, &err);
                break;
            }
        }
    }

    drop(reader);
    if hub.disconnected(id).is_err() {
        debug!("hub gone before disconnect could be reported");
    }
}

fn log_read_error(redactor: &Redactor, id: &ConnectionId, err: &io::Error) {
    warn!(peer = %redactor.peer(id), error = %err, "could not read from client");
}
