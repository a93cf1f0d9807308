use std::fmt;

use crate::event::ConnectionId;

pub const REDACTED: &str = "[REDACTED]";

/// Decides how peer addresses appear in logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Redactor {
    enabled: bool,
}

impl Redactor {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Wraps `id` for use as a `%peer` tracing field.
    pub fn peer<'a>(&self, id: &'a ConnectionId) -> PeerDisplay<'a> {
        PeerDisplay {
            id,
            redacted: self.enabled,
        }
    }
}

pub struct PeerDisplay<'a> {
    id: &'a ConnectionId,
    redacted: bool,
}

impl fmt::Display for PeerDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.redacted {
            f.write_str(REDACTED)
        } else {
            fmt::Display::fmt(self.id, f)
        }
    }
}
