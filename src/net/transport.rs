//! The line transport seam between sockets and the request parser.
//!
//! The parser never touches a socket. It is handed something that can write
//! whole lines, report whether the peer is still connected, and hang up.

/// Line-oriented view of a connected peer.
pub trait Transport {
    /// True while the connection is open.
    fn is_connected(&self) -> bool;

    /// Write one line. The implementation appends the line terminator.
    fn send_line(&mut self, text: &str);

    /// Terminate the connection. Lines sent afterwards are discarded.
    fn close(&mut self);
}

/// Line terminator used on the wire for outgoing lines.
pub const LINE_ENDING: &str = "\r\n";

/// Buffered outgoing side of a connection.
///
/// Lines accumulate here while the parser handles one incoming line; the
/// owning [`Connection`](crate::net::Connection) flushes them to the socket
/// afterwards and performs the actual close.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: String,
    closed: bool,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the bytes written since the last call.
    pub fn take_pending(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Transport for Outbox {
    fn is_connected(&self) -> bool {
        !self.closed
    }

    fn send_line(&mut self, text: &str) {
        if self.closed {
            tracing::trace!(line = text, "Dropping line written after close");
            return;
        }
        self.pending.push_str(text);
        self.pending.push_str(LINE_ENDING);
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
