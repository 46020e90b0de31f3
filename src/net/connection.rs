//! A single accepted client connection.
//!
//! # Responsibilities
//! - Split the socket into a buffered line reader and a writer
//! - Deliver incoming lines with their terminator stripped
//! - Bound every line wait by the idle timeout and every line by a byte limit
//! - Flush parser output and perform the close the parser asked for

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::net::transport::{Outbox, Transport};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// How long to keep reading (and discarding) client input after we hang up.
const LINGER: Duration = Duration::from_millis(250);

/// Upper bound on input discarded while lingering.
const LINGER_MAX_BYTES: u64 = 64 * 1024;

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Errors raised while servicing a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("peer sent nothing for {0:?}")]
    IdleTimeout(Duration),

    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("connection I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One received line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedLine {
    /// The line without its terminator, decoded lossily.
    pub text: String,
    /// Bytes the line occupied on the wire, terminator included.
    pub wire_len: usize,
}

/// An accepted TCP connection driven line by line.
pub struct Connection {
    id: ConnectionId,
    peer: SocketAddr,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    outbox: Outbox,
    line_buf: Vec<u8>,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            id: ConnectionId::new(),
            peer,
            reader: BufReader::new(read_half),
            writer: write_half,
            outbox: Outbox::new(),
            line_buf: Vec::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// The transport handed to the parser for this connection.
    pub fn transport(&mut self) -> &mut Outbox {
        &mut self.outbox
    }

    pub fn is_open(&self) -> bool {
        self.outbox.is_connected()
    }

    /// Read the next line, without its `\n` or `\r\n` terminator.
    ///
    /// Returns `Ok(None)` once the peer has closed its side. A final line
    /// without a terminator is still delivered. Invalid UTF-8 is replaced
    /// rather than rejected; `wire_len` still counts the raw bytes. A line
    /// longer than `max_len` bytes, terminator included, is an error.
    pub async fn read_line(
        &mut self,
        idle: Duration,
        max_len: usize,
    ) -> Result<Option<ReceivedLine>, ConnectionError> {
        self.line_buf.clear();
        let mut limited = (&mut self.reader).take(max_len as u64);
        let read = tokio::time::timeout(idle, limited.read_until(b'\n', &mut self.line_buf))
            .await
            .map_err(|_| ConnectionError::IdleTimeout(idle))??;

        if read == 0 {
            return Ok(None);
        }
        if read >= max_len && self.line_buf.last() != Some(&b'\n') {
            return Err(ConnectionError::LineTooLong(max_len));
        }

        let mut end = self.line_buf.len();
        if end > 0 && self.line_buf[end - 1] == b'\n' {
            end -= 1;
            if end > 0 && self.line_buf[end - 1] == b'\r' {
                end -= 1;
            }
        }

        Ok(Some(ReceivedLine {
            text: String::from_utf8_lossy(&self.line_buf[..end]).into_owned(),
            wire_len: read,
        }))
    }

    /// Write out whatever the parser queued, and hang up if it closed.
    pub async fn flush(&mut self) -> Result<(), ConnectionError> {
        let pending = self.outbox.take_pending();
        if !pending.is_empty() {
            self.writer.write_all(pending.as_bytes()).await?;
            self.writer.flush().await?;
        }
        if self.outbox.is_closed() {
            self.hang_up().await?;
        }
        Ok(())
    }

    /// Close our side of the connection.
    ///
    /// Unread client input is drained briefly first so the kernel does not
    /// answer it with a reset that could destroy the response in flight.
    pub async fn hang_up(&mut self) -> Result<(), ConnectionError> {
        self.outbox.close();
        self.writer.shutdown().await?;

        let mut sink = tokio::io::sink();
        let mut limited = (&mut self.reader).take(LINGER_MAX_BYTES);
        let _ = tokio::time::timeout(LINGER, tokio::io::copy(&mut limited, &mut sink)).await;

        tracing::trace!(connection_id = %self.id, "Connection closed");
        Ok(())
    }
}
