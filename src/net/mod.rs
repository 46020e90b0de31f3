//! Network layer.
//!
//! # Data Flow
//! ```text
//! TCP client
//!     → listener.rs (bind, accept one connection at a time)
//!     → connection.rs (line reader with idle timeout, buffered writer)
//!     → transport.rs (Transport trait seen by the request parser)
//! ```
//!
//! # Design Decisions
//! - The parser is synchronous; it writes into an `Outbox` which the
//!   connection flushes after every delivered line
//! - Line terminators are stripped on the way in and `\r\n` is added on the
//!   way out

pub mod connection;
pub mod listener;
pub mod transport;

pub use connection::{Connection, ConnectionError, ConnectionId, ReceivedLine};
pub use listener::{Listener, ListenerError};
pub use transport::{Outbox, Transport};
