//! HTTP/1.0 protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (one at a time)
//!     → server.rs (accept loop, line reads, flush, reset)
//!     → machine.rs (phase per line, framing decisions)
//!     → request.rs (request line, headers, record)
//!     → dispatch.rs (application seam: GET body / POST action)
//!     → response.rs (status line, headers, body, close)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod machine;
pub mod request;
pub mod response;
pub mod server;

pub use dispatch::Dispatch;
pub use machine::RequestStateMachine;
pub use request::{Method, ParserPhase, RequestRecord};
pub use server::{HttpServer, ServerError};
