//! HTTP server loop.
//!
//! # Responsibilities
//! - Accept one connection at a time from the listener
//! - Feed each received line to the request state machine
//! - Flush the machine's output and honour its close
//! - Reset the machine between connections
//! - Stop between or during connections when shutdown fires
//!
//! # Design Decisions
//! - Strictly sequential: the next peer waits until the current one is done
//! - Every line wait is bounded by `timeouts.idle_secs`; an idle peer is
//!   dropped without a response
//! - Lines longer than `listener.max_line_bytes` are answered with `400`
//! - Per-connection failures are logged, never fatal to the loop

use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::http::dispatch::Dispatch;
use crate::http::machine::RequestStateMachine;
use crate::http::request::ParserPhase;
use crate::lifecycle::ShutdownSignal;
use crate::net::{Connection, ConnectionError, Listener, ListenerError};
use crate::observability::metrics;

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Errors that stop the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("server I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// The state machine answered and hung up.
    Closed,
    /// The peer went away first.
    PeerClosed,
    /// Shutdown fired while the connection was open.
    Shutdown,
}

/// Sequential line-driven HTTP server.
pub struct HttpServer<D> {
    machine: RequestStateMachine<D>,
    idle_timeout: Duration,
    max_line_bytes: usize,
}

impl<D: Dispatch> HttpServer<D> {
    /// Create a new server with the given configuration and dispatcher.
    pub fn new(config: &ServerConfig, dispatch: D) -> Self {
        Self {
            machine: RequestStateMachine::new(dispatch),
            idle_timeout: Duration::from_secs(config.timeouts.idle_secs),
            max_line_bytes: config.listener.max_line_bytes,
        }
    }

    /// Serve connections until shutdown, then hand back the dispatcher.
    pub async fn run(mut self, listener: Listener, mut shutdown: ShutdownSignal) -> Result<D, ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                accepted = listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            metrics::record_connection();
            let mut conn = Connection::new(stream, peer);
            let span = tracing::info_span!(
                "connection",
                connection_id = %conn.id(),
                peer = %conn.peer(),
                request_id = %Uuid::new_v4()
            );

            let stop = self
                .handle_connection(&mut conn, &mut shutdown)
                .instrument(span)
                .await;
            self.machine.reset();
            if stop {
                break;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(self.machine.into_dispatcher())
    }

    /// Serve one connection and log how it ended. Returns true on shutdown.
    async fn handle_connection(&mut self, conn: &mut Connection, shutdown: &mut ShutdownSignal) -> bool {
        match self.serve_connection(conn, shutdown).await {
            Ok(Outcome::Closed) => tracing::debug!("Connection finished"),
            Ok(Outcome::PeerClosed) => {
                if self.machine.phase() != ParserPhase::AwaitingRequestLine {
                    tracing::debug!(phase = ?self.machine.phase(), "Peer closed mid-request");
                }
            }
            Ok(Outcome::Shutdown) => return true,
            Err(e) => {
                tracing::warn!(error = %e, "Connection aborted");
                if let Err(e) = conn.hang_up().await {
                    tracing::debug!(error = %e, "Hang up failed");
                }
            }
        }
        false
    }

    async fn serve_connection(
        &mut self,
        conn: &mut Connection,
        shutdown: &mut ShutdownSignal,
    ) -> Result<Outcome, ConnectionError> {
        loop {
            let read = tokio::select! {
                biased;
                _ = shutdown.recv() => None,
                read = conn.read_line(self.idle_timeout, self.max_line_bytes) => Some(read),
            };

            let Some(read) = read else {
                conn.hang_up().await?;
                return Ok(Outcome::Shutdown);
            };
            match read {
                Ok(Some(line)) => {
                    self.machine
                        .on_received(&line.text, line.wire_len, conn.transport())
                }
                Ok(None) => return Ok(Outcome::PeerClosed),
                Err(ConnectionError::LineTooLong(limit)) => {
                    self.machine.on_line_too_long(limit, conn.transport())
                }
                Err(e) => return Err(e),
            }
            conn.flush().await?;

            if !conn.is_open() {
                return Ok(Outcome::Closed);
            }
        }
    }
}
