//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the optional metrics endpoint
//! - Bind the listener
//! - Build the world, dispatcher and server from configuration
//! - Serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: bind errors are fatal
//! - A broken metrics endpoint is logged, not fatal

use crate::app::{BlockDispatcher, MemoryWorld};
use crate::config::ServerConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::Shutdown;
use crate::net::Listener;
use crate::observability::metrics;

/// Run the server described by `config` until `shutdown` fires.
pub async fn start(config: ServerConfig, shutdown: &Shutdown) -> Result<(), ServerError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = Listener::bind(&config.listener).await?;

    let world = MemoryWorld::new(config.app.player_position.into(), config.app.max_fill_volume);
    let dispatcher = BlockDispatcher::new(&config.app.path_prefix, world);
    let server = HttpServer::new(&config, dispatcher);

    let dispatcher = server.run(listener, shutdown.subscribe()).await?;
    tracing::info!(
        blocks = dispatcher.world().block_count(),
        chat_messages = dispatcher.world().chat().len(),
        "Server stopped"
    );
    Ok(())
}
