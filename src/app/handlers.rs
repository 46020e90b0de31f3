//! The block-world dispatcher behind the HTTP parser.
//!
//! # Responsibilities
//! - Route GET targets to query handlers under the configured prefix
//! - Decode POST bodies into command batches and apply them in order
//! - Keep decode and application failures out of the HTTP framing
//!
//! # Design Decisions
//! - GET failures are reported in the body text; the status stays `200 OK`
//! - POST failures are logged only, the client always receives `OK`

use crate::app::commands::decode_batch;
use crate::app::world::World;
use crate::http::Dispatch;
use crate::routing::{decode_target, QueryParams, RouteMatch, Router};

/// Body returned for GET paths outside every registered prefix.
pub const IGNORED: &str = "IGNORED";

/// Dispatches decoded requests onto a [`World`].
pub struct BlockDispatcher<W> {
    router: Router<W>,
    world: W,
}

impl<W: World> BlockDispatcher<W> {
    /// Mount the GET handlers under `prefix`.
    pub fn new(prefix: &str, world: W) -> Self {
        let router = Router::new()
            .route(prefix, "postToChat", post_to_chat::<W>)
            .route(prefix, "player_getTilePos", player_get_tile_pos::<W>);
        Self { router, world }
    }

    pub fn world(&self) -> &W {
        &self.world
    }
}

fn post_to_chat<W: World>(world: &mut W, query: &QueryParams) -> String {
    match query.first("msg") {
        Some(message) => {
            world.post_to_chat(message);
            String::new()
        }
        None => "Missing parameter:msg".to_string(),
    }
}

fn player_get_tile_pos<W: World>(world: &mut W, _query: &QueryParams) -> String {
    world.player_tile_pos().to_string()
}

impl<W: World> Dispatch for BlockDispatcher<W> {
    fn get(&mut self, target: &str) -> String {
        let decoded = match decode_target(target) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(request_target = target, error = %e, "Undecodable GET target");
                return format!("Bad target:{}", e);
            }
        };

        match self.router.lookup(&decoded.path) {
            RouteMatch::Handler(handler) => handler(&mut self.world, &decoded.query),
            RouteMatch::UnknownName(name) => {
                tracing::debug!(name, "Unknown command path");
                format!("Unknown path:{}", name)
            }
            RouteMatch::NoMatch => {
                tracing::debug!(path = %decoded.path, "Ignoring unknown path");
                IGNORED.to_string()
            }
        }
    }

    fn post(&mut self, target: &str, body: &str) {
        let commands = match decode_batch(body) {
            Ok(commands) => commands,
            Err(e) => {
                tracing::warn!(path = target, error = %e, "Rejected POST body");
                return;
            }
        };

        let total = commands.len();
        let mut applied = 0usize;
        for command in commands {
            let result = command.and_then(|c| c.apply(&mut self.world));
            match result {
                Ok(()) => applied += 1,
                Err(e) => tracing::warn!(error = %e, "Command failed"),
            }
        }

        tracing::info!(path = target, total, applied, "Command batch executed");
    }
}
