//! Block-world application.
//!
//! # Data Flow
//! ```text
//! GET target  → handlers.rs (route by path) → world.rs (query / chat)
//! POST body   → commands.rs (decode batch)  → world.rs (set blocks)
//! ```

pub mod commands;
pub mod handlers;
pub mod world;

pub use commands::{Command, CommandError};
pub use handlers::BlockDispatcher;
pub use world::{BlockId, MemoryWorld, TilePos, World, WorldError};
