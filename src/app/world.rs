//! The stateful block world that commands act on.
//!
//! # Responsibilities
//! - Define the operations commands may perform (`World` trait)
//! - Provide an in-memory world for running without a game server
//!
//! # Design Decisions
//! - Block id 0 is air; setting it removes the block from the map
//! - Fill volume is capped so a single request cannot exhaust memory

use std::collections::HashMap;

/// Numeric block type. 0 is air.
pub type BlockId = u32;

/// Block id meaning "no block".
pub const AIR: BlockId = 0;

/// Integer tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TilePos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl TilePos {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Offset this position by another, saturating at the integer bounds.
    pub fn offset(&self, dx: i64, dy: i64, dz: i64) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }
}

impl From<[i64; 3]> for TilePos {
    fn from([x, y, z]: [i64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for TilePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Errors raised by world operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("fill of {volume} blocks exceeds limit of {limit}")]
    FillTooLarge { volume: u128, limit: u64 },
}

/// Operations available to commands.
pub trait World {
    fn post_to_chat(&mut self, message: &str);

    fn player_tile_pos(&self) -> TilePos;

    fn set_block(&mut self, pos: TilePos, block: BlockId);

    /// Fill the cuboid spanned by two corners (inclusive, any order).
    /// Returns the number of positions written.
    fn set_blocks(&mut self, from: TilePos, to: TilePos, block: BlockId) -> Result<u64, WorldError>;
}

/// A world kept entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryWorld {
    player: TilePos,
    blocks: HashMap<TilePos, BlockId>,
    chat: Vec<String>,
    max_fill_volume: u64,
}

impl MemoryWorld {
    pub fn new(player: TilePos, max_fill_volume: u64) -> Self {
        Self {
            player,
            blocks: HashMap::new(),
            chat: Vec::new(),
            max_fill_volume,
        }
    }

    pub fn block_at(&self, pos: TilePos) -> BlockId {
        self.blocks.get(&pos).copied().unwrap_or(AIR)
    }

    /// Number of non-air blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn chat(&self) -> &[String] {
        &self.chat
    }
}

impl World for MemoryWorld {
    fn post_to_chat(&mut self, message: &str) {
        tracing::info!(chat = message, "Chat");
        self.chat.push(message.to_string());
    }

    fn player_tile_pos(&self) -> TilePos {
        self.player
    }

    fn set_block(&mut self, pos: TilePos, block: BlockId) {
        if block == AIR {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
    }

    fn set_blocks(&mut self, from: TilePos, to: TilePos, block: BlockId) -> Result<u64, WorldError> {
        let span = |a: i64, b: i64| (i128::from(a) - i128::from(b)).unsigned_abs() + 1;
        let volume = span(from.x, to.x)
            .checked_mul(span(from.y, to.y))
            .and_then(|v| v.checked_mul(span(from.z, to.z)))
            .unwrap_or(u128::MAX);
        if volume > u128::from(self.max_fill_volume) {
            return Err(WorldError::FillTooLarge {
                volume,
                limit: self.max_fill_volume,
            });
        }

        for x in from.x.min(to.x)..=from.x.max(to.x) {
            for y in from.y.min(to.y)..=from.y.max(to.y) {
                for z in from.z.min(to.z)..=from.z.max(to.z) {
                    self.set_block(TilePos::new(x, y, z), block);
                }
            }
        }

        // volume <= max_fill_volume, so it fits
        Ok(volume as u64)
    }
}
