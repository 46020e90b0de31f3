//! Decoding and execution of POSTed build commands.
//!
//! A POST body carries a batch:
//!
//! ```json
//! {"commands": [
//!     {"id": "SETBLOCK", "x": 1, "y": 0, "z": 2, "blockId": 1},
//!     {"id": "SETALLBLOCKS", "x1": 0, "y1": 0, "z1": 0, "x2": 3, "y2": 3, "z2": 3, "blockId": 20}
//! ]}
//! ```
//!
//! Coordinates are relative to the player's tile, with x shifted one further
//! so that builds start just in front of the player. Numbers may be sent as
//! JSON numbers or numeric strings.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::app::world::{BlockId, TilePos, World, WorldError};

/// Errors decoding or applying commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("request body is not a command batch: {0}")]
    Batch(#[source] serde_json::Error),

    #[error("command has no string 'id'")]
    MissingId,

    #[error("malformed {id} command: {source}")]
    Malformed {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    World(#[from] WorldError),
}

#[derive(Debug, Deserialize)]
struct CommandBatch {
    commands: Vec<Value>,
}

/// Set a single block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SetBlock {
    #[serde(deserialize_with = "lenient_int")]
    pub x: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub y: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub z: i64,
    #[serde(rename = "blockId", deserialize_with = "lenient_block")]
    pub block_id: BlockId,
}

/// Fill a cuboid between two corners.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SetAllBlocks {
    #[serde(deserialize_with = "lenient_int")]
    pub x1: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub y1: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub z1: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub x2: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub y2: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub z2: i64,
    #[serde(rename = "blockId", deserialize_with = "lenient_block")]
    pub block_id: BlockId,
}

/// One decoded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetBlock(SetBlock),
    SetAllBlocks(SetAllBlocks),
    /// A command id this server does not act on.
    Unhandled { id: String, raw: Value },
}

impl Command {
    pub fn from_value(value: Value) -> Result<Self, CommandError> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or(CommandError::MissingId)?
            .to_string();

        let malformed = |source: serde_json::Error| CommandError::Malformed {
            id: id.clone(),
            source,
        };

        match id.as_str() {
            "SETBLOCK" => {
                return serde_json::from_value(value)
                    .map(Command::SetBlock)
                    .map_err(malformed)
            }
            "SETALLBLOCKS" => {
                return serde_json::from_value(value)
                    .map(Command::SetAllBlocks)
                    .map_err(malformed)
            }
            _ => {}
        }

        Ok(Command::Unhandled { id, raw: value })
    }

    pub fn id(&self) -> &str {
        match self {
            Command::SetBlock(_) => "SETBLOCK",
            Command::SetAllBlocks(_) => "SETALLBLOCKS",
            Command::Unhandled { id, .. } => id,
        }
    }

    /// Carry the command out against `world`.
    pub fn apply<W: World + ?Sized>(&self, world: &mut W) -> Result<(), CommandError> {
        let origin = world.player_tile_pos();
        let relative = |x: i64, y: i64, z: i64| -> TilePos {
            origin.offset(x.saturating_add(1), y, z)
        };

        match self {
            Command::SetBlock(cmd) => {
                world.set_block(relative(cmd.x, cmd.y, cmd.z), cmd.block_id);
            }
            Command::SetAllBlocks(cmd) => {
                let written = world.set_blocks(
                    relative(cmd.x1, cmd.y1, cmd.z1),
                    relative(cmd.x2, cmd.y2, cmd.z2),
                    cmd.block_id,
                )?;
                tracing::debug!(written, block_id = cmd.block_id, "Filled cuboid");
            }
            Command::Unhandled { id, raw } => {
                tracing::warn!(id = %id, command = %raw, "Unhandled command");
            }
        }
        Ok(())
    }
}

/// Decode a batch body. The outer document must be well formed; each entry
/// is decoded independently so one bad command does not hide the rest.
pub fn decode_batch(body: &str) -> Result<Vec<Result<Command, CommandError>>, CommandError> {
    let batch: CommandBatch = serde_json::from_str(body).map_err(CommandError::Batch)?;
    Ok(batch.commands.into_iter().map(Command::from_value).collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Accept `3`, `3.7` (truncated) or `"3"`.
fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match LenientNumber::deserialize(deserializer)? {
        LenientNumber::Int(n) => Ok(n),
        LenientNumber::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
        LenientNumber::Float(f) => Err(D::Error::custom(format!("{} is not a finite number", f))),
        LenientNumber::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("'{}' is not an integer", s))),
    }
}

fn lenient_block<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BlockId, D::Error> {
    let n = lenient_int(deserializer)?;
    BlockId::try_from(n).map_err(|_| D::Error::custom(format!("{} is not a block id", n)))
}
