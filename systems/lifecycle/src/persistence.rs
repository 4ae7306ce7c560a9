//! Versioned JSON save documents for [`MazeGame`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MazeGame;

const SAVE_FORMAT: &str = "maze-party";
const SAVE_VERSION: u32 = 1;

/// Errors raised while saving or restoring a game.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The document is not valid JSON or does not describe a game.
    #[error("malformed save document: {0}")]
    Json(#[from] serde_json::Error),
    /// The document belongs to something other than Maze Party.
    #[error("`{0}` is not a Maze Party save")]
    UnknownFormat(String),
    /// The document was written by an incompatible version.
    #[error("save version {0} is not supported (expected {SAVE_VERSION})")]
    UnsupportedVersion(u32),
}

#[derive(Serialize)]
struct SaveDocument<'a> {
    format: &'a str,
    version: u32,
    game: &'a MazeGame,
}

#[derive(Deserialize)]
struct SaveHeader {
    format: String,
    version: u32,
}

#[derive(Deserialize)]
struct LoadedDocument {
    game: MazeGame,
}

pub(crate) fn encode(game: &MazeGame) -> Result<String, PersistenceError> {
    let document = SaveDocument {
        format: SAVE_FORMAT,
        version: SAVE_VERSION,
        game,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

pub(crate) fn decode(text: &str) -> Result<MazeGame, PersistenceError> {
    let header: SaveHeader = serde_json::from_str(text)?;
    if header.format != SAVE_FORMAT {
        return Err(PersistenceError::UnknownFormat(header.format));
    }
    if header.version != SAVE_VERSION {
        return Err(PersistenceError::UnsupportedVersion(header.version));
    }
    let document: LoadedDocument = serde_json::from_str(text)?;
    Ok(document.game)
}
