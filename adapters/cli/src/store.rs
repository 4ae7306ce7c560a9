//! Save-file and rules-file handling for the command-line host.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use maze_party_core::Tuning;
use maze_party_system_lifecycle::MazeGame;

/// Reads the rules file, or returns the shipped defaults when none is given.
pub(crate) fn load_tuning(path: Option<&Path>) -> Result<Tuning> {
    let Some(path) = path else {
        return Ok(Tuning::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read rules file {}", path.display()))?;
    parse_tuning(&contents).with_context(|| format!("invalid rules file {}", path.display()))
}

fn parse_tuning(contents: &str) -> Result<Tuning> {
    toml::from_str(contents).context("failed to parse rules toml contents")
}

pub(crate) fn load(path: &Path) -> Result<MazeGame> {
    let contents = fs::read_to_string(path).with_context(|| {
        format!(
            "failed to read {}; start a game with `maze-party new`",
            path.display()
        )
    })?;
    MazeGame::load(&contents).with_context(|| format!("failed to restore {}", path.display()))
}

pub(crate) fn save(path: &Path, game: &MazeGame) -> Result<()> {
    let contents = game.save().context("failed to serialise the game")?;
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    log::debug!("saved turn {} to {}", game.world().turn(), path.display());
    Ok(())
}
