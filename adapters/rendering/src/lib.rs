#![deny(unsafe_code, missing_docs, non_snake_case, unreachable_pub)]

//! Shared rendering contracts for Maze Party adapters.
//!
//! Renderers never look at the world directly. They receive a [`BoardScene`]
//! captured through the world's read-only queries and turn it into output.

use std::{collections::BTreeMap, error::Error, fmt};

use anyhow::Result as AnyResult;
use maze_party_core::{AgentId, Location, Tile, TileMap};
use maze_party_world::{query, LineStyle, RenderLine, World};

/// Agent as shown on the board.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentMarker {
    /// Identifier of the agent.
    pub agent: AgentId,
    /// Display name.
    pub name: String,
    /// Current cell.
    pub location: Location,
    /// Current rank.
    pub rank: usize,
    /// Current points.
    pub points: f64,
    /// Whether the agent reached the goal.
    pub finished: bool,
    /// Whether the agent is knocked out.
    pub stunned: bool,
}

impl AgentMarker {
    /// Character drawn on the agent's cell.
    ///
    /// Stunned agents are drawn in lowercase.
    #[must_use]
    pub fn initial(&self) -> char {
        let initial = self
            .name
            .chars()
            .find(|character| character.is_ascii_alphanumeric())
            .unwrap_or('?');
        if self.stunned {
            initial.to_ascii_lowercase()
        } else {
            initial.to_ascii_uppercase()
        }
    }
}

/// Snapshot of everything a renderer needs to draw the board.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardScene {
    /// Terrain.
    pub map: TileMap,
    /// Goal cell.
    pub goal: Location,
    /// Agents in rank order.
    pub agents: Vec<AgentMarker>,
    /// Trail segments recorded during the latest turn.
    pub trails: Vec<RenderLine>,
    /// Latest turn number.
    pub turn: u32,
}

impl BoardScene {
    /// Creates a new scene descriptor.
    #[must_use]
    pub fn new(
        map: TileMap,
        goal: Location,
        agents: Vec<AgentMarker>,
        trails: Vec<RenderLine>,
        turn: u32,
    ) -> Self {
        Self {
            map,
            goal,
            agents,
            trails,
            turn,
        }
    }

    /// Captures the current world state.
    #[must_use]
    pub fn capture(world: &World) -> Self {
        let agents = query::standings(world)
            .into_iter()
            .map(|agent| AgentMarker {
                agent: agent.id(),
                name: agent.name().to_owned(),
                location: agent.location(),
                rank: agent.rank(),
                points: agent.points(),
                finished: agent.is_finished(),
                stunned: agent.is_stunned(),
            })
            .collect();
        Self::new(
            query::map(world).clone(),
            query::goal(world),
            agents,
            query::render_lines(world).to_vec(),
            world.turn(),
        )
    }
}

/// Backend capable of presenting Maze Party boards.
pub trait BoardRenderer {
    /// Renders the scene into a printable document.
    fn render(&self, scene: &BoardScene) -> AnyResult<String>;
}

/// Errors raised when a scene cannot be drawn.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// An agent stands outside the map.
    MarkerOutOfBounds {
        /// Offending agent.
        agent: AgentId,
        /// Reported location.
        location: Location,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkerOutOfBounds { agent, location } => {
                write!(f, "agent {agent} is drawn at {location}, outside the board")
            }
        }
    }
}

impl Error for RenderingError {}

/// Plain-text board with row letters, one-based column numbers and a legend.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextRenderer;

const CELL_WIDTH: usize = 3;
const GOAL_GLYPH: char = 'G';
const CROWD_GLYPH: char = '&';

impl TextRenderer {
    fn glyph_for(
        scene: &BoardScene,
        location: Location,
        occupants: &BTreeMap<Location, Vec<&AgentMarker>>,
        trail: &BTreeMap<Location, LineStyle>,
    ) -> char {
        match occupants.get(&location).map(Vec::as_slice) {
            Some([single]) => return single.initial(),
            Some([_, _, ..]) => return CROWD_GLYPH,
            _ => {}
        }
        if location == scene.goal {
            return GOAL_GLYPH;
        }
        let tile = scene.map.tile(location).unwrap_or(Tile::Wall);
        let tile = if tile == Tile::HiddenHazard {
            Tile::Empty
        } else {
            tile
        };
        match (tile, trail.get(&location)) {
            (Tile::Empty, Some(style)) => trail_glyph(*style),
            _ => tile.glyph(),
        }
    }
}

impl BoardRenderer for TextRenderer {
    fn render(&self, scene: &BoardScene) -> AnyResult<String> {
        let mut occupants: BTreeMap<Location, Vec<&AgentMarker>> = BTreeMap::new();
        for marker in &scene.agents {
            if !scene.map.is_in_bounds(marker.location) {
                return Err(RenderingError::MarkerOutOfBounds {
                    agent: marker.agent,
                    location: marker.location,
                }
                .into());
            }
            if !marker.finished {
                occupants.entry(marker.location).or_default().push(marker);
            }
        }

        let mut trail = BTreeMap::new();
        for line in &scene.trails {
            for cell in trail_cells(line) {
                let _ = trail.insert(cell, line.style);
            }
        }

        let mut text = format!("Turn {}\n", scene.turn);
        text.push_str(&" ".repeat(CELL_WIDTH));
        for column in 1..=scene.map.columns() {
            text.push_str(&format!("{column:>CELL_WIDTH$}"));
        }
        text.push('\n');

        for row in 0..scene.map.rows() {
            text.push_str(&format!("{:>CELL_WIDTH$}", row_letters(row)));
            for column in 0..scene.map.columns() {
                let glyph = Self::glyph_for(scene, Location::new(row, column), &occupants, &trail);
                text.push_str(&format!("{glyph:>CELL_WIDTH$}"));
            }
            text.push('\n');
        }

        for marker in &scene.agents {
            let status = if marker.finished {
                " (finished)"
            } else if marker.stunned {
                " (stunned)"
            } else {
                ""
            };
            text.push_str(&format!(
                "{} {}: rank {}, {} points at {}{status}\n",
                marker.initial(),
                marker.name,
                marker.rank,
                marker.points,
                marker.location
            ));
        }
        Ok(text)
    }
}

fn trail_glyph(style: LineStyle) -> char {
    match style {
        LineStyle::Walk => ':',
        LineStyle::Shove => '>',
        LineStyle::Warp => '@',
        LineStyle::Charge => '=',
        LineStyle::Revert => '<',
    }
}

/// Cells covered by a trail segment; unaligned segments only mark their ends.
fn trail_cells(line: &RenderLine) -> Vec<Location> {
    let Some(direction) = line.from.direction_to(line.to) else {
        return vec![line.from, line.to];
    };
    let mut cells = vec![line.from];
    let mut cursor = line.from;
    while cursor != line.to {
        match cursor.offset(direction) {
            Some(next) => {
                cells.push(next);
                cursor = next;
            }
            None => break,
        }
    }
    cells
}

fn row_letters(row: u32) -> String {
    Location::new(row, 0)
        .label()
        .trim_end_matches(|character: char| character.is_ascii_digit())
        .to_owned()
}
