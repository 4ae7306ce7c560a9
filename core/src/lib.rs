#![deny(unsafe_code, missing_docs, non_snake_case, unreachable_pub)]

//! Core contracts shared across the Maze Party engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the turn systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and every observable outcome is
//! broadcast as an [`Event`] that can be narrated back to the players.

use std::{collections::BTreeMap, fmt};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

mod action;
mod engine;
mod event;
mod grid;
mod tuning;

pub use action::{Action, ActionParseError};
pub use engine::{MinigameEngine, PrizeTier, TickReport, TurnSummary};
pub use event::Event;
pub use grid::{Tile, TileMap};
pub use tuning::{Tuning, Variant};

/// Canonical banner emitted when a new maze is opened.
pub const WELCOME_BANNER: &str = "Welcome to the Maze. First to the goal wins.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the world's terrain with a freshly generated map.
    ConfigureMap {
        /// Tile layout of the maze.
        map: TileMap,
        /// Cell every agent is racing toward.
        goal: Location,
        /// Traversal cost attached to each doorway tile.
        doorway_costs: BTreeMap<Location, u32>,
    },
    /// Registers a new agent at the provided location.
    AddAgent {
        /// Display name shown in narration.
        name: String,
        /// Cell where the agent enters the maze.
        location: Location,
    },
    /// Removes an agent together with any pending decisions.
    RemoveAgent {
        /// Agent leaving the game.
        agent: AgentId,
    },
    /// Credits (or debits) points to an agent's budget.
    AwardPoints {
        /// Recipient of the points.
        agent: AgentId,
        /// Amount to credit before the agent's multiplier is applied.
        amount: f64,
    },
    /// Sets or clears the multiplier applied to positive awards.
    SetMultiplier {
        /// Agent receiving the multiplier.
        agent: AgentId,
        /// Multiplier to install, or `None` to clear it.
        multiplier: Option<f64>,
    },
    /// Adds one unit of an item to an agent's inventory.
    GrantItem {
        /// Recipient of the item.
        agent: AgentId,
        /// Item being granted.
        item: Item,
    },
    /// Replaces an agent's pending prize offer.
    OfferItems {
        /// Agent that may choose from the offer.
        agent: AgentId,
        /// Items on offer.
        items: Vec<Item>,
    },
    /// Converts one offered item into inventory and clears the offer.
    ClaimItem {
        /// Agent claiming the item.
        agent: AgentId,
        /// Item selected from the pending offer.
        item: Item,
    },
    /// Withdraws every pending prize offer.
    ClearOffers,
    /// Opens a new turn and resets per-turn bookkeeping.
    BeginTurn,
    /// Installs the decision queue an agent will execute this turn.
    QueueDecisions {
        /// Agent whose queue is replaced.
        agent: AgentId,
        /// Ordered actions to execute.
        actions: Vec<Action>,
    },
    /// Places a hidden hazard on an empty tile.
    PlaceHazard {
        /// Cell receiving the hazard.
        location: Location,
        /// Agent rewarded when the hazard triggers, if any.
        owner: Option<AgentId>,
    },
    /// Places a collectible on an empty tile.
    PlaceCollectible {
        /// Cell receiving the collectible.
        location: Location,
    },
}

/// Cardinal movement directions available to agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Movement toward decreasing row indices.
    Up,
    /// Movement toward increasing row indices.
    Down,
    /// Movement toward decreasing column indices.
    Left,
    /// Movement toward increasing column indices.
    Right,
}

impl Direction {
    /// Every direction in the order neighbours are explored.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Token used for the direction in decision strings.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Parses a direction token, accepting single-letter shorthands.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "up" | "u" => Some(Direction::Up),
            "down" | "d" => Some(Direction::Down),
            "left" | "l" => Some(Direction::Left),
            "right" | "r" => Some(Direction::Right),
            _ => None,
        }
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// The two directions at right angles to this one.
    #[must_use]
    pub const fn perpendicular(self) -> [Direction; 2] {
        match self {
            Direction::Up | Direction::Down => [Direction::Left, Direction::Right],
            Direction::Left | Direction::Right => [Direction::Up, Direction::Down],
        }
    }

    /// Row and column delta of a single step.
    #[must_use]
    pub const fn delta(self) -> (i64, i64) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Consumable items agents can hold and spend through actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Item {
    /// Places a hidden hazard owned by the holder.
    Trap,
    /// Places an impassable obstacle.
    Obstacle,
    /// Places a collectible worth a few points.
    Collectible,
    /// Charges in a straight line, trampling anyone in the way.
    Charge,
    /// Grants invincibility for the rest of the turn.
    Star,
    /// Unlocks an adjacent doorway without paying.
    Key,
    /// Permanently walls off an adjacent doorway.
    Seal,
}

impl Item {
    /// Every item kind in declaration order.
    pub const ALL: [Item; 7] = [
        Item::Trap,
        Item::Obstacle,
        Item::Collectible,
        Item::Charge,
        Item::Star,
        Item::Key,
        Item::Seal,
    ];

    /// Lowercase name used in messages and claims.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Item::Trap => "trap",
            Item::Obstacle => "obstacle",
            Item::Collectible => "collectible",
            Item::Charge => "charge",
            Item::Star => "star",
            Item::Key => "key",
            Item::Seal => "seal",
        }
    }

    /// Looks up an item by its name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        Item::ALL.into_iter().find(|item| item.name() == lowered)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Location of a single maze cell expressed as row and column coordinates.
///
/// Locations are written as a row label followed by a one-based column
/// number: `A1` is the top-left cell, `B12` the twelfth cell of the second
/// row. Rows past `Z` continue with `AA`, `AB` and so on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    row: u32,
    column: u32,
}

impl Location {
    /// Creates a new location from zero-based coordinates.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Computes the Manhattan distance between two locations.
    #[must_use]
    pub fn manhattan_distance(self, other: Location) -> u32 {
        self.row.abs_diff(other.row) + self.column.abs_diff(other.column)
    }

    /// Location one step away, or `None` when the step leaves the first
    /// quadrant. Upper bounds are the tile map's concern.
    #[must_use]
    pub fn offset(self, direction: Direction) -> Option<Location> {
        let (row_delta, column_delta) = direction.delta();
        let row = u32::try_from(i64::from(self.row) + row_delta).ok()?;
        let column = u32::try_from(i64::from(self.column) + column_delta).ok()?;
        Some(Location::new(row, column))
    }

    /// Direction of a straight line toward `other`, if the two share a row
    /// or a column and differ.
    #[must_use]
    pub fn direction_to(self, other: Location) -> Option<Direction> {
        if self == other {
            return None;
        }
        if self.row == other.row {
            Some(if other.column > self.column {
                Direction::Right
            } else {
                Direction::Left
            })
        } else if self.column == other.column {
            Some(if other.row > self.row {
                Direction::Down
            } else {
                Direction::Up
            })
        } else {
            None
        }
    }

    /// Reports whether the two locations are orthogonal neighbours.
    #[must_use]
    pub fn is_adjacent(self, other: Location) -> bool {
        self.manhattan_distance(other) == 1
    }

    /// Human-readable label such as `C4`.
    #[must_use]
    pub fn label(&self) -> String {
        let mut remaining = u64::from(self.row) + 1;
        let mut letters = Vec::new();
        while remaining > 0 {
            let digit = ((remaining - 1) % 26) as u8;
            letters.push(char::from(b'A' + digit));
            remaining = (remaining - 1) / 26;
        }
        let row: String = letters.into_iter().rev().collect();
        format!("{row}{}", u64::from(self.column) + 1)
    }

    /// Parses a label produced by [`Location::label`], ignoring case.
    #[must_use]
    pub fn parse_label(text: &str) -> Option<Location> {
        let text = text.trim();
        let split = text
            .find(|character: char| !character.is_ascii_alphabetic())
            .unwrap_or(text.len());
        let (letters, digits) = text.split_at(split);
        if letters.is_empty() || letters.len() > 6 || digits.is_empty() {
            return None;
        }
        if !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }

        let mut row: u64 = 0;
        for letter in letters.bytes() {
            let value = u64::from(letter.to_ascii_uppercase() - b'A') + 1;
            row = row * 26 + value;
        }
        let column: u64 = digits.parse().ok()?;
        if column == 0 {
            return None;
        }

        let row = u32::try_from(row - 1).ok()?;
        let column = u32::try_from(column - 1).ok()?;
        Some(Location::new(row, column))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Location::parse_label(&text)
            .ok_or_else(|| de::Error::custom(format!("`{text}` is not a valid location label")))
    }
}
