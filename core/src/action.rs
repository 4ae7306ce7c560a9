use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Direction, Item, Location};

/// One decision token an agent can queue for the next turn.
///
/// Actions are written as whitespace or comma separated tokens. Targeted
/// actions take a location after a colon, for example `trap:C4`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Action {
    /// Step one cell in the given direction.
    Move(Direction),
    /// Spend a tick standing still.
    Pause,
    /// Unlock a doorway, either the one targeted or an adjacent locked one.
    Unlock(Option<Location>),
    /// Lock an adjacent (or targeted) unlocked doorway.
    Lock(Option<Location>),
    /// Seal an adjacent (or targeted) doorway into a wall.
    Seal(Option<Location>),
    /// Punch an agent standing in the same cell or an adjacent one.
    Punch,
    /// Teleport next to another agent, or onto the spawn edge.
    Warp,
    /// Place a hidden hazard at the location.
    Trap(Location),
    /// Place an obstacle at the location.
    Obstacle(Location),
    /// Place a collectible at the location.
    Collectible(Location),
    /// Charge in a straight line toward the location.
    Charge(Location),
    /// Become invincible for the rest of the turn.
    Star,
    /// Unlock an adjacent doorway for free.
    Key,
}

/// Errors raised while parsing decision tokens.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActionParseError {
    /// The token does not name an action.
    #[error("`{token}` is not a recognised action")]
    UnknownAction {
        /// Offending token.
        token: String,
    },
    /// A placement or charge was written without a target.
    #[error("`{token}` needs a target location such as `{token}:B12`")]
    MissingTarget {
        /// Offending token.
        token: String,
    },
    /// The target after the colon is not a location label.
    #[error("`{location}` in `{token}` is not a valid location")]
    InvalidLocation {
        /// Offending token.
        token: String,
        /// Text that failed to parse as a location.
        location: String,
    },
    /// A target was attached to an action that does not take one.
    #[error("`{token}` does not take a target")]
    UnexpectedTarget {
        /// Offending token.
        token: String,
    },
}

impl Action {
    /// Parses a single decision token.
    pub fn parse(token: &str) -> Result<Self, ActionParseError> {
        let lowered = token.trim().to_ascii_lowercase();
        let (verb, target) = match lowered.split_once(':') {
            Some((verb, target)) => (verb, Some(target)),
            None => (lowered.as_str(), None),
        };

        if let Some(direction) = Direction::from_token(verb) {
            reject_target(verb, target)?;
            return Ok(Action::Move(direction));
        }

        let action = match verb {
            "pause" | "wait" => {
                reject_target(verb, target)?;
                Action::Pause
            }
            "unlock" => Action::Unlock(parse_target(verb, target)?),
            "lock" => Action::Lock(parse_target(verb, target)?),
            "seal" => Action::Seal(parse_target(verb, target)?),
            "punch" => {
                reject_target(verb, target)?;
                Action::Punch
            }
            "warp" => {
                reject_target(verb, target)?;
                Action::Warp
            }
            "star" => {
                reject_target(verb, target)?;
                Action::Star
            }
            "key" => {
                reject_target(verb, target)?;
                Action::Key
            }
            "trap" => Action::Trap(require_target(verb, target)?),
            "obstacle" => Action::Obstacle(require_target(verb, target)?),
            "collectible" => Action::Collectible(require_target(verb, target)?),
            "charge" => Action::Charge(require_target(verb, target)?),
            _ => {
                return Err(ActionParseError::UnknownAction {
                    token: token.trim().to_owned(),
                })
            }
        };
        Ok(action)
    }

    /// Parses a full decision string into its ordered tokens.
    pub fn parse_all(text: &str) -> Result<Vec<Self>, ActionParseError> {
        text.split(|character: char| character.is_whitespace() || character == ',')
            .filter(|token| !token.is_empty())
            .map(Action::parse)
            .collect()
    }

    /// Inventory item consumed by the action, if any.
    #[must_use]
    pub const fn item(self) -> Option<Item> {
        match self {
            Action::Trap(_) => Some(Item::Trap),
            Action::Obstacle(_) => Some(Item::Obstacle),
            Action::Collectible(_) => Some(Item::Collectible),
            Action::Charge(_) => Some(Item::Charge),
            Action::Star => Some(Item::Star),
            Action::Key => Some(Item::Key),
            Action::Seal(_) => Some(Item::Seal),
            Action::Move(_)
            | Action::Pause
            | Action::Unlock(_)
            | Action::Lock(_)
            | Action::Punch
            | Action::Warp => None,
        }
    }

    /// Reports whether the action drops an item onto a tile.
    #[must_use]
    pub const fn is_placement(self) -> bool {
        matches!(
            self,
            Action::Trap(_) | Action::Obstacle(_) | Action::Collectible(_)
        )
    }

    /// Target cell for placements, reporting `None` for other actions.
    #[must_use]
    pub const fn placement_target(self) -> Option<Location> {
        match self {
            Action::Trap(target) | Action::Obstacle(target) | Action::Collectible(target) => {
                Some(target)
            }
            _ => None,
        }
    }
}

fn parse_target(verb: &str, target: Option<&str>) -> Result<Option<Location>, ActionParseError> {
    match target {
        None => Ok(None),
        Some(text) => Location::parse_label(text)
            .map(Some)
            .ok_or_else(|| ActionParseError::InvalidLocation {
                token: verb.to_owned(),
                location: text.to_owned(),
            }),
    }
}

fn require_target(verb: &str, target: Option<&str>) -> Result<Location, ActionParseError> {
    parse_target(verb, target)?.ok_or_else(|| ActionParseError::MissingTarget {
        token: verb.to_owned(),
    })
}

fn reject_target(verb: &str, target: Option<&str>) -> Result<(), ActionParseError> {
    match target {
        Some(_) => Err(ActionParseError::UnexpectedTarget {
            token: verb.to_owned(),
        }),
        None => Ok(()),
    }
}

fn write_targeted(
    f: &mut fmt::Formatter<'_>,
    verb: &str,
    target: Option<Location>,
) -> fmt::Result {
    match target {
        Some(location) => write!(f, "{verb}:{location}"),
        None => f.write_str(verb),
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Action::Move(direction) => write!(f, "{direction}"),
            Action::Pause => f.write_str("pause"),
            Action::Unlock(target) => write_targeted(f, "unlock", target),
            Action::Lock(target) => write_targeted(f, "lock", target),
            Action::Seal(target) => write_targeted(f, "seal", target),
            Action::Punch => f.write_str("punch"),
            Action::Warp => f.write_str("warp"),
            Action::Trap(target) => write_targeted(f, "trap", Some(target)),
            Action::Obstacle(target) => write_targeted(f, "obstacle", Some(target)),
            Action::Collectible(target) => write_targeted(f, "collectible", Some(target)),
            Action::Charge(target) => write_targeted(f, "charge", Some(target)),
            Action::Star => f.write_str("star"),
            Action::Key => f.write_str("key"),
        }
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.to_string()
    }
}

impl TryFrom<String> for Action {
    type Error = ActionParseError;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        Action::parse(&token)
    }
}
