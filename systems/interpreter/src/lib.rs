#![deny(unsafe_code, missing_docs, non_snake_case, unreachable_pub)]

//! Decision interpreter that turns free text into validated action queues.
//!
//! Validation never touches the world: every check runs against a private
//! projection of the tile map that follows the submitted actions in order.
//! Only a fully valid submission produces a [`Command::QueueDecisions`].

use std::collections::BTreeMap;

use maze_party_core::{
    Action, ActionParseError, AgentId, Command, Item, Location, Tile, TileMap, Tuning,
};
use maze_party_world::World;
use thiserror::Error;

/// Reasons a decision string is refused.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ActionError {
    /// The submitting agent is not part of the game.
    #[error("you are not part of this maze")]
    UnknownAgent {
        /// Identifier that was not found.
        agent: AgentId,
    },
    /// A token could not be parsed.
    #[error(transparent)]
    Parse(#[from] ActionParseError),
    /// The submission contained no tokens.
    #[error("tell me what to do, for example `right right up`")]
    Empty,
    /// Stunned agents cannot act.
    #[error("you are stunned and cannot act this turn")]
    Stunned,
    /// Agents in debt cannot act.
    #[error("you cannot act while your points are negative")]
    NegativePoints,
    /// Too many pauses in one submission.
    #[error("you may pause at most {max} times per turn")]
    TooManyPauses {
        /// Largest number of pauses allowed.
        max: usize,
    },
    /// Warps cannot be mixed with other actions.
    #[error("a warp submission may only contain warps")]
    MixedWarp,
    /// Too many warps in one submission.
    #[error("you may warp at most {max} times per turn")]
    TooManyWarps {
        /// Largest number of warps allowed.
        max: usize,
    },
    /// The agent holds too few points to be trusted with a warp.
    #[error("you need at least {needed} points to warp")]
    WarpUnaffordable {
        /// Points required to queue a warp.
        needed: f64,
    },
    /// Finished agents may only place items.
    #[error("you already finished; only trap, obstacle and collectible placements are allowed, not `{action}`")]
    FinishedAgent {
        /// First disallowed action.
        action: Action,
    },
    /// The agent does not hold enough of an item.
    #[error("you need {needed} {item} but hold {held}")]
    MissingItem {
        /// Item required.
        item: Item,
        /// Units the submission uses.
        needed: u32,
        /// Units the agent holds.
        held: u32,
    },
    /// A step would leave the maze.
    #[error("`{action}` from {from} leaves the maze")]
    OffGrid {
        /// Offending step.
        action: Action,
        /// Cell the step starts from.
        from: Location,
    },
    /// A step would walk into a wall or obstacle.
    #[error("`{action}` walks into the wall at {location}")]
    Blocked {
        /// Offending step.
        action: Action,
        /// Cell that cannot be entered.
        location: Location,
    },
    /// No doorway is next to the agent.
    #[error("there is no doorway next to {location} to {action}")]
    NoDoorway {
        /// Offending action.
        action: Action,
        /// Where the agent would be standing.
        location: Location,
    },
    /// The target is not next to the agent.
    #[error("{target} is not next to {location}")]
    NotAdjacent {
        /// Requested target.
        target: Location,
        /// Where the agent would be standing.
        location: Location,
    },
    /// The target is not a doorway.
    #[error("there is no doorway at {target}")]
    NotADoorway {
        /// Requested target.
        target: Location,
    },
    /// The action would leave somebody without a route to the goal.
    #[error("`{action}` would trap someone without a way to the goal")]
    Softlock {
        /// Offending action.
        action: Action,
    },
    /// The charge target is not on a straight line.
    #[error("you can only charge along a row or column, not toward {target}")]
    NotAligned {
        /// Requested target.
        target: Location,
    },
    /// Something blocks the charge.
    #[error("the charge toward {target} is blocked at {location}")]
    ChargeBlocked {
        /// Requested target.
        target: Location,
        /// First blocking cell.
        location: Location,
    },
    /// The target tile cannot take a placement.
    #[error("nothing can be placed at {target}")]
    CannotPlace {
        /// Requested target.
        target: Location,
    },
    /// Somebody stands on the target tile.
    #[error("someone is standing at {target}")]
    Occupied {
        /// Requested target.
        target: Location,
    },
    /// The whole submission costs more than the agent holds.
    #[error("that costs {cost} points but you only have {points}")]
    Unaffordable {
        /// Total projected cost.
        cost: f64,
        /// Points available.
        points: f64,
    },
}

/// Validated decision string ready to be queued.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    /// Parsed actions in execution order.
    pub actions: Vec<Action>,
    /// Cell the agent ends on if nothing interferes.
    pub projected: Location,
    /// Total point cost.
    pub cost: f64,
    /// Non-fatal notes for the player.
    pub warnings: Vec<String>,
}

impl Submission {
    /// Confirmation shown to the player after queueing.
    #[must_use]
    pub fn confirmation(&self) -> String {
        let tokens: Vec<String> = self.actions.iter().map(ToString::to_string).collect();
        let mut text = format!(
            "Queued `{}` for {} points; you should end up at {}.",
            tokens.join(" "),
            self.cost,
            self.projected
        );
        for warning in &self.warnings {
            text.push_str("\nNote: ");
            text.push_str(warning);
        }
        text
    }
}

/// Pure system validating decision strings.
#[derive(Clone, Debug, Default)]
pub struct Interpreter {
    tuning: Tuning,
}

impl Interpreter {
    /// Creates an interpreter using the provided rules.
    #[must_use]
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    /// Validates a decision string without mutating the world.
    pub fn validate(
        &self,
        world: &World,
        agent: AgentId,
        text: &str,
    ) -> Result<Submission, ActionError> {
        let state = world.agent(agent).ok_or(ActionError::UnknownAgent { agent })?;
        let actions = Action::parse_all(text)?;
        if actions.is_empty() {
            return Err(ActionError::Empty);
        }
        if state.is_stunned() {
            return Err(ActionError::Stunned);
        }
        if state.points() < 0.0 {
            return Err(ActionError::NegativePoints);
        }

        let pauses = actions.iter().filter(|action| **action == Action::Pause).count();
        if pauses > self.tuning.max_pauses {
            return Err(ActionError::TooManyPauses {
                max: self.tuning.max_pauses,
            });
        }

        let warps = actions.iter().filter(|action| **action == Action::Warp).count();
        if warps > 0 {
            if warps != actions.len() {
                return Err(ActionError::MixedWarp);
            }
            if warps > self.tuning.max_warps {
                return Err(ActionError::TooManyWarps {
                    max: self.tuning.max_warps,
                });
            }
            let needed = self.tuning.warp_affordability();
            if state.points() < needed {
                return Err(ActionError::WarpUnaffordable { needed });
            }
        }

        if state.is_finished() {
            if let Some(action) = actions.iter().find(|action| !action.is_placement()) {
                return Err(ActionError::FinishedAgent { action: *action });
            }
        }

        let mut needed: BTreeMap<Item, u32> = BTreeMap::new();
        for item in actions.iter().filter_map(|action| action.item()) {
            *needed.entry(item).or_insert(0) += 1;
        }
        for (item, needed) in needed {
            let held = state.item_count(item);
            if needed > held {
                return Err(ActionError::MissingItem { item, needed, held });
            }
        }

        let mut projection = Projection::new(world, agent, state.location());
        for action in &actions {
            projection.apply(&self.tuning, *action)?;
        }

        if projection.cost > state.points() + 1e-9 {
            return Err(ActionError::Unaffordable {
                cost: projection.cost,
                points: state.points(),
            });
        }

        Ok(Submission {
            actions,
            projected: projection.location,
            cost: projection.cost,
            warnings: projection.warnings,
        })
    }

    /// Validates a decision string and emits the command that queues it.
    pub fn handle(
        &self,
        world: &World,
        agent: AgentId,
        text: &str,
        out: &mut Vec<Command>,
    ) -> Result<Submission, ActionError> {
        let submission = self.validate(world, agent, text)?;
        log::debug!(
            "agent {agent} queued {} actions costing {}",
            submission.actions.len(),
            submission.cost
        );
        out.push(Command::QueueDecisions {
            agent,
            actions: submission.actions.clone(),
        });
        Ok(submission)
    }
}

/// Private copy of the terrain that follows a submission step by step.
struct Projection<'w> {
    world: &'w World,
    agent: AgentId,
    map: TileMap,
    costs: BTreeMap<Location, u32>,
    location: Location,
    cost: f64,
    warnings: Vec<String>,
}

impl<'w> Projection<'w> {
    fn new(world: &'w World, agent: AgentId, location: Location) -> Self {
        Self {
            world,
            agent,
            map: world.map().clone(),
            costs: world.doorway_costs().clone(),
            location,
            cost: 0.0,
            warnings: Vec::new(),
        }
    }

    fn apply(&mut self, tuning: &Tuning, action: Action) -> Result<(), ActionError> {
        match action {
            Action::Move(direction) => {
                let next = self.map.step(self.location, direction).ok_or(ActionError::OffGrid {
                    action,
                    from: self.location,
                })?;
                match self.map.tile(next) {
                    Some(Tile::Doorway { locked: true }) => self.warnings.push(format!(
                        "the doorway at {next} must still be unlocked by someone before you can pass"
                    )),
                    Some(tile) if tile.is_walkable() => {}
                    _ => {
                        return Err(ActionError::Blocked {
                            action,
                            location: next,
                        })
                    }
                }
                self.location = next;
                self.cost += tuning.step_cost;
            }
            Action::Pause => self.cost += tuning.pause_cost,
            Action::Punch => self.cost += tuning.punch_cost,
            Action::Warp => self.cost += tuning.warp_cost,
            Action::Star => {}
            Action::Unlock(target) => {
                let doorways = match target {
                    Some(target) => vec![self.targeted_doorway(target)?],
                    None => self.adjacent(action, Some(true))?,
                };
                for doorway in doorways {
                    let cost = self.costs.get(&doorway).copied().unwrap_or(1);
                    self.cost += f64::from(cost);
                    self.open(doorway);
                }
            }
            Action::Key => {
                let doorways = self.map.adjacent_doorways(self.location, Some(true));
                if doorways.is_empty() {
                    self.warnings.push(format!(
                        "there is no locked doorway next to {} for your key",
                        self.location
                    ));
                }
                for doorway in doorways {
                    self.open(doorway);
                }
            }
            Action::Lock(target) => {
                let doorways = match target {
                    Some(target) => vec![self.targeted_doorway(target)?],
                    None => self.adjacent(action, Some(false))?,
                };
                for doorway in &doorways {
                    if self.world.occupant(*doorway, None).is_some() {
                        return Err(ActionError::Occupied { target: *doorway });
                    }
                }
                for doorway in doorways {
                    let _ = self.map.set(doorway, Tile::Doorway { locked: true });
                }
                self.cost += tuning.lock_cost;
            }
            Action::Seal(target) => {
                let doorways = match target {
                    Some(target) => vec![self.targeted_doorway(target)?],
                    None => self.adjacent(action, None)?,
                };
                for doorway in &doorways {
                    if self.world.occupant(*doorway, None).is_some() {
                        return Err(ActionError::Occupied { target: *doorway });
                    }
                    let _ = self.map.set(*doorway, Tile::Wall);
                }
                self.ensure_reachable(action)?;
            }
            Action::Trap(target) | Action::Collectible(target) | Action::Obstacle(target) => {
                self.place(action, target)?;
            }
            Action::Charge(target) => self.charge(target)?,
        }
        Ok(())
    }

    fn adjacent(&self, action: Action, locked: Option<bool>) -> Result<Vec<Location>, ActionError> {
        let doorways = self.map.adjacent_doorways(self.location, locked);
        if doorways.is_empty() {
            return Err(ActionError::NoDoorway {
                action,
                location: self.location,
            });
        }
        Ok(doorways)
    }

    fn targeted_doorway(&self, target: Location) -> Result<Location, ActionError> {
        if !target.is_adjacent(self.location) {
            return Err(ActionError::NotAdjacent {
                target,
                location: self.location,
            });
        }
        if !self.map.tile(target).is_some_and(Tile::is_doorway) {
            return Err(ActionError::NotADoorway { target });
        }
        Ok(target)
    }

    fn open(&mut self, doorway: Location) {
        let _ = self.map.set(doorway, Tile::Doorway { locked: false });
        let cost = self.costs.entry(doorway).or_insert(1);
        *cost = ((*cost + 1) / 2).max(1);
    }

    fn place(&mut self, action: Action, target: Location) -> Result<(), ActionError> {
        let accepts = self.map.tile(target).is_some_and(Tile::accepts_placement);
        if !accepts || target == self.world.goal() {
            return Err(ActionError::CannotPlace { target });
        }
        let tile = match action {
            Action::Obstacle(_) => {
                if target == self.location || self.world.occupant(target, None).is_some() {
                    return Err(ActionError::Occupied { target });
                }
                Tile::Obstacle
            }
            Action::Trap(_) => Tile::HiddenHazard,
            _ => Tile::Collectible,
        };
        let _ = self.map.set(target, tile);
        if tile == Tile::Obstacle {
            self.ensure_reachable(action)?;
        }
        Ok(())
    }

    fn charge(&mut self, target: Location) -> Result<(), ActionError> {
        let direction = self
            .location
            .direction_to(target)
            .ok_or(ActionError::NotAligned { target })?;
        let mut cursor = self.location;
        while cursor != target {
            cursor = self
                .map
                .step(cursor, direction)
                .ok_or(ActionError::NotAligned { target })?;
            if !self.map.is_walkable(cursor) {
                return Err(ActionError::ChargeBlocked {
                    target,
                    location: cursor,
                });
            }
        }
        self.location = target;
        Ok(())
    }

    fn ensure_reachable(&self, action: Action) -> Result<(), ActionError> {
        if self
            .world
            .everyone_reaches_goal_on(&self.map, Some((self.agent, self.location)))
        {
            Ok(())
        } else {
            Err(ActionError::Softlock { action })
        }
    }
}
