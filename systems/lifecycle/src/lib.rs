#![deny(unsafe_code, missing_docs, non_snake_case, unreachable_pub)]

//! Turn lifecycle controller and the playable Maze Party game.
//!
//! [`Lifecycle`] is the pure system that opens and closes turns, manages the
//! roster and hands out prizes. [`MazeGame`] wires it together with the
//! interpreter, the resolution engine and the map generator behind the
//! [`MinigameEngine`](maze_party_core::MinigameEngine) contract.

mod game;
mod persistence;

use maze_party_core::{Action, AgentId, Command, Event, Item, PrizeTier, Tile, Tuning};
use maze_party_system_generation::GenerationError;
use maze_party_system_interpreter::ActionError;
use maze_party_system_resolution::spawn;
use maze_party_world::{self as world, navigation::Planner, query, World};
use rand::{seq::SliceRandom, Rng};
use thiserror::Error;

pub use game::MazeGame;
pub use persistence::PersistenceError;

/// Reasons a claim message is refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ClaimError {
    /// The message did not name an item.
    #[error("tell me which item to claim, for example `claim trap`")]
    MissingItem,
    /// The named item does not exist.
    #[error("there is no item called `{name}`")]
    UnknownItem {
        /// Name that was given.
        name: String,
    },
    /// The agent has nothing to choose from.
    #[error("you have no prize waiting to be claimed")]
    NoOffer,
    /// The item was not part of the offer.
    #[error("{item} was not one of the items offered to you")]
    NotOffered {
        /// Item that was asked for.
        item: Item,
    },
}

/// Errors returned to the host of a game.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GameError {
    /// The agent is not part of this game.
    #[error("{agent} is not part of this maze")]
    UnknownAgent {
        /// Agent that was referenced.
        agent: AgentId,
    },
    /// A decision string was rejected.
    #[error(transparent)]
    Action(#[from] ActionError),
    /// A claim was rejected.
    #[error(transparent)]
    Claim(#[from] ClaimError),
    /// No map could be generated.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// No vacant cell is left for a newcomer.
    #[error("there is no room left in the maze")]
    NoRoom,
    /// A player tried to join without a name.
    #[error("players need a name")]
    EmptyName,
    /// A player with the same name already joined.
    #[error("someone called {name} is already playing")]
    DuplicateName {
        /// Name that is taken.
        name: String,
    },
    /// The variant has no items to hand out.
    #[error("this maze has no prizes to hand out")]
    NoItems,
}

/// Pure system that drives the turn lifecycle.
#[derive(Clone, Debug, Default)]
pub struct Lifecycle {
    tuning: Tuning,
}

impl Lifecycle {
    /// Creates a lifecycle controller using the provided rules.
    #[must_use]
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    /// Adds a player next to the stragglers, or on the spawn edge.
    pub fn add_player<R>(
        &self,
        world: &mut World,
        name: &str,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) -> Result<AgentId, GameError>
    where
        R: Rng + ?Sized,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::EmptyName);
        }
        if query::agent_named(world, name).is_some() {
            return Err(GameError::DuplicateName {
                name: name.to_owned(),
            });
        }
        let location = spawn::for_newcomer(world, rng).ok_or(GameError::NoRoom)?;

        let start = out.len();
        world::apply(
            world,
            Command::AddAgent {
                name: name.to_owned(),
                location,
            },
            out,
        );
        let agent = out[start..]
            .iter()
            .find_map(|event| match event {
                Event::AgentJoined { agent, .. } => Some(*agent),
                _ => None,
            })
            .ok_or(GameError::NoRoom)?;
        world.refresh_ranks();
        log::info!("{name} joined as {agent} at {location}");
        Ok(agent)
    }

    /// Removes a player together with their queue and hazard ownership.
    pub fn remove_player(
        &self,
        world: &mut World,
        agent: AgentId,
        out: &mut Vec<Event>,
    ) -> Result<(), GameError> {
        if world.agent(agent).is_none() {
            return Err(GameError::UnknownAgent { agent });
        }
        world::apply(world, Command::RemoveAgent { agent }, out);
        log::info!("{agent} left the maze");
        Ok(())
    }

    /// Opens a new turn.
    ///
    /// Applies the home-stretch multipliers, spawns the per-turn hazards and
    /// collectibles and gives every agent without a submission a decision
    /// queue of its own. Agents that cannot pay for a step are knocked out
    /// until the turn ends instead.
    pub fn begin_turn<R>(&self, world: &mut World, rng: &mut R, out: &mut Vec<Event>)
    where
        R: Rng + ?Sized,
    {
        let start = out.len();
        world::apply(world, Command::BeginTurn, out);
        world.refresh_ranks();

        self.apply_home_stretch(world, out);
        self.spawn_turn_pickups(world, rng, out);
        self.queue_defaults(world, out);

        world.record_events(&out[start..]);
        log::info!(
            "turn {} opened with {} agents",
            world.turn(),
            world.agent_count()
        );
    }

    fn apply_home_stretch(&self, world: &mut World, out: &mut Vec<Event>) {
        if world.finishers().is_empty() {
            return;
        }
        let median = (world.agent_count() + 1) / 2;
        let changes: Vec<(AgentId, Option<f64>)> = world
            .agents()
            .filter_map(|agent| {
                let lagging = !agent.is_finished()
                    && agent.rank() > median
                    && agent.points() <= self.tuning.home_stretch_max_points;
                let wanted = lagging.then_some(self.tuning.home_stretch_multiplier);
                (agent.multiplier() != wanted).then_some((agent.id(), wanted))
            })
            .collect();
        for (agent, multiplier) in changes {
            world::apply(world, Command::SetMultiplier { agent, multiplier }, out);
        }
    }

    fn spawn_turn_pickups<R>(&self, world: &mut World, rng: &mut R, out: &mut Vec<Event>)
    where
        R: Rng + ?Sized,
    {
        for _ in 0..self.tuning.hazards_per_turn {
            let Some(location) = spawn::anywhere(world, rng) else {
                break;
            };
            world::apply(
                world,
                Command::PlaceHazard {
                    location,
                    owner: None,
                },
                out,
            );
        }
        for _ in 0..self.tuning.collectibles_per_turn {
            let Some(location) = spawn::anywhere(world, rng) else {
                break;
            };
            world::apply(world, Command::PlaceCollectible { location }, out);
        }
    }

    fn queue_defaults(&self, world: &mut World, out: &mut Vec<Event>) {
        for id in world.agent_ids() {
            let Some(agent) = world.agent(id) else {
                continue;
            };
            if world.decisions(id).is_some() || agent.is_finished() {
                continue;
            }

            let actions = if agent.is_stunned() {
                Vec::new()
            } else if agent.points() < 1.0 {
                // Broke agents sit the whole turn out without a queue.
                if let Some(agent) = world.agent_mut(id) {
                    agent.knock_out_for_turn();
                }
                out.push(Event::StunnedForTurn { agent: id });
                continue;
            } else {
                self.default_decisions(world, id)
            };
            world::apply(world, Command::QueueDecisions { agent: id, actions }, out);
        }
    }

    /// Queue an agent follows when it submitted nothing.
    ///
    /// The agent walks its cheapest route toward the goal, steering around
    /// other agents, unlocking locked doorways on the way and spending at
    /// most its whole points. The queue never ends on a revealed hazard.
    #[must_use]
    pub fn default_decisions(&self, world: &World, id: AgentId) -> Vec<Action> {
        let Some(agent) = world.agent(id) else {
            return Vec::new();
        };
        let budget = agent.points().max(0.0).floor();
        let planner = Planner::new(world.map(), world.doorway_costs())
            .avoiding(world.occupied_cells(Some(id)), self.tuning.occupied_surcharge);
        let Some(route) = planner.route(agent.location(), world.goal()) else {
            return Vec::new();
        };

        let mut planned: Vec<(Action, Tile)> = Vec::new();
        let mut spent = 0.0;
        for (cell, direction) in route.cells.iter().zip(&route.directions) {
            let tile = world.map().tile(*cell).unwrap_or(Tile::Wall);
            let locked = tile == Tile::Doorway { locked: true };
            let mut cost = self.tuning.step_cost;
            if locked {
                cost += f64::from(world.doorway_cost(*cell).unwrap_or(1));
            }
            if spent + cost > budget + 1e-9 {
                break;
            }
            if locked {
                planned.push((Action::Unlock(Some(*cell)), tile));
            }
            planned.push((Action::Move(*direction), tile));
            spent += cost;
        }

        while let Some((action, tile)) = planned.last() {
            if matches!(action, Action::Unlock(_)) || *tile == Tile::RevealedHazard {
                let _ = planned.pop();
            } else {
                break;
            }
        }
        planned.into_iter().map(|(action, _)| action).collect()
    }

    /// Closes the current turn and returns its condensed narration.
    pub fn end_turn(&self, world: &mut World, out: &mut Vec<Event>) -> Vec<String> {
        let start = out.len();
        world::apply(world, Command::ClearOffers, out);
        for id in world.agent_ids() {
            if world.agent_mut(id).is_some_and(|agent| agent.wake_up()) {
                out.push(Event::RegainedConsciousness { agent: id });
            }
        }
        for id in world.decision_holders() {
            let count = world.clear_decisions(id);
            let _ = world.remove_decisions(id);
            if count > 0 {
                log::warn!("discarding {count} leftover decisions of {id}");
                out.push(Event::DecisionsDiscarded { agent: id, count });
            }
        }
        world.refresh_ranks();
        world.record_events(&out[start..]);

        log::info!("turn {} closed", world.turn());
        let snapshot: &World = world;
        summarize(snapshot.turn_log(), &|id| query::name_of(snapshot, id))
    }

    /// Hands a prize to an agent and returns the announcement.
    ///
    /// Major prizes offer a choice of items that the agent claims later;
    /// minor prizes grant one random item straight away.
    pub fn award_prize<R>(
        &self,
        world: &mut World,
        agent: AgentId,
        tier: PrizeTier,
        intro: &str,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) -> Result<String, GameError>
    where
        R: Rng + ?Sized,
    {
        let name = world
            .agent(agent)
            .ok_or(GameError::UnknownAgent { agent })?
            .name()
            .to_owned();
        let pool = self.tuning.variant.item_pool();
        let lead = match intro.trim() {
            "" => String::new(),
            text => format!("{text} "),
        };

        match tier {
            PrizeTier::Major => {
                let items: Vec<Item> = pool
                    .choose_multiple(rng, self.tuning.offer_size.max(1))
                    .copied()
                    .collect();
                if items.is_empty() {
                    return Err(GameError::NoItems);
                }
                let listing: Vec<&str> = items.iter().map(|item| item.name()).collect();
                let listing = listing.join(", ");
                world::apply(world, Command::OfferItems { agent, items }, out);
                Ok(format!(
                    "{lead}{name} may choose one of: {listing}. Reply with `claim <item>`."
                ))
            }
            PrizeTier::Minor => {
                let item = pool.choose(rng).copied().ok_or(GameError::NoItems)?;
                world::apply(world, Command::GrantItem { agent, item }, out);
                Ok(format!("{lead}{name} receives a {item}."))
            }
        }
    }

    /// Handles a `claim <item>` message.
    pub fn claim(
        &self,
        world: &mut World,
        agent: AgentId,
        text: &str,
        out: &mut Vec<Event>,
    ) -> Result<String, GameError> {
        let state = world.agent(agent).ok_or(GameError::UnknownAgent { agent })?;
        let mut words = text.split_whitespace();
        let _ = words.next();
        let requested = words.next().ok_or(ClaimError::MissingItem)?;
        let item = Item::from_name(requested).ok_or_else(|| ClaimError::UnknownItem {
            name: requested.to_owned(),
        })?;
        if state.offer().is_empty() {
            return Err(ClaimError::NoOffer.into());
        }
        if !state.offer().contains(&item) {
            return Err(ClaimError::NotOffered { item }.into());
        }
        let name = state.name().to_owned();

        world::apply(world, Command::ClaimItem { agent, item }, out);
        Ok(format!("{name} claimed a {item}."))
    }
}

/// Condenses a turn's events into narration.
///
/// Runs of plain steps by the same agent collapse into a single line and
/// bookkeeping events are left out.
#[must_use]
pub fn summarize(events: &[Event], names: &dyn Fn(AgentId) -> String) -> Vec<String> {
    let mut statements = Vec::new();
    let mut streak: Option<(AgentId, usize)> = None;
    for event in events.iter().filter(|event| !event.is_quiet()) {
        if let Event::Stepped { agent, .. } = event {
            if let Some((walker, count)) = streak.as_mut() {
                if *walker == *agent {
                    *count += 1;
                    continue;
                }
            }
            flush_steps(&mut streak, &mut statements, names);
            streak = Some((*agent, 1));
            continue;
        }
        flush_steps(&mut streak, &mut statements, names);
        statements.push(event.describe(names));
    }
    flush_steps(&mut streak, &mut statements, names);
    statements
}

fn flush_steps(
    streak: &mut Option<(AgentId, usize)>,
    statements: &mut Vec<String>,
    names: &dyn Fn(AgentId) -> String,
) {
    if let Some((agent, count)) = streak.take() {
        statements.push(if count == 1 {
            format!("{} took a step.", names(agent))
        } else {
            format!("{} took {count} steps.", names(agent))
        });
    }
}
