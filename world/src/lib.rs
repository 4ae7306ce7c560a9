#![deny(unsafe_code, missing_docs, non_snake_case, unreachable_pub)]

//! Authoritative world state management for Maze Party.
//!
//! The world owns the tile map, doorway costs, hazard ownership, the agent
//! registry and every agent's decision queue. Adapters and systems mutate it
//! through [`apply`] for coarse commands and through the narrow turn
//! primitives on [`World`] while a turn resolves.

mod agents;
pub mod navigation;

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use maze_party_core::{Action, AgentId, Command, Event, Location, Tile, TileMap};
use serde::{Deserialize, Serialize};

pub use agents::AgentState;
use agents::Roster;
use navigation::{DoorwayPolicy, Planner};

/// Visual flavour of a trail segment recorded during a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    /// Ordinary walking.
    Walk,
    /// Pushed by another agent.
    Shove,
    /// Teleported.
    Warp,
    /// Charged in a straight line.
    Charge,
    /// Sent back by a hazard.
    Revert,
}

/// Trail segment left by an agent during the current turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderLine {
    /// Agent that moved.
    pub agent: AgentId,
    /// Start of the segment.
    pub from: Location,
    /// End of the segment.
    pub to: Location,
    /// How the movement happened.
    pub style: LineStyle,
}

/// Represents the authoritative Maze Party world state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    map: TileMap,
    goal: Location,
    doorway_costs: BTreeMap<Location, u32>,
    hazard_owners: BTreeMap<Location, AgentId>,
    agents: Roster,
    decisions: BTreeMap<AgentId, VecDeque<Action>>,
    finishers: Vec<AgentId>,
    turn: u32,
    tick: u32,
    render_lines: Vec<RenderLine>,
    bumps: BTreeSet<(AgentId, AgentId)>,
    turn_log: Vec<Event>,
}

impl World {
    /// Creates an empty world with no terrain and no agents.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tile map of the maze.
    #[must_use]
    pub fn map(&self) -> &TileMap {
        &self.map
    }

    /// Cell every agent is racing toward.
    #[must_use]
    pub const fn goal(&self) -> Location {
        self.goal
    }

    /// Doorway costs keyed by doorway location.
    #[must_use]
    pub fn doorway_costs(&self) -> &BTreeMap<Location, u32> {
        &self.doorway_costs
    }

    /// Current cost of the doorway at the location, if one is recorded.
    #[must_use]
    pub fn doorway_cost(&self, location: Location) -> Option<u32> {
        self.doorway_costs.get(&location).copied()
    }

    /// Owner of the hazard at the location, if any.
    #[must_use]
    pub fn hazard_owner(&self, location: Location) -> Option<AgentId> {
        self.hazard_owners.get(&location).copied()
    }

    /// One-based counter of the current turn.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Ticks processed during the current turn.
    #[must_use]
    pub const fn tick(&self) -> u32 {
        self.tick
    }

    /// Looks up an agent.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&AgentState> {
        self.agents.get(id)
    }

    /// Looks up an agent for mutation.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut AgentState> {
        self.agents.get_mut(id)
    }

    /// Every agent in identifier order.
    pub fn agents(&self) -> impl Iterator<Item = &AgentState> {
        self.agents.iter()
    }

    /// Identifiers of every agent in order.
    #[must_use]
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(AgentState::id).collect()
    }

    /// Number of registered agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Unfinished agent standing on the location, ignoring `excluding`.
    #[must_use]
    pub fn occupant(&self, location: Location, excluding: Option<AgentId>) -> Option<AgentId> {
        self.agents
            .iter()
            .filter(|agent| Some(agent.id()) != excluding && !agent.is_finished())
            .find(|agent| agent.location() == location)
            .map(AgentState::id)
    }

    /// Cells occupied by unfinished agents other than `excluding`.
    #[must_use]
    pub fn occupied_cells(&self, excluding: Option<AgentId>) -> BTreeSet<Location> {
        self.agents
            .iter()
            .filter(|agent| Some(agent.id()) != excluding && !agent.is_finished())
            .map(AgentState::location)
            .collect()
    }

    /// Overwrites a tile, dropping hazard ownership when the tile stops
    /// being a hazard.
    pub fn set_tile(&mut self, location: Location, tile: Tile) -> bool {
        if !self.map.set(location, tile) {
            return false;
        }
        if !tile.is_hazard() {
            let _ = self.hazard_owners.remove(&location);
        }
        if !tile.is_doorway() {
            let _ = self.doorway_costs.remove(&location);
        }
        true
    }

    /// Records (or clears) the owner of a hazard tile.
    pub fn set_hazard_owner(&mut self, location: Location, owner: Option<AgentId>) {
        match owner {
            Some(owner) => {
                let _ = self.hazard_owners.insert(location, owner);
            }
            None => {
                let _ = self.hazard_owners.remove(&location);
            }
        }
    }

    /// Halves the stored cost of a doorway, rounding up and never dropping
    /// below one. Returns the new cost.
    pub fn halve_doorway_cost(&mut self, location: Location) -> u32 {
        let cost = self.doorway_costs.entry(location).or_insert(1);
        *cost = ((*cost + 1) / 2).max(1);
        *cost
    }

    /// Next queued action of an agent without consuming it.
    #[must_use]
    pub fn next_decision(&self, id: AgentId) -> Option<Action> {
        self.decisions.get(&id).and_then(|queue| queue.front().copied())
    }

    /// Consumes the next queued action of an agent.
    pub fn pop_decision(&mut self, id: AgentId) -> Option<Action> {
        self.decisions.get_mut(&id).and_then(VecDeque::pop_front)
    }

    /// Queued actions of an agent, if it holds a decision entry.
    #[must_use]
    pub fn decisions(&self, id: AgentId) -> Option<&VecDeque<Action>> {
        self.decisions.get(&id)
    }

    /// Empties an agent's queue while keeping its entry. Returns the number
    /// of actions dropped.
    pub fn clear_decisions(&mut self, id: AgentId) -> usize {
        self.decisions.get_mut(&id).map_or(0, |queue| {
            let dropped = queue.len();
            queue.clear();
            dropped
        })
    }

    /// Removes an agent's decision entry entirely.
    pub fn remove_decisions(&mut self, id: AgentId) -> Option<VecDeque<Action>> {
        self.decisions.remove(&id)
    }

    /// Agents holding a decision entry, in identifier order.
    #[must_use]
    pub fn decision_holders(&self) -> Vec<AgentId> {
        self.decisions.keys().copied().collect()
    }

    /// Reports whether the agent still has queued actions.
    #[must_use]
    pub fn has_pending(&self, id: AgentId) -> bool {
        self.decisions.get(&id).is_some_and(|queue| !queue.is_empty())
    }

    /// Records that `mover` tried to walk into `occupant` and reports whether
    /// the occupant had already tried to walk into the mover.
    pub fn record_bump(&mut self, mover: AgentId, occupant: AgentId) -> bool {
        let _ = self.bumps.insert((mover, occupant));
        self.bumps.contains(&(occupant, mover))
    }

    /// Marks an agent as finished and returns its one-based place.
    pub fn finish(&mut self, id: AgentId) -> usize {
        if let Some(place) = self.finishers.iter().position(|finisher| *finisher == id) {
            return place + 1;
        }
        self.finishers.push(id);
        let place = self.finishers.len();
        if let Some(agent) = self.agents.get_mut(id) {
            agent.mark_finished();
            agent.set_rank(place);
        }
        place
    }

    /// Agents that reached the goal, in finishing order.
    #[must_use]
    pub fn finishers(&self) -> &[AgentId] {
        &self.finishers
    }

    /// Appends a trail segment to the current turn's render log.
    pub fn push_render_line(&mut self, line: RenderLine) {
        self.render_lines.push(line);
    }

    /// Trail segments recorded this turn.
    #[must_use]
    pub fn render_lines(&self) -> &[RenderLine] {
        &self.render_lines
    }

    /// Advances the tick counter.
    pub fn advance_tick(&mut self) -> u32 {
        self.tick = self.tick.saturating_add(1);
        self.tick
    }

    /// Appends events to the current turn's log.
    pub fn record_events(&mut self, events: &[Event]) {
        self.turn_log.extend_from_slice(events);
    }

    /// Events recorded during the current turn.
    #[must_use]
    pub fn turn_log(&self) -> &[Event] {
        &self.turn_log
    }

    /// Vacant empty cells in the 3x3 block around the location.
    ///
    /// A cell is vacant when it is empty floor, not the goal and not
    /// occupied by an unfinished agent.
    #[must_use]
    pub fn vacant_near(&self, location: Location) -> Vec<Location> {
        self.map
            .surrounding(location)
            .into_iter()
            .filter(|cell| self.is_vacant(*cell))
            .collect()
    }

    /// Reports whether the cell is empty floor nobody stands on.
    #[must_use]
    pub fn is_vacant(&self, location: Location) -> bool {
        location != self.goal
            && self.map.tile(location) == Some(Tile::Empty)
            && self.occupant(location, None).is_none()
    }

    /// Vacant cells on the outer ring of the walkable area.
    #[must_use]
    pub fn spawn_edge(&self) -> Vec<Location> {
        let walkable: Vec<Location> = self
            .map
            .locations()
            .filter(|cell| self.map.is_walkable(*cell))
            .collect();
        let Some(top) = walkable.iter().map(Location::row).min() else {
            return Vec::new();
        };
        let bottom = walkable.iter().map(Location::row).max().unwrap_or(top);
        let left = walkable.iter().map(Location::column).min().unwrap_or(0);
        let right = walkable.iter().map(Location::column).max().unwrap_or(left);

        walkable
            .into_iter()
            .filter(|cell| {
                cell.row() == top
                    || cell.row() == bottom
                    || cell.column() == left
                    || cell.column() == right
            })
            .filter(|cell| self.is_vacant(*cell))
            .collect()
    }

    /// Route cost from the location to the goal under the weighted doorway
    /// model.
    #[must_use]
    pub fn cost_to_goal(&self, from: Location) -> Option<u32> {
        Planner::new(&self.map, &self.doorway_costs).distance(from, self.goal)
    }

    /// Reports whether every unfinished agent could still reach the goal on
    /// the provided map, optionally treating one agent as standing elsewhere.
    #[must_use]
    pub fn everyone_reaches_goal_on(
        &self,
        map: &TileMap,
        relocated: Option<(AgentId, Location)>,
    ) -> bool {
        let planner =
            Planner::new(map, &self.doorway_costs).with_doorways(DoorwayPolicy::Weighted);
        self.agents
            .iter()
            .filter(|agent| !agent.is_finished())
            .all(|agent| {
                let start = match relocated {
                    Some((id, location)) if id == agent.id() => location,
                    _ => agent.location(),
                };
                planner.distance(start, self.goal).is_some()
            })
    }

    /// Recomputes every agent's rank.
    ///
    /// Finished agents rank by finishing order. Unfinished agents follow,
    /// ordered by ascending cost to the goal and then descending points.
    pub fn refresh_ranks(&mut self) {
        let finished = self.finishers.len();
        let mut standings: Vec<(Option<u32>, f64, AgentId)> = self
            .agents
            .iter()
            .filter(|agent| !agent.is_finished())
            .map(|agent| (self.cost_to_goal(agent.location()), agent.points(), agent.id()))
            .collect();
        standings.sort_by(|left, right| {
            let left_cost = left.0.unwrap_or(u32::MAX);
            let right_cost = right.0.unwrap_or(u32::MAX);
            left_cost
                .cmp(&right_cost)
                .then_with(|| right.1.total_cmp(&left.1))
                .then_with(|| left.2.cmp(&right.2))
        });

        for (place, id) in self.finishers.clone().into_iter().enumerate() {
            if let Some(agent) = self.agents.get_mut(id) {
                agent.set_rank(place + 1);
            }
        }
        for (offset, (_, _, id)) in standings.into_iter().enumerate() {
            if let Some(agent) = self.agents.get_mut(id) {
                agent.set_rank(finished + offset + 1);
            }
        }
    }

    /// Repairs bookkeeping that no longer matches the world and returns the
    /// number of repairs made.
    pub fn audit(&mut self) -> usize {
        let mut repairs = 0;

        let orphaned: Vec<AgentId> = self
            .decisions
            .keys()
            .copied()
            .filter(|id| !self.agents.contains(*id))
            .collect();
        for id in orphaned {
            log::warn!("dropping decision entry of unknown agent {id}");
            let _ = self.decisions.remove(&id);
            repairs += 1;
        }

        let stale: Vec<Location> = self
            .hazard_owners
            .iter()
            .filter(|(location, owner)| {
                !self.map.tile(**location).is_some_and(Tile::is_hazard)
                    || !self.agents.contains(**owner)
            })
            .map(|(location, _)| *location)
            .collect();
        for location in stale {
            log::warn!("dropping stale hazard ownership at {location}");
            let _ = self.hazard_owners.remove(&location);
            repairs += 1;
        }

        let before = self.finishers.len();
        let agents = &self.agents;
        self.finishers.retain(|id| agents.contains(*id));
        repairs += before - self.finishers.len();

        repairs
    }
}

/// Executes the provided command against the world.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureMap {
            map,
            goal,
            doorway_costs,
        } => {
            world.map = map;
            world.goal = goal;
            world.doorway_costs = doorway_costs;
            world.hazard_owners.clear();
            world.render_lines.clear();
        }
        Command::AddAgent { name, location } => {
            let agent = world.agents.insert(name, location);
            out_events.push(Event::AgentJoined { agent, location });
        }
        Command::RemoveAgent { agent } => {
            if world.agents.remove(agent).is_none() {
                return;
            }
            let _ = world.decisions.remove(&agent);
            world.hazard_owners.retain(|_, owner| *owner != agent);
            world.finishers.retain(|finisher| *finisher != agent);
            world
                .bumps
                .retain(|(mover, occupant)| *mover != agent && *occupant != agent);
            world.refresh_ranks();
            out_events.push(Event::AgentRemoved { agent });
        }
        Command::AwardPoints { agent, amount } => {
            if let Some(state) = world.agents.get_mut(agent) {
                let applied = state.add_points(amount);
                if applied != 0.0 {
                    out_events.push(Event::PointsAwarded {
                        agent,
                        amount: applied,
                    });
                }
            }
        }
        Command::SetMultiplier { agent, multiplier } => {
            if let Some(state) = world.agents.get_mut(agent) {
                state.set_multiplier(multiplier);
                if let Some(multiplier) = state.multiplier() {
                    out_events.push(Event::HomeStretchBonus { agent, multiplier });
                }
            }
        }
        Command::GrantItem { agent, item } => {
            if let Some(state) = world.agents.get_mut(agent) {
                state.grant(item);
                out_events.push(Event::ItemGranted { agent, item });
            }
        }
        Command::OfferItems { agent, items } => {
            if let Some(state) = world.agents.get_mut(agent) {
                state.set_offer(items.clone());
                out_events.push(Event::ItemsOffered { agent, items });
            }
        }
        Command::ClaimItem { agent, item } => {
            if let Some(state) = world.agents.get_mut(agent) {
                if state.offer().contains(&item) {
                    state.set_offer(Vec::new());
                    state.grant(item);
                    out_events.push(Event::ItemClaimed { agent, item });
                }
            }
        }
        Command::ClearOffers => {
            for agent in world.agents.iter_mut() {
                agent.set_offer(Vec::new());
            }
        }
        Command::BeginTurn => {
            world.turn = world.turn.saturating_add(1);
            world.tick = 0;
            world.render_lines.clear();
            world.bumps.clear();
            world.turn_log.clear();
            for agent in world.agents.iter_mut() {
                agent.begin_turn();
            }
            out_events.push(Event::TurnBegan { turn: world.turn });
        }
        Command::QueueDecisions { agent, actions } => {
            if !world.agents.contains(agent) {
                return;
            }
            let count = actions.len();
            let _ = world.decisions.insert(agent, actions.into());
            out_events.push(Event::DecisionsQueued { agent, count });
        }
        Command::PlaceHazard { location, owner } => {
            if world.map.tile(location) == Some(Tile::Empty) && location != world.goal {
                let _ = world.set_tile(location, Tile::HiddenHazard);
                world.set_hazard_owner(location, owner);
                out_events.push(Event::HazardSpawned { location });
            }
        }
        Command::PlaceCollectible { location } => {
            if world.map.tile(location) == Some(Tile::Empty) && location != world.goal {
                let _ = world.set_tile(location, Tile::Collectible);
                out_events.push(Event::CollectibleSpawned { location });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use maze_party_core::{Action, AgentId, Location, Tile, TileMap};

    use super::{AgentState, RenderLine, World};

    /// Provides read-only access to the world's tile map.
    #[must_use]
    pub fn map(world: &World) -> &TileMap {
        world.map()
    }

    /// Tile at the location, if it lies inside the map.
    #[must_use]
    pub fn tile(world: &World, location: Location) -> Option<Tile> {
        world.map().tile(location)
    }

    /// Cell every agent is racing toward.
    #[must_use]
    pub fn goal(world: &World) -> Location {
        world.goal()
    }

    /// Looks up a single agent.
    #[must_use]
    pub fn agent(world: &World, id: AgentId) -> Option<&AgentState> {
        world.agent(id)
    }

    /// Finds an agent by display name, ignoring case.
    #[must_use]
    pub fn agent_named<'a>(world: &'a World, name: &str) -> Option<&'a AgentState> {
        world
            .agents()
            .find(|agent| agent.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Every agent sorted by rank, then identifier.
    #[must_use]
    pub fn standings(world: &World) -> Vec<&AgentState> {
        let mut agents: Vec<&AgentState> = world.agents().collect();
        agents.sort_by_key(|agent| (agent.rank(), agent.id()));
        agents
    }

    /// Display name of an agent, or its identifier when unknown.
    #[must_use]
    pub fn name_of(world: &World, id: AgentId) -> String {
        world
            .agent(id)
            .map_or_else(|| id.to_string(), |agent| agent.name().to_owned())
    }

    /// Pending actions of an agent in execution order.
    #[must_use]
    pub fn pending_decisions(world: &World, id: AgentId) -> Vec<Action> {
        world
            .decisions(id)
            .map(|queue| queue.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Trail segments recorded during the current turn.
    #[must_use]
    pub fn render_lines(world: &World) -> &[RenderLine] {
        world.render_lines()
    }

    /// Current cost of the doorway at the location.
    #[must_use]
    pub fn doorway_cost(world: &World, location: Location) -> Option<u32> {
        world.doorway_cost(location)
    }

    /// Owner of the hazard at the location.
    #[must_use]
    pub fn hazard_owner(world: &World, location: Location) -> Option<AgentId> {
        world.hazard_owner(location)
    }

    /// Reports whether any agent still has queued actions.
    #[must_use]
    pub fn any_pending(world: &World) -> bool {
        world
            .decision_holders()
            .into_iter()
            .any(|id| world.has_pending(id))
    }
}
