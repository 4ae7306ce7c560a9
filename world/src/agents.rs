//! Agent registry owned by the world.

use std::collections::BTreeMap;

use maze_party_core::{AgentId, Item, Location};
use serde::{Deserialize, Serialize};

/// Rounds a point balance to two decimal places.
pub(crate) fn round_points(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mutable state tracked for a single agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    id: AgentId,
    name: String,
    location: Location,
    origin: Location,
    points: f64,
    #[serde(default)]
    rank: usize,
    finished: bool,
    stunned: u32,
    #[serde(default)]
    out_cold: bool,
    invincible: bool,
    warped: bool,
    multiplier: Option<f64>,
    inventory: BTreeMap<Item, u32>,
    offer: Vec<Item>,
}

impl AgentState {
    pub(crate) fn new(id: AgentId, name: String, location: Location) -> Self {
        Self {
            id,
            name,
            location,
            origin: location,
            points: 0.0,
            rank: 0,
            finished: false,
            stunned: 0,
            out_cold: false,
            invincible: false,
            warped: false,
            multiplier: None,
            inventory: BTreeMap::new(),
            offer: Vec::new(),
        }
    }

    /// Identifier of the agent.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Display name of the agent.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current cell.
    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Cell the agent occupied when the current turn began.
    #[must_use]
    pub const fn origin(&self) -> Location {
        self.origin
    }

    /// Spendable points.
    #[must_use]
    pub const fn points(&self) -> f64 {
        self.points
    }

    /// Standing among all agents, starting at 1.
    #[must_use]
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Whether the agent has reached the goal.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Remaining stun counter.
    #[must_use]
    pub const fn stunned(&self) -> u32 {
        self.stunned
    }

    /// Whether the agent is currently stunned.
    #[must_use]
    pub const fn is_stunned(&self) -> bool {
        self.stunned > 0 || self.out_cold
    }

    /// Whether the agent is invincible for the rest of the turn.
    #[must_use]
    pub const fn is_invincible(&self) -> bool {
        self.invincible
    }

    /// Whether the agent warped during the current turn.
    #[must_use]
    pub const fn has_warped(&self) -> bool {
        self.warped
    }

    /// Multiplier applied to positive awards, if any.
    #[must_use]
    pub const fn multiplier(&self) -> Option<f64> {
        self.multiplier
    }

    /// Items held by the agent.
    #[must_use]
    pub fn inventory(&self) -> &BTreeMap<Item, u32> {
        &self.inventory
    }

    /// Number of units of an item held by the agent.
    #[must_use]
    pub fn item_count(&self, item: Item) -> u32 {
        self.inventory.get(&item).copied().unwrap_or(0)
    }

    /// Items the agent may currently claim.
    #[must_use]
    pub fn offer(&self) -> &[Item] {
        &self.offer
    }

    /// Moves the agent to a new cell.
    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    /// Credits points and returns the amount actually applied.
    ///
    /// Positive amounts are scaled by the active multiplier; penalties are
    /// applied unscaled. Non-finite amounts are ignored.
    pub fn add_points(&mut self, amount: f64) -> f64 {
        if !amount.is_finite() {
            log::warn!(
                "ignoring non-finite award of {amount} to {} ({})",
                self.name,
                self.id
            );
            return 0.0;
        }
        let applied = if amount > 0.0 {
            round_points(amount * self.multiplier.unwrap_or(1.0))
        } else {
            round_points(amount)
        };
        self.points = round_points(self.points + applied);
        applied
    }

    /// Deducts a cost if the agent can afford it.
    pub fn spend(&mut self, cost: f64) -> bool {
        if cost <= 0.0 {
            return true;
        }
        if self.points + 1e-9 < cost {
            return false;
        }
        self.points = round_points(self.points - cost);
        true
    }

    /// Stuns the agent for at least the given number of decrements.
    pub fn stun(&mut self, turns: u32) {
        self.stunned = self.stunned.max(turns);
    }

    /// Knocks the agent out until [`AgentState::wake_up`] is called at the
    /// end of the turn. Recovery ticks do not shorten it.
    pub fn knock_out_for_turn(&mut self) {
        self.out_cold = true;
    }

    /// Ends a turn-long knockout and reports whether there was one.
    pub fn wake_up(&mut self) -> bool {
        std::mem::replace(&mut self.out_cold, false)
    }

    /// Decrements the stun counter and reports whether the agent just
    /// regained consciousness.
    pub fn recover(&mut self) -> bool {
        if self.stunned == 0 {
            return false;
        }
        self.stunned -= 1;
        self.stunned == 0
    }

    /// Grants or revokes invincibility.
    pub fn set_invincible(&mut self, invincible: bool) {
        self.invincible = invincible;
    }

    /// Records that the agent warped this turn.
    pub fn mark_warped(&mut self) {
        self.warped = true;
    }

    /// Sets or clears the award multiplier.
    pub fn set_multiplier(&mut self, multiplier: Option<f64>) {
        self.multiplier = multiplier.filter(|value| value.is_finite() && *value > 0.0);
    }

    /// Adds one unit of an item.
    pub fn grant(&mut self, item: Item) {
        *self.inventory.entry(item).or_insert(0) += 1;
    }

    /// Removes one unit of an item if the agent holds it.
    pub fn consume(&mut self, item: Item) -> bool {
        match self.inventory.get_mut(&item) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                let _ = self.inventory.remove(&item);
                true
            }
            None => false,
        }
    }

    /// Replaces the pending prize offer.
    pub fn set_offer(&mut self, items: Vec<Item>) {
        self.offer = items;
    }

    pub(crate) fn begin_turn(&mut self) {
        self.origin = self.location;
        self.invincible = false;
        self.warped = false;
    }

    pub(crate) fn set_rank(&mut self, rank: usize) {
        self.rank = rank;
    }

    pub(crate) fn mark_finished(&mut self) {
        self.finished = true;
    }
}

/// Ordered collection of agents with monotonically assigned identifiers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Roster {
    agents: BTreeMap<AgentId, AgentState>,
    next_id: u32,
}

impl Roster {
    pub(crate) fn insert(&mut self, name: String, location: Location) -> AgentId {
        let id = AgentId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let _ = self.agents.insert(id, AgentState::new(id, name, location));
        id
    }

    pub(crate) fn remove(&mut self, id: AgentId) -> Option<AgentState> {
        self.agents.remove(&id)
    }

    pub(crate) fn get(&self, id: AgentId) -> Option<&AgentState> {
        self.agents.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: AgentId) -> Option<&mut AgentState> {
        self.agents.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &AgentState> {
        self.agents.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut AgentState> {
        self.agents.values_mut()
    }

    pub(crate) fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.agents.len()
    }
}
