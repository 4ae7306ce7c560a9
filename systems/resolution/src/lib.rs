#![deny(unsafe_code, missing_docs, non_snake_case, unreachable_pub)]

//! Turn resolution engine that executes queued decisions tick by tick.
//!
//! Each call to [`Resolution::process_tick`] advances every agent holding a
//! decision entry by at most one action. Agents are visited in a shuffled
//! order that still lets the occupant of a contested cell act before the
//! agent trying to walk into it. When an agent's queue runs dry its
//! end-of-turn triggers fire and its entry is removed.

pub mod spawn;

use std::collections::BTreeSet;

use maze_party_core::{Action, AgentId, Direction, Event, Item, Location, Tile, Tuning};
use maze_party_world::{query, LineStyle, RenderLine, World};
use rand::{seq::SliceRandom, Rng};

/// Ticks after which a turn is forcibly wrapped up.
const MAX_TICKS_PER_TURN: u32 = 1_000;

/// Outcome of a single resolution tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Whether any agent still has queued actions.
    pub continue_processing: bool,
    /// Whether the next tick may run without a pacing delay.
    pub continue_immediately: bool,
    /// Number of agents that attempted an action this tick.
    pub actors: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Progress {
    Consumed,
    Deferred,
    TurnEnded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Collision {
    Enter,
    Shoved(AgentId),
    Wait,
    Punched,
    GaveUp,
}

/// Pure system that resolves queued decisions against the world.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    tuning: Tuning,
}

impl Resolution {
    /// Creates a resolution engine using the provided rules.
    #[must_use]
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    /// Advances the current turn by one tick.
    pub fn process_tick<R>(&self, world: &mut World, rng: &mut R, out: &mut Vec<Event>) -> TickOutcome
    where
        R: Rng + ?Sized,
    {
        let start = out.len();
        let tick = world.advance_tick();
        let _ = world.audit();

        if tick > MAX_TICKS_PER_TURN {
            log::warn!(
                "turn {} exceeded {MAX_TICKS_PER_TURN} ticks; ending every remaining queue",
                world.turn()
            );
            for id in world.decision_holders() {
                let dropped = world.clear_decisions(id);
                if dropped > 0 {
                    out.push(Event::DecisionsDiscarded {
                        agent: id,
                        count: dropped,
                    });
                }
                self.conclude(world, id, out);
            }
            world.refresh_ranks();
            world.record_events(&out[start..]);
            return TickOutcome::default();
        }

        let mut ready = Vec::new();
        for id in world.decision_holders() {
            let Some(agent) = world.agent_mut(id) else {
                continue;
            };
            if agent.is_stunned() {
                if agent.recover() {
                    out.push(Event::RegainedConsciousness { agent: id });
                }
                continue;
            }
            ready.push(id);
        }

        let order = processing_order(world, ready, rng);
        let mut deferred = BTreeSet::new();
        let mut actors = 0;
        for id in order {
            if world.agent(id).map_or(true, |agent| agent.is_stunned()) {
                continue;
            }
            if !world.has_pending(id) {
                self.conclude(world, id, out);
                continue;
            }

            actors += 1;
            match self.execute(world, id, &deferred, rng, out) {
                Progress::Consumed => {
                    if !world.has_pending(id) {
                        self.conclude(world, id, out);
                    }
                }
                Progress::Deferred => {
                    let _ = deferred.insert(id);
                }
                Progress::TurnEnded => {
                    let _ = world.clear_decisions(id);
                    self.conclude(world, id, out);
                }
            }
        }

        let continue_processing = query::any_pending(world);
        if !continue_processing {
            for id in world.decision_holders() {
                self.conclude(world, id, out);
            }
        }
        world.refresh_ranks();

        let produced = &out[start..];
        let continue_immediately = !produced.is_empty()
            && produced.iter().all(Event::is_plain_step)
            && actors <= self.tuning.fast_path_max_actors;
        world.record_events(produced);
        log::debug!(
            "tick {tick}: {actors} actors, {} events, continue={continue_processing}",
            produced.len()
        );

        TickOutcome {
            continue_processing,
            continue_immediately,
            actors,
        }
    }

    fn execute<R>(
        &self,
        world: &mut World,
        id: AgentId,
        deferred: &BTreeSet<AgentId>,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) -> Progress
    where
        R: Rng + ?Sized,
    {
        let Some(action) = world.next_decision(id) else {
            return Progress::TurnEnded;
        };
        log::debug!("agent {id} executes `{action}`");

        let progress = match action {
            Action::Move(direction) => self.step(world, id, direction, deferred, rng, out),
            Action::Pause => {
                if self.pay(world, id, self.tuning.pause_cost, out) {
                    out.push(Event::Paused { agent: id });
                    Progress::Consumed
                } else {
                    Progress::TurnEnded
                }
            }
            Action::Unlock(target) => self.unlock(world, id, action, target, false, out),
            Action::Key => self.unlock(world, id, action, None, true, out),
            Action::Lock(target) => self.lock(world, id, action, target, out),
            Action::Seal(target) => self.seal(world, id, action, target, out),
            Action::Punch => self.punch(world, id, rng, out),
            Action::Warp => self.warp(world, id, rng, out),
            Action::Trap(_) | Action::Obstacle(_) | Action::Collectible(_) => {
                self.place(world, id, action, out)
            }
            Action::Charge(target) => self.charge(world, id, action, target, rng, out),
            Action::Star => self.star(world, id, action, out),
        };

        if progress == Progress::Consumed {
            let _ = world.pop_decision(id);
        }
        progress
    }

    fn pay(&self, world: &mut World, id: AgentId, cost: f64, out: &mut Vec<Event>) -> bool {
        let Some(agent) = world.agent_mut(id) else {
            return false;
        };
        if agent.spend(cost) {
            true
        } else {
            out.push(Event::OutOfPoints {
                agent: id,
                needed: cost,
            });
            false
        }
    }

    fn step<R>(
        &self,
        world: &mut World,
        id: AgentId,
        direction: Direction,
        deferred: &BTreeSet<AgentId>,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) -> Progress
    where
        R: Rng + ?Sized,
    {
        let Some(agent) = world.agent(id) else {
            return Progress::TurnEnded;
        };
        let from = agent.location();
        let points = agent.points();

        let Some(to) = world.map().step(from, direction) else {
            out.push(Event::Blocked {
                agent: id,
                location: from,
            });
            return Progress::TurnEnded;
        };
        match world.map().tile(to) {
            Some(Tile::Doorway { locked: true }) => {
                out.push(Event::DoorwayBlocked {
                    agent: id,
                    location: to,
                });
                return Progress::TurnEnded;
            }
            Some(tile) if tile.is_walkable() => {}
            _ => {
                out.push(Event::Blocked {
                    agent: id,
                    location: to,
                });
                return Progress::TurnEnded;
            }
        }
        if points + 1e-9 < self.tuning.step_cost {
            out.push(Event::OutOfPoints {
                agent: id,
                needed: self.tuning.step_cost,
            });
            return Progress::TurnEnded;
        }

        let mut announced = false;
        let mut shoved = None;
        if let Some(occupant) = world.occupant(to, Some(id)) {
            match self.collide(world, id, occupant, to, direction, deferred, rng, out) {
                Collision::Enter => announced = true,
                Collision::Shoved(victim) => {
                    announced = true;
                    shoved = Some(victim);
                }
                Collision::Wait | Collision::Punched => return Progress::Deferred,
                Collision::GaveUp => return Progress::TurnEnded,
            }
        }

        if !self.pay(world, id, self.tuning.step_cost, out) {
            return Progress::TurnEnded;
        }
        relocate(world, id, to, LineStyle::Walk);
        if !announced {
            out.push(Event::Stepped {
                agent: id,
                from,
                to,
            });
        }
        if let Some(victim) = shoved {
            // A victim whose entry already closed gets its triggers here.
            if world.decisions(victim).is_none() {
                self.spring_hazard(world, victim, out);
                separate(world, victim, out);
            }
        }

        if self.enter(world, id, to, rng, out) {
            Progress::TurnEnded
        } else {
            Progress::Consumed
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn collide<R>(
        &self,
        world: &mut World,
        mover: AgentId,
        occupant: AgentId,
        to: Location,
        direction: Direction,
        deferred: &BTreeSet<AgentId>,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) -> Collision
    where
        R: Rng + ?Sized,
    {
        let mover_invincible = world.agent(mover).is_some_and(|agent| agent.is_invincible());
        let (occupant_invincible, occupant_stunned) = world
            .agent(occupant)
            .map_or((false, false), |agent| (agent.is_invincible(), agent.is_stunned()));

        if mover_invincible && !occupant_invincible {
            if let Some(victim) = world.agent_mut(occupant) {
                victim.stun(self.tuning.stun_turns);
            }
            out.push(Event::Trampled {
                agent: mover,
                victim: occupant,
                location: to,
            });
            return Collision::Enter;
        }

        let mutual = world.record_bump(mover, occupant);
        if mutual || deferred.contains(&occupant) {
            out.push(Event::PassedBy {
                agent: mover,
                other: occupant,
                location: to,
            });
            return Collision::Enter;
        }

        if occupant_stunned {
            out.push(Event::SteppedOver {
                agent: mover,
                other: occupant,
                location: to,
            });
            return Collision::Enter;
        }

        if world.has_pending(occupant) {
            out.push(Event::Waiting {
                agent: mover,
                blocker: occupant,
            });
            return Collision::Wait;
        }

        if let Some(destination) = shove_destination(world, to, direction, rng) {
            relocate(world, occupant, destination, LineStyle::Shove);
            out.push(Event::Shoved {
                agent: mover,
                victim: occupant,
                to: destination,
            });
            let _ = self.enter(world, occupant, destination, rng, out);
            return Collision::Shoved(occupant);
        }

        let points = world.agent(mover).map_or(0.0, |agent| agent.points());
        if points >= self.tuning.auto_punch_threshold && points + 1e-9 >= self.tuning.punch_cost {
            if let Some(agent) = world.agent_mut(mover) {
                let _ = agent.spend(self.tuning.punch_cost);
            }
            if let Some(victim) = world.agent_mut(occupant) {
                victim.stun(self.tuning.stun_turns);
            }
            out.push(Event::AutoPunched {
                agent: mover,
                victim: occupant,
            });
            return Collision::Punched;
        }

        out.push(Event::GaveUp {
            agent: mover,
            blocker: occupant,
        });
        Collision::GaveUp
    }

    /// Applies the effects of stepping onto a cell and reports whether the
    /// agent finished.
    fn enter<R>(&self, world: &mut World, id: AgentId, at: Location, rng: &mut R, out: &mut Vec<Event>) -> bool
    where
        R: Rng + ?Sized,
    {
        match world.map().tile(at) {
            Some(Tile::Collectible) => {
                let low = self.tuning.collectible_reward_min.min(self.tuning.collectible_reward_max);
                let high = self.tuning.collectible_reward_min.max(self.tuning.collectible_reward_max);
                let reward = f64::from(rng.gen_range(low..=high));
                let _ = world.set_tile(at, Tile::Empty);
                let applied = world
                    .agent_mut(id)
                    .map_or(0.0, |agent| agent.add_points(reward));
                out.push(Event::CollectiblePicked {
                    agent: id,
                    location: at,
                    reward: applied,
                });
            }
            Some(Tile::Chest) => {
                if let Some(item) = self.tuning.variant.item_pool().choose(rng).copied() {
                    let _ = world.set_tile(at, Tile::Empty);
                    if let Some(agent) = world.agent_mut(id) {
                        agent.grant(item);
                    }
                    out.push(Event::ChestOpened {
                        agent: id,
                        location: at,
                        item,
                    });
                }
            }
            _ => {}
        }

        let already_finished = world.agent(id).map_or(true, |agent| agent.is_finished());
        if at == world.goal() && !already_finished {
            let place = world.finish(id);
            log::info!("agent {id} finished in place {place}");
            out.push(Event::Finished { agent: id, place });
            return true;
        }
        false
    }

    fn unlock(
        &self,
        world: &mut World,
        id: AgentId,
        action: Action,
        target: Option<Location>,
        with_key: bool,
        out: &mut Vec<Event>,
    ) -> Progress {
        let Some(agent) = world.agent(id) else {
            return Progress::TurnEnded;
        };
        let location = agent.location();
        if with_key && agent.item_count(Item::Key) == 0 {
            out.push(Event::Fumbled { agent: id, action });
            return Progress::Consumed;
        }

        let doorways = match target {
            Some(target) => targeted_doorway(world, location, target).into_iter().collect(),
            None => world.map().adjacent_doorways(location, Some(true)),
        };
        if doorways.is_empty() {
            out.push(Event::Fumbled { agent: id, action });
            return Progress::Consumed;
        }

        for doorway in doorways {
            if !with_key {
                let cost = f64::from(world.doorway_cost(doorway).unwrap_or(1));
                if !self.pay(world, id, cost, out) {
                    return Progress::TurnEnded;
                }
            }
            let _ = world.set_tile(doorway, Tile::Doorway { locked: false });
            let remaining_cost = world.halve_doorway_cost(doorway);
            out.push(Event::DoorwayUnlocked {
                agent: id,
                location: doorway,
                remaining_cost,
                with_key,
            });
        }

        if with_key {
            if let Some(agent) = world.agent_mut(id) {
                let _ = agent.consume(Item::Key);
            }
        }
        Progress::Consumed
    }

    fn lock(
        &self,
        world: &mut World,
        id: AgentId,
        action: Action,
        target: Option<Location>,
        out: &mut Vec<Event>,
    ) -> Progress {
        let Some(location) = world.agent(id).map(|agent| agent.location()) else {
            return Progress::TurnEnded;
        };
        let candidates: Vec<Location> = match target {
            Some(target) => targeted_doorway(world, location, target).into_iter().collect(),
            None => world.map().adjacent_doorways(location, Some(false)),
        };
        let doorways: Vec<Location> = candidates
            .into_iter()
            .filter(|doorway| world.occupant(*doorway, None).is_none())
            .collect();
        if doorways.is_empty() {
            out.push(Event::Fumbled { agent: id, action });
            return Progress::Consumed;
        }
        if !self.pay(world, id, self.tuning.lock_cost, out) {
            return Progress::TurnEnded;
        }
        for doorway in doorways {
            let _ = world.set_tile(doorway, Tile::Doorway { locked: true });
            out.push(Event::DoorwayLocked {
                agent: id,
                location: doorway,
            });
        }
        Progress::Consumed
    }

    fn seal(
        &self,
        world: &mut World,
        id: AgentId,
        action: Action,
        target: Option<Location>,
        out: &mut Vec<Event>,
    ) -> Progress {
        let Some(agent) = world.agent(id) else {
            return Progress::TurnEnded;
        };
        let location = agent.location();
        if agent.item_count(Item::Seal) == 0 {
            out.push(Event::Fumbled { agent: id, action });
            return Progress::Consumed;
        }

        let candidates: Vec<Location> = match target {
            Some(target) => targeted_doorway(world, location, target).into_iter().collect(),
            None => world.map().adjacent_doorways(location, None),
        };
        let doorways: Vec<Location> = candidates
            .into_iter()
            .filter(|doorway| world.occupant(*doorway, None).is_none())
            .collect();
        let Some(first) = doorways.first().copied() else {
            out.push(Event::Fumbled { agent: id, action });
            return Progress::Consumed;
        };

        let mut sealed = world.map().clone();
        for doorway in &doorways {
            let _ = sealed.set(*doorway, Tile::Wall);
        }
        if !world.everyone_reaches_goal_on(&sealed, None) {
            out.push(Event::SealRefused {
                agent: id,
                location: first,
            });
            return Progress::Consumed;
        }

        if let Some(agent) = world.agent_mut(id) {
            let _ = agent.consume(Item::Seal);
        }
        for doorway in doorways {
            let _ = world.set_tile(doorway, Tile::Wall);
            out.push(Event::DoorwaySealed {
                agent: id,
                location: doorway,
            });
        }
        Progress::Consumed
    }

    fn punch<R>(&self, world: &mut World, id: AgentId, rng: &mut R, out: &mut Vec<Event>) -> Progress
    where
        R: Rng + ?Sized,
    {
        if !self.pay(world, id, self.tuning.punch_cost, out) {
            return Progress::TurnEnded;
        }
        let Some(location) = world.agent(id).map(|agent| agent.location()) else {
            return Progress::TurnEnded;
        };
        let mut reach: Vec<Location> = world.map().neighbors(location).collect();
        reach.push(location);

        let victims: Vec<AgentId> = world
            .agents()
            .filter(|agent| {
                agent.id() != id
                    && !agent.is_finished()
                    && !agent.is_stunned()
                    && !agent.is_invincible()
                    && reach.contains(&agent.location())
            })
            .map(|agent| agent.id())
            .collect();
        if victims.is_empty() {
            out.push(Event::PunchWhiffed { agent: id });
            return Progress::Consumed;
        }

        let chance = if self.tuning.punch_success_chance.is_finite() {
            self.tuning.punch_success_chance.clamp(0.0, 1.0)
        } else {
            0.0
        };
        for victim in victims {
            if rng.gen_bool(chance) {
                if let Some(state) = world.agent_mut(victim) {
                    state.stun(self.tuning.stun_turns);
                }
                let spilled = self.spill(world, victim, rng);
                out.push(Event::PunchLanded {
                    agent: id,
                    victim,
                    spilled,
                });
            } else {
                out.push(Event::PunchMissed { agent: id, victim });
            }
        }
        Progress::Consumed
    }

    /// Knocks collectibles loose around a punched agent, charging one point
    /// per collectible placed.
    fn spill<R>(&self, world: &mut World, victim: AgentId, rng: &mut R) -> u32
    where
        R: Rng + ?Sized,
    {
        if self.tuning.punch_spill_max == 0 {
            return 0;
        }
        let Some(agent) = world.agent(victim) else {
            return 0;
        };
        let location = agent.location();
        let affordable = agent.points().max(0.0).floor() as u32;
        let wanted = rng.gen_range(1..=self.tuning.punch_spill_max).min(affordable);

        let mut cells = world.vacant_near(location);
        cells.shuffle(rng);
        let mut spilled = 0;
        for cell in cells.into_iter().take(wanted as usize) {
            if world.set_tile(cell, Tile::Collectible) {
                if let Some(agent) = world.agent_mut(victim) {
                    let _ = agent.add_points(-1.0);
                }
                spilled += 1;
            }
        }
        spilled
    }

    fn warp<R>(&self, world: &mut World, id: AgentId, rng: &mut R, out: &mut Vec<Event>) -> Progress
    where
        R: Rng + ?Sized,
    {
        let Some(agent) = world.agent(id) else {
            return Progress::TurnEnded;
        };
        let from = agent.location();
        let warped_before = agent.has_warped();

        let Some(to) = spawn::for_warp(world, id, rng) else {
            out.push(Event::WarpFizzled { agent: id });
            return Progress::Consumed;
        };
        if warped_before {
            let current = world.cost_to_goal(from).unwrap_or(u32::MAX);
            let next = world.cost_to_goal(to).unwrap_or(u32::MAX);
            if next >= current {
                out.push(Event::WarpFizzled { agent: id });
                return Progress::Consumed;
            }
        }
        if !self.pay(world, id, self.tuning.warp_cost, out) {
            return Progress::TurnEnded;
        }

        relocate(world, id, to, LineStyle::Warp);
        if let Some(agent) = world.agent_mut(id) {
            agent.mark_warped();
        }
        out.push(Event::Warped { agent: id, from, to });
        Progress::Consumed
    }

    fn place(&self, world: &mut World, id: AgentId, action: Action, out: &mut Vec<Event>) -> Progress {
        let (Some(target), Some(item)) = (action.placement_target(), action.item()) else {
            return Progress::Consumed;
        };
        let held = world.agent(id).is_some_and(|agent| agent.item_count(item) > 0);
        let accepts = target != world.goal()
            && world.map().tile(target).is_some_and(Tile::accepts_placement);
        let allowed = held
            && accepts
            && match action {
                Action::Obstacle(_) => {
                    let mut blocked = world.map().clone();
                    let _ = blocked.set(target, Tile::Obstacle);
                    world.occupant(target, None).is_none()
                        && world.everyone_reaches_goal_on(&blocked, None)
                }
                _ => true,
            };
        if !allowed {
            out.push(Event::PlacementBlocked { agent: id, action });
            return Progress::Consumed;
        }

        if let Some(agent) = world.agent_mut(id) {
            let _ = agent.consume(item);
        }
        match action {
            Action::Trap(_) => {
                let _ = world.set_tile(target, Tile::HiddenHazard);
                world.set_hazard_owner(target, Some(id));
                out.push(Event::TrapSet {
                    agent: id,
                    location: target,
                });
            }
            Action::Obstacle(_) => {
                let _ = world.set_tile(target, Tile::Obstacle);
                out.push(Event::ObstaclePlaced {
                    agent: id,
                    location: target,
                });
            }
            _ => {
                let _ = world.set_tile(target, Tile::Collectible);
                out.push(Event::CollectiblePlaced {
                    agent: id,
                    location: target,
                });
            }
        }
        Progress::Consumed
    }

    fn charge<R>(
        &self,
        world: &mut World,
        id: AgentId,
        action: Action,
        target: Location,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) -> Progress
    where
        R: Rng + ?Sized,
    {
        let Some(agent) = world.agent(id) else {
            return Progress::TurnEnded;
        };
        if agent.item_count(Item::Charge) == 0 {
            out.push(Event::Fumbled { agent: id, action });
            return Progress::Consumed;
        }
        let from = agent.location();

        let mut path = Vec::new();
        let mut clear = false;
        if let Some(direction) = from.direction_to(target) {
            let mut cursor = from;
            clear = true;
            while cursor != target {
                match world.map().step(cursor, direction) {
                    Some(next) if world.map().is_walkable(next) => {
                        path.push(next);
                        cursor = next;
                    }
                    _ => {
                        clear = false;
                        break;
                    }
                }
            }
        }

        if let Some(agent) = world.agent_mut(id) {
            let _ = agent.consume(Item::Charge);
            if !clear {
                agent.stun(self.tuning.stun_turns);
            }
        }
        if !clear {
            out.push(Event::ChargeAborted {
                agent: id,
                location: target,
            });
            return Progress::TurnEnded;
        }

        let trampled: Vec<AgentId> = world
            .agents()
            .filter(|agent| {
                agent.id() != id
                    && !agent.is_finished()
                    && !agent.is_invincible()
                    && path.contains(&agent.location())
            })
            .map(|agent| agent.id())
            .collect();
        for victim in &trampled {
            if let Some(state) = world.agent_mut(*victim) {
                state.stun(self.tuning.stun_turns);
            }
        }

        relocate(world, id, target, LineStyle::Charge);
        out.push(Event::Charged {
            agent: id,
            from,
            to: target,
            trampled,
        });
        if self.enter(world, id, target, rng, out) {
            Progress::TurnEnded
        } else {
            Progress::Consumed
        }
    }

    fn star(&self, world: &mut World, id: AgentId, action: Action, out: &mut Vec<Event>) -> Progress {
        let Some(agent) = world.agent_mut(id) else {
            return Progress::TurnEnded;
        };
        if agent.consume(Item::Star) {
            agent.set_invincible(true);
            out.push(Event::StarActivated { agent: id });
        } else {
            out.push(Event::Fumbled { agent: id, action });
        }
        Progress::Consumed
    }

    /// Fires end-of-turn triggers and removes the agent's decision entry.
    fn conclude(&self, world: &mut World, id: AgentId, out: &mut Vec<Event>) {
        if let Some(agent) = world.agent(id) {
            let warped = agent.has_warped();

            if !agent.is_finished() {
                self.spring_hazard(world, id, out);

                if warped {
                    if let Some(agent) = world.agent_mut(id) {
                        agent.stun(self.tuning.stun_turns);
                    }
                    out.push(Event::WarpSickness { agent: id });
                }

                separate(world, id, out);
            }
        }
        let _ = world.remove_decisions(id);
    }

    /// Reveals a hidden hazard under the agent, or sends it back to where
    /// its turn began when the hazard is already revealed.
    fn spring_hazard(&self, world: &mut World, id: AgentId, out: &mut Vec<Event>) {
        let Some(agent) = world.agent(id) else {
            return;
        };
        let location = agent.location();
        let origin = agent.origin();
        match world.map().tile(location) {
            Some(Tile::HiddenHazard) => {
                let _ = world.set_tile(location, Tile::RevealedHazard);
                out.push(Event::HazardRevealed {
                    agent: id,
                    location,
                });
            }
            Some(Tile::RevealedHazard) if location != origin => {
                self.trigger_hazard(world, id, location, origin, out);
            }
            _ => {}
        }
    }

    fn trigger_hazard(
        &self,
        world: &mut World,
        id: AgentId,
        location: Location,
        origin: Location,
        out: &mut Vec<Event>,
    ) {
        let owner = world.hazard_owner(location).filter(|owner| *owner != id);
        let reward = f64::from(location.manhattan_distance(origin)) * self.tuning.hazard_reward_per_tile;

        relocate(world, id, origin, LineStyle::Revert);
        if let Some(agent) = world.agent_mut(id) {
            agent.stun(self.tuning.stun_turns);
        }
        let credited = match owner {
            Some(owner) => world
                .agent_mut(owner)
                .map_or(0.0, |state| state.add_points(reward)),
            None => 0.0,
        };

        out.push(Event::HazardTriggered {
            agent: id,
            location,
            returned_to: origin,
            owner,
            reward: credited,
        });
    }
}

/// Orders the ready agents so that the occupant of a cell another agent is
/// about to enter acts first; everything else is shuffled.
fn processing_order<R>(world: &World, mut ready: Vec<AgentId>, rng: &mut R) -> Vec<AgentId>
where
    R: Rng + ?Sized,
{
    ready.shuffle(rng);
    let members: BTreeSet<AgentId> = ready.iter().copied().collect();
    let mut visited = BTreeSet::new();
    let mut order = Vec::with_capacity(ready.len());
    for id in &ready {
        visit(world, *id, &members, &mut visited, &mut order);
    }
    order
}

fn visit(
    world: &World,
    id: AgentId,
    members: &BTreeSet<AgentId>,
    visited: &mut BTreeSet<AgentId>,
    order: &mut Vec<AgentId>,
) {
    if !visited.insert(id) {
        return;
    }
    if let Some(blocker) = blocker_of(world, id) {
        if members.contains(&blocker) {
            visit(world, blocker, members, visited, order);
        }
    }
    order.push(id);
}

fn blocker_of(world: &World, id: AgentId) -> Option<AgentId> {
    let Action::Move(direction) = world.next_decision(id)? else {
        return None;
    };
    let from = world.agent(id)?.location();
    let target = world.map().step(from, direction)?;
    world.occupant(target, Some(id))
}

fn targeted_doorway(world: &World, location: Location, target: Location) -> Option<Location> {
    let is_doorway = world.map().tile(target).is_some_and(Tile::is_doorway);
    (target.is_adjacent(location) && is_doorway).then_some(target)
}

fn relocate(world: &mut World, id: AgentId, to: Location, style: LineStyle) {
    let Some(agent) = world.agent_mut(id) else {
        return;
    };
    let from = agent.location();
    agent.set_location(to);
    world.push_render_line(RenderLine {
        agent: id,
        from,
        to,
        style,
    });
}

fn shove_destination<R>(
    world: &World,
    occupied: Location,
    direction: Direction,
    rng: &mut R,
) -> Option<Location>
where
    R: Rng + ?Sized,
{
    let mut sides = direction.perpendicular();
    sides.shuffle(rng);
    let map = world.map();
    [
        map.step(occupied, direction),
        map.step(occupied, sides[0]),
        map.step(occupied, sides[1]),
    ]
    .into_iter()
    .flatten()
    .find(|cell| {
        *cell != world.goal() && map.is_walkable(*cell) && world.occupant(*cell, None).is_none()
    })
}

/// Moves an agent sharing its cell with another one onto the best adjacent
/// free non-hazard cell.
fn separate(world: &mut World, id: AgentId, out: &mut Vec<Event>) {
    let Some(location) = world.agent(id).map(|agent| agent.location()) else {
        return;
    };
    if world.occupant(location, Some(id)).is_none() {
        return;
    }
    let best = world
        .map()
        .neighbors(location)
        .filter(|cell| {
            *cell != world.goal()
                && world
                    .map()
                    .tile(*cell)
                    .is_some_and(|tile| tile.is_walkable() && !tile.is_hazard())
                && world.occupant(*cell, None).is_none()
        })
        .min_by_key(|cell| (world.cost_to_goal(*cell).unwrap_or(u32::MAX), *cell));
    if let Some(to) = best {
        relocate(world, id, to, LineStyle::Shove);
        out.push(Event::Separated {
            agent: id,
            from: location,
            to,
        });
    }
}
