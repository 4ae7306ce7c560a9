use serde::{Deserialize, Serialize};

use crate::{Action, AgentId, Item, Location};

/// Observable outcomes emitted by the world and the turn systems.
///
/// Every variant can be narrated through [`Event::describe`], which is how
/// statements reach the players.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A new turn opened.
    TurnBegan {
        /// One-based turn counter.
        turn: u32,
    },
    /// An agent entered the maze.
    AgentJoined {
        /// Newly registered agent.
        agent: AgentId,
        /// Cell where the agent appeared.
        location: Location,
    },
    /// An agent left the game.
    AgentRemoved {
        /// Departing agent.
        agent: AgentId,
    },
    /// Points were credited or debited.
    PointsAwarded {
        /// Recipient of the points.
        agent: AgentId,
        /// Amount actually applied after multipliers.
        amount: f64,
    },
    /// A trailing agent received a point multiplier for the turn.
    HomeStretchBonus {
        /// Agent receiving the bonus.
        agent: AgentId,
        /// Multiplier applied to positive awards.
        multiplier: f64,
    },
    /// An item was added to an inventory.
    ItemGranted {
        /// Recipient of the item.
        agent: AgentId,
        /// Item granted.
        item: Item,
    },
    /// A choice of items was put on offer.
    ItemsOffered {
        /// Agent that may claim one item.
        agent: AgentId,
        /// Items on offer.
        items: Vec<Item>,
    },
    /// An offered item was claimed.
    ItemClaimed {
        /// Agent that claimed the item.
        agent: AgentId,
        /// Item claimed.
        item: Item,
    },
    /// A decision queue was installed.
    DecisionsQueued {
        /// Agent whose queue changed.
        agent: AgentId,
        /// Number of queued actions.
        count: usize,
    },
    /// A hidden hazard appeared somewhere in the maze.
    HazardSpawned {
        /// Cell holding the hazard.
        location: Location,
    },
    /// A collectible appeared somewhere in the maze.
    CollectibleSpawned {
        /// Cell holding the collectible.
        location: Location,
    },
    /// An agent without points sits the turn out.
    StunnedForTurn {
        /// Agent that cannot act.
        agent: AgentId,
    },
    /// A stunned agent shook it off.
    RegainedConsciousness {
        /// Agent that recovered.
        agent: AgentId,
    },
    /// An agent stepped into a neighbouring cell.
    Stepped {
        /// Moving agent.
        agent: AgentId,
        /// Cell left behind.
        from: Location,
        /// Cell entered.
        to: Location,
    },
    /// An agent spent a tick standing still.
    Paused {
        /// Pausing agent.
        agent: AgentId,
    },
    /// A step was refused by a wall, obstacle or the edge of the maze.
    Blocked {
        /// Agent whose step failed.
        agent: AgentId,
        /// Cell the agent tried to enter.
        location: Location,
    },
    /// A step was refused by a locked doorway.
    DoorwayBlocked {
        /// Agent whose step failed.
        agent: AgentId,
        /// Locked doorway.
        location: Location,
    },
    /// An agent could not afford the next action and stopped.
    OutOfPoints {
        /// Agent that ran dry.
        agent: AgentId,
        /// Cost of the action that could not be paid.
        needed: f64,
    },
    /// An invincible agent ran straight over someone.
    Trampled {
        /// Invincible agent.
        agent: AgentId,
        /// Agent knocked down.
        victim: AgentId,
        /// Cell where it happened.
        location: Location,
    },
    /// Two agents swapping places passed each other.
    PassedBy {
        /// Moving agent.
        agent: AgentId,
        /// Agent passed.
        other: AgentId,
        /// Cell entered.
        location: Location,
    },
    /// An agent stepped over a stunned one.
    SteppedOver {
        /// Moving agent.
        agent: AgentId,
        /// Stunned agent lying in the way.
        other: AgentId,
        /// Cell entered.
        location: Location,
    },
    /// An agent waited for the occupant ahead to move first.
    Waiting {
        /// Waiting agent.
        agent: AgentId,
        /// Agent blocking the way.
        blocker: AgentId,
    },
    /// An agent shoved the occupant out of the way.
    Shoved {
        /// Pushing agent.
        agent: AgentId,
        /// Agent pushed aside.
        victim: AgentId,
        /// Cell the victim was pushed into.
        to: Location,
    },
    /// An agent punched its way through a blocker.
    AutoPunched {
        /// Punching agent.
        agent: AgentId,
        /// Blocker knocked out.
        victim: AgentId,
    },
    /// An agent could not get past and abandoned the rest of its moves.
    GaveUp {
        /// Agent that gave up.
        agent: AgentId,
        /// Agent standing in the way.
        blocker: AgentId,
    },
    /// A collectible was picked up.
    CollectiblePicked {
        /// Agent collecting it.
        agent: AgentId,
        /// Cell of the collectible.
        location: Location,
        /// Points credited.
        reward: f64,
    },
    /// A chest was opened.
    ChestOpened {
        /// Agent opening it.
        agent: AgentId,
        /// Cell of the chest.
        location: Location,
        /// Item found inside.
        item: Item,
    },
    /// An agent reached the goal.
    Finished {
        /// Agent that finished.
        agent: AgentId,
        /// One-based finishing place.
        place: usize,
    },
    /// A doorway was unlocked.
    DoorwayUnlocked {
        /// Agent unlocking it.
        agent: AgentId,
        /// Doorway cell.
        location: Location,
        /// Cost the doorway will charge next time it is unlocked.
        remaining_cost: u32,
        /// Whether a key was spent instead of points.
        with_key: bool,
    },
    /// A doorway was locked.
    DoorwayLocked {
        /// Agent locking it.
        agent: AgentId,
        /// Doorway cell.
        location: Location,
    },
    /// A doorway was sealed into a wall.
    DoorwaySealed {
        /// Agent sealing it.
        agent: AgentId,
        /// Former doorway cell.
        location: Location,
    },
    /// A seal was refused because it would trap somebody.
    SealRefused {
        /// Agent attempting the seal.
        agent: AgentId,
        /// Doorway that stayed open.
        location: Location,
    },
    /// An action found nothing to act on.
    Fumbled {
        /// Acting agent.
        agent: AgentId,
        /// Action that had no effect.
        action: Action,
    },
    /// A punch connected.
    PunchLanded {
        /// Punching agent.
        agent: AgentId,
        /// Agent hit.
        victim: AgentId,
        /// Collectibles knocked loose around the victim.
        spilled: u32,
    },
    /// A punch missed its target.
    PunchMissed {
        /// Punching agent.
        agent: AgentId,
        /// Agent that dodged.
        victim: AgentId,
    },
    /// A punch found nobody in reach.
    PunchWhiffed {
        /// Punching agent.
        agent: AgentId,
    },
    /// An agent teleported.
    Warped {
        /// Warping agent.
        agent: AgentId,
        /// Cell left behind.
        from: Location,
        /// Spawn tile reached.
        to: Location,
    },
    /// A warp found no better tile and did nothing.
    WarpFizzled {
        /// Warping agent.
        agent: AgentId,
    },
    /// The stun that follows a warp set in.
    WarpSickness {
        /// Agent that warped this turn.
        agent: AgentId,
    },
    /// A hidden hazard was laid.
    TrapSet {
        /// Owner of the trap.
        agent: AgentId,
        /// Trap cell.
        location: Location,
    },
    /// An obstacle was placed.
    ObstaclePlaced {
        /// Placing agent.
        agent: AgentId,
        /// Obstacle cell.
        location: Location,
    },
    /// A collectible was placed.
    CollectiblePlaced {
        /// Placing agent.
        agent: AgentId,
        /// Collectible cell.
        location: Location,
    },
    /// A placement was refused by the current state of the maze.
    PlacementBlocked {
        /// Placing agent.
        agent: AgentId,
        /// Placement that failed.
        action: Action,
    },
    /// An agent charged along a straight line.
    Charged {
        /// Charging agent.
        agent: AgentId,
        /// Starting cell.
        from: Location,
        /// Cell where the charge ended.
        to: Location,
        /// Agents knocked down along the way.
        trampled: Vec<AgentId>,
    },
    /// A charge could not start.
    ChargeAborted {
        /// Charging agent.
        agent: AgentId,
        /// Target of the failed charge.
        location: Location,
    },
    /// An agent became invincible.
    StarActivated {
        /// Invincible agent.
        agent: AgentId,
    },
    /// An agent noticed a hidden hazard underfoot.
    HazardRevealed {
        /// Agent standing on the hazard.
        agent: AgentId,
        /// Hazard cell.
        location: Location,
    },
    /// A revealed hazard sent an agent back to where the turn started.
    HazardTriggered {
        /// Victim of the hazard.
        agent: AgentId,
        /// Hazard cell.
        location: Location,
        /// Cell the victim was returned to.
        returned_to: Location,
        /// Owner credited for the trap, if any.
        owner: Option<AgentId>,
        /// Points credited to the owner.
        reward: f64,
    },
    /// Two agents ending in one cell were pushed apart.
    Separated {
        /// Agent that moved.
        agent: AgentId,
        /// Shared cell.
        from: Location,
        /// Cell the agent moved to.
        to: Location,
    },
    /// Unexecuted decisions were dropped at the end of the turn.
    DecisionsDiscarded {
        /// Agent whose queue was cleared.
        agent: AgentId,
        /// Number of actions dropped.
        count: usize,
    },
}

impl Event {
    /// Primary agent the event is about, if any.
    #[must_use]
    pub fn agent(&self) -> Option<AgentId> {
        match self {
            Event::TurnBegan { .. }
            | Event::HazardSpawned { .. }
            | Event::CollectibleSpawned { .. } => None,
            Event::AgentJoined { agent, .. }
            | Event::AgentRemoved { agent }
            | Event::PointsAwarded { agent, .. }
            | Event::HomeStretchBonus { agent, .. }
            | Event::ItemGranted { agent, .. }
            | Event::ItemsOffered { agent, .. }
            | Event::ItemClaimed { agent, .. }
            | Event::DecisionsQueued { agent, .. }
            | Event::StunnedForTurn { agent }
            | Event::RegainedConsciousness { agent }
            | Event::Stepped { agent, .. }
            | Event::Paused { agent }
            | Event::Blocked { agent, .. }
            | Event::DoorwayBlocked { agent, .. }
            | Event::OutOfPoints { agent, .. }
            | Event::Trampled { agent, .. }
            | Event::PassedBy { agent, .. }
            | Event::SteppedOver { agent, .. }
            | Event::Waiting { agent, .. }
            | Event::Shoved { agent, .. }
            | Event::AutoPunched { agent, .. }
            | Event::GaveUp { agent, .. }
            | Event::CollectiblePicked { agent, .. }
            | Event::ChestOpened { agent, .. }
            | Event::Finished { agent, .. }
            | Event::DoorwayUnlocked { agent, .. }
            | Event::DoorwayLocked { agent, .. }
            | Event::DoorwaySealed { agent, .. }
            | Event::SealRefused { agent, .. }
            | Event::Fumbled { agent, .. }
            | Event::PunchLanded { agent, .. }
            | Event::PunchMissed { agent, .. }
            | Event::PunchWhiffed { agent }
            | Event::Warped { agent, .. }
            | Event::WarpFizzled { agent }
            | Event::WarpSickness { agent }
            | Event::TrapSet { agent, .. }
            | Event::ObstaclePlaced { agent, .. }
            | Event::CollectiblePlaced { agent, .. }
            | Event::PlacementBlocked { agent, .. }
            | Event::Charged { agent, .. }
            | Event::ChargeAborted { agent, .. }
            | Event::StarActivated { agent }
            | Event::HazardRevealed { agent, .. }
            | Event::HazardTriggered { agent, .. }
            | Event::Separated { agent, .. }
            | Event::DecisionsDiscarded { agent, .. } => Some(*agent),
        }
    }

    /// Reports whether the event is an uneventful single step.
    #[must_use]
    pub const fn is_plain_step(&self) -> bool {
        matches!(self, Event::Stepped { .. })
    }

    /// Reports whether the event is bookkeeping that players do not need
    /// narrated tick by tick.
    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        matches!(self, Event::DecisionsQueued { .. })
    }

    /// Narrates the event, resolving agent names through `names`.
    pub fn describe(&self, names: &dyn Fn(AgentId) -> String) -> String {
        match self {
            Event::TurnBegan { turn } => format!("Turn {turn} begins."),
            Event::AgentJoined { agent, location } => {
                format!("{} entered the maze at {location}.", names(*agent))
            }
            Event::AgentRemoved { agent } => format!("{} left the maze.", names(*agent)),
            Event::PointsAwarded { agent, amount } => {
                format!("{} received {} points.", names(*agent), amount)
            }
            Event::HomeStretchBonus { agent, multiplier } => format!(
                "{} is on the home stretch: points count {multiplier}x this turn.",
                names(*agent)
            ),
            Event::ItemGranted { agent, item } => format!("{} got a {item}.", names(*agent)),
            Event::ItemsOffered { agent, items } => {
                let names_list: Vec<&str> = items.iter().map(|item| item.name()).collect();
                format!(
                    "{} may claim one of: {}.",
                    names(*agent),
                    names_list.join(", ")
                )
            }
            Event::ItemClaimed { agent, item } => format!("{} claimed a {item}.", names(*agent)),
            Event::DecisionsQueued { agent, count } => {
                format!("{} queued {count} actions.", names(*agent))
            }
            Event::HazardSpawned { .. } => "Something shifts in the maze...".to_owned(),
            Event::CollectibleSpawned { location } => {
                format!("A collectible appeared at {location}.")
            }
            Event::StunnedForTurn { agent } => {
                format!("{} is too exhausted to move this turn.", names(*agent))
            }
            Event::RegainedConsciousness { agent } => {
                format!("{} regained consciousness.", names(*agent))
            }
            Event::Stepped { agent, .. } => format!("{} took a step.", names(*agent)),
            Event::Paused { agent } => format!("{} paused.", names(*agent)),
            Event::Blocked { agent, location } => {
                format!("{} bumped into the wall at {location}.", names(*agent))
            }
            Event::DoorwayBlocked { agent, location } => {
                format!("{} found the doorway at {location} locked.", names(*agent))
            }
            Event::OutOfPoints { agent, needed } => format!(
                "{} ran out of points (needed {needed}).",
                names(*agent)
            ),
            Event::Trampled {
                agent,
                victim,
                location,
            } => format!(
                "{} trampled {} at {location}!",
                names(*agent),
                names(*victim)
            ),
            Event::PassedBy {
                agent,
                other,
                location,
            } => format!(
                "{} squeezed past {} into {location}.",
                names(*agent),
                names(*other)
            ),
            Event::SteppedOver {
                agent,
                other,
                location,
            } => format!(
                "{} stepped over the unconscious {} at {location}.",
                names(*agent),
                names(*other)
            ),
            Event::Waiting { agent, blocker } => {
                format!("{} waited for {}.", names(*agent), names(*blocker))
            }
            Event::Shoved { agent, victim, to } => format!(
                "{} shoved {} to {to}.",
                names(*agent),
                names(*victim)
            ),
            Event::AutoPunched { agent, victim } => format!(
                "{} punched {} out of the way!",
                names(*agent),
                names(*victim)
            ),
            Event::GaveUp { agent, blocker } => format!(
                "{} could not get past {} and gave up.",
                names(*agent),
                names(*blocker)
            ),
            Event::CollectiblePicked {
                agent,
                location,
                reward,
            } => format!(
                "{} picked up a collectible at {location} worth {reward} points.",
                names(*agent)
            ),
            Event::ChestOpened {
                agent,
                location,
                item,
            } => format!(
                "{} opened the chest at {location} and found a {item}.",
                names(*agent)
            ),
            Event::Finished { agent, place } => format!(
                "{} reached the goal in {} place!",
                names(*agent),
                ordinal(*place)
            ),
            Event::DoorwayUnlocked {
                agent,
                location,
                with_key,
                ..
            } => {
                if *with_key {
                    format!(
                        "{} unlocked the doorway at {location} with a key.",
                        names(*agent)
                    )
                } else {
                    format!("{} unlocked the doorway at {location}.", names(*agent))
                }
            }
            Event::DoorwayLocked { agent, location } => {
                format!("{} locked the doorway at {location}.", names(*agent))
            }
            Event::DoorwaySealed { agent, location } => {
                format!("{} sealed the doorway at {location} for good.", names(*agent))
            }
            Event::SealRefused { agent, location } => format!(
                "{} tried to seal {location}, but that would trap someone.",
                names(*agent)
            ),
            Event::Fumbled { agent, action } => format!(
                "{} tried to {action}, but nothing happened.",
                names(*agent)
            ),
            Event::PunchLanded {
                agent,
                victim,
                spilled,
            } => {
                if *spilled > 0 {
                    format!(
                        "{} punched {}, knocking loose {spilled} collectibles!",
                        names(*agent),
                        names(*victim)
                    )
                } else {
                    format!("{} punched {}!", names(*agent), names(*victim))
                }
            }
            Event::PunchMissed { agent, victim } => {
                format!("{} swung at {} and missed.", names(*agent), names(*victim))
            }
            Event::PunchWhiffed { agent } => {
                format!("{} punched the air.", names(*agent))
            }
            Event::Warped { agent, to, .. } => {
                format!("{} warped to {to}.", names(*agent))
            }
            Event::WarpFizzled { agent } => {
                format!("{}'s warp fizzled.", names(*agent))
            }
            Event::WarpSickness { agent } => {
                format!("{} is dizzy from warping.", names(*agent))
            }
            Event::TrapSet { agent, .. } => format!("{} set a trap.", names(*agent)),
            Event::ObstaclePlaced { agent, location } => {
                format!("{} placed an obstacle at {location}.", names(*agent))
            }
            Event::CollectiblePlaced { agent, location } => {
                format!("{} placed a collectible at {location}.", names(*agent))
            }
            Event::PlacementBlocked { agent, action } => {
                format!("{} could not {action} there anymore.", names(*agent))
            }
            Event::Charged {
                agent,
                to,
                trampled,
                ..
            } => {
                if trampled.is_empty() {
                    format!("{} charged to {to}.", names(*agent))
                } else {
                    let victims: Vec<String> = trampled.iter().map(|id| names(*id)).collect();
                    format!(
                        "{} charged to {to}, bowling over {}!",
                        names(*agent),
                        victims.join(" and ")
                    )
                }
            }
            Event::ChargeAborted { agent, location } => format!(
                "{} could not charge toward {location}.",
                names(*agent)
            ),
            Event::StarActivated { agent } => {
                format!("{} is glowing with invincibility!", names(*agent))
            }
            Event::HazardRevealed { agent, location } => {
                format!("{} revealed a hazard at {location}.", names(*agent))
            }
            Event::HazardTriggered {
                agent,
                location,
                returned_to,
                owner,
                reward,
            } => match owner {
                Some(owner) => format!(
                    "{} triggered {}'s trap at {location} and was sent back to {returned_to}; {} earned {reward} points.",
                    names(*agent),
                    names(*owner),
                    names(*owner)
                ),
                None => format!(
                    "{} triggered a hazard at {location} and was sent back to {returned_to}.",
                    names(*agent)
                ),
            },
            Event::Separated { agent, to, .. } => {
                format!("{} was nudged aside to {to}.", names(*agent))
            }
            Event::DecisionsDiscarded { agent, count } => format!(
                "{} left {count} actions unused.",
                names(*agent)
            ),
        }
    }
}

fn ordinal(place: usize) -> String {
    let suffix = match (place % 10, place % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{place}{suffix}")
}
