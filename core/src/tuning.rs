use serde::{Deserialize, Serialize};

use crate::Item;

/// Flavour of maze being played.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Plain maze without doorways or chests.
    Maze,
    /// Maze with locked doorways, chests, keys and seals.
    #[default]
    Dungeon,
}

impl Variant {
    /// Items that prizes and chests may hand out in this variant.
    #[must_use]
    pub const fn item_pool(self) -> &'static [Item] {
        match self {
            Variant::Maze => &[
                Item::Trap,
                Item::Obstacle,
                Item::Collectible,
                Item::Charge,
                Item::Star,
            ],
            Variant::Dungeon => &Item::ALL,
        }
    }

    /// Reports whether generated maps carry doorways and chests.
    #[must_use]
    pub const fn has_doorways(self) -> bool {
        matches!(self, Variant::Dungeon)
    }
}

/// Tunable rules of the minigame.
///
/// Every field has a shipped default, so partial configuration files only
/// need to name the values they change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Maze flavour.
    pub variant: Variant,
    /// Number of rows in generated maps.
    pub rows: u32,
    /// Number of columns in generated maps.
    pub columns: u32,
    /// Candidate maps generated before the fairest one is kept.
    pub generation_attempts: u32,
    /// Minimum route cost from every corner to the goal.
    pub min_naive_cost: u32,
    /// Extra wall openings carved to create loops.
    pub loop_openings: u32,
    /// Doorways placed in dungeon maps.
    pub doorway_count: u32,
    /// Smallest initial doorway cost.
    pub doorway_cost_min: u32,
    /// Largest initial doorway cost.
    pub doorway_cost_max: u32,
    /// Chests placed in dungeon maps.
    pub chest_count: u32,
    /// Cost of a single step.
    pub step_cost: f64,
    /// Cost of a pause.
    pub pause_cost: f64,
    /// Cost of locking a doorway.
    pub lock_cost: f64,
    /// Cost of a punch.
    pub punch_cost: f64,
    /// Cost of a warp.
    pub warp_cost: f64,
    /// Maximum pauses in one decision string.
    pub max_pauses: usize,
    /// Maximum warps in one decision string.
    pub max_warps: usize,
    /// Points an agent needs before it punches through blockers on its own.
    pub auto_punch_threshold: f64,
    /// Probability that a deliberate punch lands.
    pub punch_success_chance: f64,
    /// Most collectibles a landed punch can knock loose.
    pub punch_spill_max: u32,
    /// Smallest collectible reward.
    pub collectible_reward_min: u32,
    /// Largest collectible reward.
    pub collectible_reward_max: u32,
    /// Extra route cost charged for cells occupied by other agents.
    pub occupied_surcharge: u32,
    /// Multiplier granted to trailing agents.
    pub home_stretch_multiplier: f64,
    /// Agents holding more points than this never get the multiplier.
    pub home_stretch_max_points: f64,
    /// Hidden hazards spawned at the start of every turn.
    pub hazards_per_turn: u32,
    /// Collectibles spawned at the start of every turn.
    pub collectibles_per_turn: u32,
    /// Points a trap owner earns per tile its victim is sent back.
    pub hazard_reward_per_tile: f64,
    /// Largest number of acting agents that still allows fast ticks.
    pub fast_path_max_actors: usize,
    /// Items presented by a major prize.
    pub offer_size: usize,
    /// Turns an agent stays down after being stunned.
    pub stun_turns: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            variant: Variant::Dungeon,
            rows: 15,
            columns: 15,
            generation_attempts: 12,
            min_naive_cost: 8,
            loop_openings: 6,
            doorway_count: 4,
            doorway_cost_min: 4,
            doorway_cost_max: 12,
            chest_count: 3,
            step_cost: 1.0,
            pause_cost: 0.0,
            lock_cost: 1.0,
            punch_cost: 2.0,
            warp_cost: 3.0,
            max_pauses: 3,
            max_warps: 3,
            auto_punch_threshold: 4.0,
            punch_success_chance: 0.75,
            punch_spill_max: 3,
            collectible_reward_min: 1,
            collectible_reward_max: 3,
            occupied_surcharge: 3,
            home_stretch_multiplier: 1.5,
            home_stretch_max_points: 5.0,
            hazards_per_turn: 1,
            collectibles_per_turn: 1,
            hazard_reward_per_tile: 0.5,
            fast_path_max_actors: 2,
            offer_size: 3,
            stun_turns: 1,
        }
    }
}

impl Tuning {
    /// Points an agent must hold to queue a warp.
    #[must_use]
    pub fn warp_affordability(&self) -> f64 {
        (self.max_warps as f64 + 1.0) * self.warp_cost
    }

    /// Tuning with per-turn spawns switched off, handy for scripted scenes.
    #[must_use]
    pub fn without_spawns(mut self) -> Self {
        self.hazards_per_turn = 0;
        self.collectibles_per_turn = 0;
        self
    }
}
