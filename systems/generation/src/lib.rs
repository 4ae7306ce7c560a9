#![deny(unsafe_code, missing_docs, non_snake_case, unreachable_pub)]

//! Deterministic procedural maze generation with retry-until-fair semantics.
//!
//! Every attempt carves a maze with a randomized depth-first walk over the
//! odd cells of the grid, braids it with a few loop openings and, for the
//! dungeon variant, sprinkles locked doorways and chests over it. Attempts
//! whose corners cannot reach the goal, or whose cheapest corner route is
//! too short, are rejected. The surviving attempt with the best fairness
//! score wins.

use std::collections::BTreeMap;

use maze_party_core::{Direction, Location, Tile, TileMap, Tuning};
use maze_party_world::navigation::{DoorwayPolicy, Planner};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

const MIN_DIMENSION: u32 = 5;
const ATTEMPT_STREAM: &str = "maze-party/generation/attempt";

/// Errors raised while generating a map.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The configured grid cannot hold a maze.
    #[error("maps need at least {MIN_DIMENSION} rows and columns, got {rows}x{columns}")]
    TooSmall {
        /// Configured rows.
        rows: u32,
        /// Configured columns.
        columns: u32,
    },
    /// Every attempt was rejected.
    #[error("no fair map found in {attempts} attempts")]
    NoFairMap {
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Map accepted by the generator together with its scores.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedMap {
    /// Generated terrain.
    pub map: TileMap,
    /// Goal cell at the heart of the maze.
    pub goal: Location,
    /// Unlock cost of every doorway.
    pub doorway_costs: BTreeMap<Location, u32>,
    /// Cheapest corner route cost divided by the most expensive one.
    pub fairness: f64,
    /// Cheapest corner route cost when doorways are ignored.
    pub naive_cost: u32,
}

/// Pure system that produces maps from a seed.
#[derive(Clone, Debug, Default)]
pub struct MapGenerator {
    tuning: Tuning,
}

impl MapGenerator {
    /// Creates a generator using the provided rules.
    #[must_use]
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    /// Generates the fairest acceptable map for the seed.
    pub fn generate(&self, seed: u64) -> Result<GeneratedMap, GenerationError> {
        let (rows, columns) = (self.tuning.rows, self.tuning.columns);
        if rows < MIN_DIMENSION || columns < MIN_DIMENSION {
            return Err(GenerationError::TooSmall { rows, columns });
        }

        let attempts = self.tuning.generation_attempts.max(1);
        let mut best: Option<GeneratedMap> = None;
        for attempt in 0..attempts {
            let mut rng = ChaCha8Rng::seed_from_u64(derive_attempt_seed(seed, attempt));
            let Some(candidate) = self.attempt(&mut rng) else {
                log::debug!("generation attempt {attempt} rejected");
                continue;
            };
            log::debug!(
                "generation attempt {attempt}: fairness {:.3}, naive cost {}",
                candidate.fairness,
                candidate.naive_cost
            );
            if best
                .as_ref()
                .map_or(true, |current| candidate.fairness > current.fairness)
            {
                best = Some(candidate);
            }
        }

        match best {
            Some(map) => {
                log::info!(
                    "generated {rows}x{columns} map with fairness {:.3}",
                    map.fairness
                );
                Ok(map)
            }
            None => Err(GenerationError::NoFairMap { attempts }),
        }
    }

    fn attempt(&self, rng: &mut ChaCha8Rng) -> Option<GeneratedMap> {
        let mut map = carve(self.tuning.rows, self.tuning.columns, rng);
        open_loops(&mut map, self.tuning.loop_openings, rng);

        let goal = nearest_to_center(&map)?;
        let corners = corners(&map);

        let mut doorway_costs = BTreeMap::new();
        if self.tuning.variant.has_doorways() {
            self.place_doorways(&mut map, goal, &mut doorway_costs, rng);
            self.place_chests(&mut map, goal, &corners, rng);
        }

        let fairness = Planner::new(&map, &doorway_costs)
            .with_doorways(DoorwayPolicy::Weighted)
            .fairness(&corners, goal)?;
        let free = Planner::new(&map, &doorway_costs).with_doorways(DoorwayPolicy::Free);
        let naive_cost = corners
            .iter()
            .filter_map(|corner| free.distance(*corner, goal))
            .min()?;
        if naive_cost < self.tuning.min_naive_cost {
            return None;
        }

        Some(GeneratedMap {
            map,
            goal,
            doorway_costs,
            fairness,
            naive_cost,
        })
    }

    fn place_doorways(
        &self,
        map: &mut TileMap,
        goal: Location,
        costs: &mut BTreeMap<Location, u32>,
        rng: &mut ChaCha8Rng,
    ) {
        let mut connectors: Vec<Location> = map
            .locations()
            .filter(|cell| is_connector(*cell) && map.tile(*cell) == Some(Tile::Empty))
            .filter(|cell| !cell.is_adjacent(goal))
            .collect();
        connectors.shuffle(rng);

        let low = self.tuning.doorway_cost_min.min(self.tuning.doorway_cost_max);
        let high = self.tuning.doorway_cost_min.max(self.tuning.doorway_cost_max);
        for cell in connectors.into_iter().take(self.tuning.doorway_count as usize) {
            let _ = map.set(cell, Tile::Doorway { locked: true });
            let _ = costs.insert(cell, rng.gen_range(low..=high).max(1));
        }
    }

    fn place_chests(
        &self,
        map: &mut TileMap,
        goal: Location,
        corners: &[Location],
        rng: &mut ChaCha8Rng,
    ) {
        let mut rooms: Vec<Location> = map
            .locations()
            .filter(|cell| is_room(*cell) && map.tile(*cell) == Some(Tile::Empty))
            .filter(|cell| *cell != goal && !corners.contains(cell))
            .collect();
        rooms.shuffle(rng);
        for cell in rooms.into_iter().take(self.tuning.chest_count as usize) {
            let _ = map.set(cell, Tile::Chest);
        }
    }
}

fn derive_attempt_seed(seed: u64, attempt: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(ATTEMPT_STREAM.as_bytes());
    hasher.update(attempt.to_le_bytes());
    finalize_seed(hasher)
}

fn finalize_seed(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Cells with two odd coordinates hold the maze's rooms.
fn is_room(cell: Location) -> bool {
    cell.row() % 2 == 1 && cell.column() % 2 == 1
}

/// Cells with exactly one odd coordinate sit between two rooms.
fn is_connector(cell: Location) -> bool {
    (cell.row() % 2 == 1) != (cell.column() % 2 == 1)
}

fn last_odd(limit: u32) -> u32 {
    let candidate = limit.saturating_sub(2);
    if candidate % 2 == 1 {
        candidate
    } else {
        candidate.saturating_sub(1)
    }
}

fn rooms(rows: u32, columns: u32) -> impl Iterator<Item = Location> {
    let max_row = last_odd(rows);
    let max_column = last_odd(columns);
    (1..=max_row)
        .step_by(2)
        .flat_map(move |row| (1..=max_column).step_by(2).map(move |column| Location::new(row, column)))
}

fn carve(rows: u32, columns: u32, rng: &mut ChaCha8Rng) -> TileMap {
    let mut map = TileMap::filled(rows, columns, Tile::Wall);
    let all_rooms: Vec<Location> = rooms(rows, columns).collect();
    let Some(start) = all_rooms.choose(rng).copied() else {
        return map;
    };
    let max_row = last_odd(rows);
    let max_column = last_odd(columns);

    let _ = map.set(start, Tile::Empty);
    let mut stack = vec![start];
    while let Some(current) = stack.last().copied() {
        let mut options: Vec<(Location, Location)> = Direction::ALL
            .iter()
            .filter_map(|direction| {
                let between = current.offset(*direction)?;
                let next = between.offset(*direction)?;
                let inside = next.row() >= 1
                    && next.column() >= 1
                    && next.row() <= max_row
                    && next.column() <= max_column;
                (inside && map.tile(next) == Some(Tile::Wall)).then_some((between, next))
            })
            .collect();
        if options.is_empty() {
            let _ = stack.pop();
            continue;
        }
        options.shuffle(rng);
        let (between, next) = options[0];
        let _ = map.set(between, Tile::Empty);
        let _ = map.set(next, Tile::Empty);
        stack.push(next);
    }
    map
}

/// Knocks down walls separating two open rooms so the maze has cycles.
fn open_loops(map: &mut TileMap, openings: u32, rng: &mut ChaCha8Rng) {
    let mut walls: Vec<Location> = map
        .locations()
        .filter(|cell| is_connector(*cell) && map.tile(*cell) == Some(Tile::Wall))
        .filter(|cell| {
            let (first, second) = if cell.row() % 2 == 1 {
                (Direction::Left, Direction::Right)
            } else {
                (Direction::Up, Direction::Down)
            };
            [first, second].iter().all(|direction| {
                map.step(*cell, *direction)
                    .is_some_and(|side| is_room(side) && map.tile(side) == Some(Tile::Empty))
            })
        })
        .collect();
    walls.shuffle(rng);
    for cell in walls.into_iter().take(openings as usize) {
        let _ = map.set(cell, Tile::Empty);
    }
}

fn nearest_to_center(map: &TileMap) -> Option<Location> {
    let center = Location::new(map.rows() / 2, map.columns() / 2);
    rooms(map.rows(), map.columns())
        .filter(|cell| map.tile(*cell) == Some(Tile::Empty))
        .min_by_key(|cell| (cell.manhattan_distance(center), *cell))
}

fn corners(map: &TileMap) -> Vec<Location> {
    let max_row = last_odd(map.rows());
    let max_column = last_odd(map.columns());
    let mut corners = vec![
        Location::new(1, 1),
        Location::new(1, max_column),
        Location::new(max_row, 1),
        Location::new(max_row, max_column),
    ];
    corners.dedup();
    corners
}
