//! Weighted route planning over the maze.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, BTreeSet, BinaryHeap},
};

use maze_party_core::{Direction, Location, Tile, TileMap};

/// How doorways are costed while planning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DoorwayPolicy {
    /// Locked doorways are impassable.
    Blocked,
    /// Locked doorways cost twice their unlock cost to enter.
    Weighted,
    /// Doorways cost the same as open floor regardless of state.
    Free,
}

/// Shortest route between two cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// Total cost of the route.
    pub cost: u32,
    /// Cells visited after the start, ending at the destination.
    pub cells: Vec<Location>,
    /// Directions of each step, aligned with `cells`.
    pub directions: Vec<Direction>,
}

/// A* planner over a tile map with a Manhattan heuristic.
///
/// Every walkable tile costs one to enter. Doorways follow the configured
/// [`DoorwayPolicy`], cells in the avoid set pay a surcharge and cells in the
/// obstacle set are treated as walls.
#[derive(Clone, Debug)]
pub struct Planner<'a> {
    map: &'a TileMap,
    doorway_costs: &'a BTreeMap<Location, u32>,
    doorways: DoorwayPolicy,
    avoid: BTreeSet<Location>,
    surcharge: u32,
    obstacles: BTreeSet<Location>,
}

impl<'a> Planner<'a> {
    /// Creates a planner using the weighted doorway policy.
    #[must_use]
    pub fn new(map: &'a TileMap, doorway_costs: &'a BTreeMap<Location, u32>) -> Self {
        Self {
            map,
            doorway_costs,
            doorways: DoorwayPolicy::Weighted,
            avoid: BTreeSet::new(),
            surcharge: 0,
            obstacles: BTreeSet::new(),
        }
    }

    /// Selects how doorways are costed.
    #[must_use]
    pub fn with_doorways(mut self, policy: DoorwayPolicy) -> Self {
        self.doorways = policy;
        self
    }

    /// Adds a surcharge for entering any of the given cells.
    #[must_use]
    pub fn avoiding(mut self, cells: impl IntoIterator<Item = Location>, surcharge: u32) -> Self {
        self.avoid.extend(cells);
        self.surcharge = surcharge;
        self
    }

    /// Treats the given cells as impassable.
    #[must_use]
    pub fn with_obstacles(mut self, cells: impl IntoIterator<Item = Location>) -> Self {
        self.obstacles.extend(cells);
        self
    }

    /// Cost of stepping into the cell, or `None` when it cannot be entered.
    #[must_use]
    pub fn enter_cost(&self, location: Location) -> Option<u32> {
        if self.obstacles.contains(&location) {
            return None;
        }
        let base = match self.map.tile(location)? {
            Tile::Wall | Tile::Obstacle => return None,
            Tile::Doorway { locked: true } => match self.doorways {
                DoorwayPolicy::Blocked => return None,
                DoorwayPolicy::Weighted => self
                    .doorway_costs
                    .get(&location)
                    .copied()
                    .unwrap_or(1)
                    .max(1)
                    .saturating_mul(2),
                DoorwayPolicy::Free => 1,
            },
            _ => 1,
        };
        if self.avoid.contains(&location) {
            Some(base.saturating_add(self.surcharge))
        } else {
            Some(base)
        }
    }

    /// Finds the cheapest route between two cells.
    #[must_use]
    pub fn route(&self, from: Location, to: Location) -> Option<Route> {
        if !self.map.is_in_bounds(from) || !self.map.is_in_bounds(to) {
            return None;
        }
        if from == to {
            return Some(Route {
                cost: 0,
                cells: Vec::new(),
                directions: Vec::new(),
            });
        }

        let mut open = BinaryHeap::new();
        let mut best: BTreeMap<Location, u32> = BTreeMap::new();
        let mut came_from: BTreeMap<Location, (Location, Direction)> = BTreeMap::new();

        let _ = best.insert(from, 0);
        open.push(Reverse((from.manhattan_distance(to), 0_u32, from)));

        while let Some(Reverse((_, cost, current))) = open.pop() {
            if current == to {
                return Some(reconstruct(from, to, cost, &came_from));
            }
            if best.get(&current).is_some_and(|known| cost > *known) {
                continue;
            }

            for direction in Direction::ALL {
                let Some(next) = self.map.step(current, direction) else {
                    continue;
                };
                let Some(step) = self.enter_cost(next) else {
                    continue;
                };
                let candidate = cost.saturating_add(step);
                if best.get(&next).is_some_and(|known| candidate >= *known) {
                    continue;
                }
                let _ = best.insert(next, candidate);
                let _ = came_from.insert(next, (current, direction));
                open.push(Reverse((
                    candidate.saturating_add(next.manhattan_distance(to)),
                    candidate,
                    next,
                )));
            }
        }

        None
    }

    /// Cost of the cheapest route, if one exists.
    #[must_use]
    pub fn distance(&self, from: Location, to: Location) -> Option<u32> {
        self.route(from, to).map(|route| route.cost)
    }

    /// Ratio of the cheapest to the most expensive route from the starts.
    ///
    /// Returns `None` when any start cannot reach the destination.
    #[must_use]
    pub fn fairness(&self, starts: &[Location], to: Location) -> Option<f64> {
        let costs = starts
            .iter()
            .map(|start| self.distance(*start, to))
            .collect::<Option<Vec<u32>>>()?;
        let max = costs.iter().copied().max()?;
        let min = costs.iter().copied().min()?;
        if max == 0 {
            return Some(1.0);
        }
        Some(f64::from(min) / f64::from(max))
    }
}

fn reconstruct(
    from: Location,
    to: Location,
    cost: u32,
    came_from: &BTreeMap<Location, (Location, Direction)>,
) -> Route {
    let mut cells = Vec::new();
    let mut directions = Vec::new();
    let mut current = to;
    while current != from {
        let Some(&(previous, direction)) = came_from.get(&current) else {
            break;
        };
        cells.push(current);
        directions.push(direction);
        current = previous;
    }
    cells.reverse();
    directions.reverse();
    Route {
        cost,
        cells,
        directions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(lines: &[&str]) -> TileMap {
        TileMap::from_ascii(lines).expect("valid layout")
    }

    #[test]
    fn open_floor_routes_follow_manhattan_distance() {
        let map = map(&["....", "....", "...."]);
        let costs = BTreeMap::new();
        let route = Planner::new(&map, &costs)
            .route(Location::new(0, 0), Location::new(2, 3))
            .expect("route exists");
        assert_eq!(route.cost, 5);
        assert_eq!(route.cells.len(), 5);
        assert_eq!(route.cells.last(), Some(&Location::new(2, 3)));
    }

    #[test]
    fn walls_and_obstacles_force_detours() {
        let map = map(&["...", "#X.", "..."]);
        let costs = BTreeMap::new();
        let planner = Planner::new(&map, &costs);
        assert_eq!(planner.distance(Location::new(0, 0), Location::new(2, 0)), Some(6));
        let sealed = planner.with_obstacles([Location::new(1, 2)]);
        assert_eq!(sealed.distance(Location::new(0, 0), Location::new(2, 0)), None);
    }

    #[test]
    fn doorway_policy_controls_locked_doorways() {
        let map = map(&[".+."]);
        let mut costs = BTreeMap::new();
        let _ = costs.insert(Location::new(0, 1), 4);
        let from = Location::new(0, 0);
        let to = Location::new(0, 2);

        let planner = Planner::new(&map, &costs);
        assert_eq!(planner.distance(from, to), Some(9));
        let blocked = Planner::new(&map, &costs).with_doorways(DoorwayPolicy::Blocked);
        assert_eq!(blocked.distance(from, to), None);
        let free = Planner::new(&map, &costs).with_doorways(DoorwayPolicy::Free);
        assert_eq!(free.distance(from, to), Some(2));
    }

    #[test]
    fn occupied_cells_are_surcharged_not_blocked() {
        let map = map(&["...", "..."]);
        let costs = BTreeMap::new();
        let planner = Planner::new(&map, &costs).avoiding([Location::new(0, 1)], 3);
        let route = planner
            .route(Location::new(0, 0), Location::new(0, 2))
            .expect("route exists");
        assert_eq!(route.cost, 4, "detour through the second row is cheaper");
        assert!(!route.cells.contains(&Location::new(0, 1)));
    }

    #[test]
    fn fairness_compares_best_and_worst_starts() {
        let map = map(&["....."]);
        let costs = BTreeMap::new();
        let planner = Planner::new(&map, &costs);
        let fairness = planner
            .fairness(&[Location::new(0, 0), Location::new(0, 3)], Location::new(0, 4))
            .expect("all starts reach");
        assert!((fairness - 0.25).abs() < 1e-9);
    }
}
