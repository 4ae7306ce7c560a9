use serde::{Deserialize, Serialize};

use crate::{Direction, Location};

/// Contents of a single maze cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tile {
    /// Open floor.
    Empty,
    /// Solid wall.
    Wall,
    /// Doorway that costs points to pass while locked.
    Doorway {
        /// Whether the doorway currently blocks plain movement.
        locked: bool,
    },
    /// Chest holding a random item for the first agent to step in.
    Chest,
    /// Hazard nobody has noticed yet.
    HiddenHazard,
    /// Hazard that has been revealed and will trigger on anyone ending there.
    RevealedHazard,
    /// Impassable obstacle placed by an agent.
    Obstacle,
    /// Collectible worth a handful of points.
    Collectible,
}

impl Tile {
    /// Reports whether an agent may stand on the tile.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        match self {
            Tile::Empty
            | Tile::Doorway { locked: false }
            | Tile::Chest
            | Tile::HiddenHazard
            | Tile::RevealedHazard
            | Tile::Collectible => true,
            Tile::Wall | Tile::Doorway { locked: true } | Tile::Obstacle => false,
        }
    }

    /// Reports whether the tile is a doorway in either state.
    #[must_use]
    pub const fn is_doorway(self) -> bool {
        matches!(self, Tile::Doorway { .. })
    }

    /// Reports whether the tile holds a hazard in either state.
    #[must_use]
    pub const fn is_hazard(self) -> bool {
        matches!(self, Tile::HiddenHazard | Tile::RevealedHazard)
    }

    /// Reports whether an item may be placed onto the tile.
    #[must_use]
    pub const fn accepts_placement(self) -> bool {
        matches!(self, Tile::Empty | Tile::HiddenHazard)
    }

    /// Glyph used by ASCII layouts; hidden hazards use `h`.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Tile::Empty => '.',
            Tile::Wall => '#',
            Tile::Doorway { locked: true } => '+',
            Tile::Doorway { locked: false } => '/',
            Tile::Chest => '$',
            Tile::HiddenHazard => 'h',
            Tile::RevealedHazard => '^',
            Tile::Obstacle => 'X',
            Tile::Collectible => '*',
        }
    }

    /// Inverse of [`Tile::glyph`].
    #[must_use]
    pub const fn from_glyph(glyph: char) -> Option<Self> {
        Some(match glyph {
            '.' => Tile::Empty,
            '#' => Tile::Wall,
            '+' => Tile::Doorway { locked: true },
            '/' => Tile::Doorway { locked: false },
            '$' => Tile::Chest,
            'h' => Tile::HiddenHazard,
            '^' => Tile::RevealedHazard,
            'X' => Tile::Obstacle,
            '*' => Tile::Collectible,
            _ => return None,
        })
    }
}

/// Rectangular grid of tiles stored in row-major order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMap {
    rows: u32,
    columns: u32,
    tiles: Vec<Tile>,
}

impl TileMap {
    /// Creates a map where every cell holds the same tile.
    #[must_use]
    pub fn filled(rows: u32, columns: u32, tile: Tile) -> Self {
        let len = rows as usize * columns as usize;
        Self {
            rows,
            columns,
            tiles: vec![tile; len],
        }
    }

    /// Builds a map from ASCII rows using [`Tile::from_glyph`].
    ///
    /// Returns `None` when the rows are ragged or contain unknown glyphs.
    #[must_use]
    pub fn from_ascii(lines: &[&str]) -> Option<Self> {
        let rows = u32::try_from(lines.len()).ok()?;
        let columns = lines.first().map_or(0, |line| line.chars().count());
        let mut tiles = Vec::with_capacity(lines.len() * columns);
        for line in lines {
            if line.chars().count() != columns {
                return None;
            }
            for glyph in line.chars() {
                tiles.push(Tile::from_glyph(glyph)?);
            }
        }
        Some(Self {
            rows,
            columns: u32::try_from(columns).ok()?,
            tiles,
        })
    }

    /// Number of rows in the map.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns in the map.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Reports whether the location lies inside the map.
    #[must_use]
    pub fn is_in_bounds(&self, location: Location) -> bool {
        location.row() < self.rows && location.column() < self.columns
    }

    /// Tile at the location, or `None` outside the map.
    #[must_use]
    pub fn tile(&self, location: Location) -> Option<Tile> {
        self.index(location)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// Overwrites the tile at the location. Returns `false` outside the map.
    pub fn set(&mut self, location: Location, tile: Tile) -> bool {
        match self.index(location).and_then(|index| self.tiles.get_mut(index)) {
            Some(slot) => {
                *slot = tile;
                true
            }
            None => false,
        }
    }

    /// Reports whether an agent may stand at the location.
    #[must_use]
    pub fn is_walkable(&self, location: Location) -> bool {
        self.tile(location).is_some_and(Tile::is_walkable)
    }

    /// Neighbouring location in the given direction if it is inside the map.
    #[must_use]
    pub fn step(&self, location: Location, direction: Direction) -> Option<Location> {
        location
            .offset(direction)
            .filter(|next| self.is_in_bounds(*next))
    }

    /// In-bounds orthogonal neighbours of the location.
    pub fn neighbors(&self, location: Location) -> impl Iterator<Item = Location> {
        let candidates = Direction::ALL.map(|direction| self.step(location, direction));
        candidates.into_iter().flatten()
    }

    /// Orthogonal neighbours holding a doorway, optionally filtered by lock
    /// state.
    #[must_use]
    pub fn adjacent_doorways(&self, location: Location, locked: Option<bool>) -> Vec<Location> {
        self.neighbors(location)
            .filter(|cell| match self.tile(*cell) {
                Some(Tile::Doorway { locked: state }) => locked.map_or(true, |wanted| wanted == state),
                _ => false,
            })
            .collect()
    }

    /// In-bounds cells of the 3x3 block around the location, excluding it.
    #[must_use]
    pub fn surrounding(&self, location: Location) -> Vec<Location> {
        let mut cells = Vec::with_capacity(8);
        for row_delta in -1_i64..=1 {
            for column_delta in -1_i64..=1 {
                if row_delta == 0 && column_delta == 0 {
                    continue;
                }
                let row = i64::from(location.row()) + row_delta;
                let column = i64::from(location.column()) + column_delta;
                if let (Ok(row), Ok(column)) = (u32::try_from(row), u32::try_from(column)) {
                    let candidate = Location::new(row, column);
                    if self.is_in_bounds(candidate) {
                        cells.push(candidate);
                    }
                }
            }
        }
        cells
    }

    /// Every location in row-major order.
    pub fn locations(&self) -> impl Iterator<Item = Location> {
        let (rows, columns) = (self.rows, self.columns);
        (0..rows).flat_map(move |row| (0..columns).map(move |column| Location::new(row, column)))
    }

    /// Number of cells that satisfy the predicate.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(Tile) -> bool) -> usize {
        self.tiles.iter().filter(|tile| predicate(**tile)).count()
    }

    fn index(&self, location: Location) -> Option<usize> {
        if !self.is_in_bounds(location) {
            return None;
        }
        Some(location.row() as usize * self.columns as usize + location.column() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_layouts_round_trip_through_glyphs() {
        let map = TileMap::from_ascii(&["#.+", "/$h", "^X*"]).expect("valid layout");
        assert_eq!(map.rows(), 3);
        assert_eq!(map.columns(), 3);
        assert_eq!(map.tile(Location::new(0, 2)), Some(Tile::Doorway { locked: true }));
        assert_eq!(map.tile(Location::new(1, 2)), Some(Tile::HiddenHazard));
        assert_eq!(map.tile(Location::new(2, 1)), Some(Tile::Obstacle));
        assert!(TileMap::from_ascii(&["..", "."]).is_none());
        assert!(TileMap::from_ascii(&[".?"]).is_none());
    }

    #[test]
    fn walkability_follows_tile_kind() {
        assert!(Tile::Empty.is_walkable());
        assert!(Tile::Doorway { locked: false }.is_walkable());
        assert!(Tile::RevealedHazard.is_walkable());
        assert!(!Tile::Doorway { locked: true }.is_walkable());
        assert!(!Tile::Obstacle.is_walkable());
        assert!(!Tile::Wall.is_walkable());
    }

    #[test]
    fn neighbors_are_clipped_to_bounds() {
        let map = TileMap::filled(3, 3, Tile::Empty);
        let corner: Vec<_> = map.neighbors(Location::new(0, 0)).collect();
        assert_eq!(corner, vec![Location::new(1, 0), Location::new(0, 1)]);
        assert_eq!(map.neighbors(Location::new(1, 1)).count(), 4);
        assert_eq!(map.surrounding(Location::new(0, 0)).len(), 3);
        assert_eq!(map.surrounding(Location::new(1, 1)).len(), 8);
    }

    #[test]
    fn out_of_bounds_writes_are_refused() {
        let mut map = TileMap::filled(2, 2, Tile::Empty);
        assert!(!map.set(Location::new(2, 0), Tile::Wall));
        assert!(map.set(Location::new(1, 1), Tile::Wall));
        assert_eq!(map.count(|tile| tile == Tile::Wall), 1);
        assert_eq!(map.locations().count(), 4);
    }
}
