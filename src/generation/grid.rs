//! # Grids
//!
//! Integer positions, row-major tile grids and the bounded cell sets used to
//! describe walkable regions.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Represents a 2D tile coordinate.
///
/// # Examples
///
/// ```
/// use grotto::Position;
///
/// let pos = Position::new(10, 5);
/// assert_eq!(pos.x, 10);
/// assert_eq!(pos.y, 5);
/// assert_eq!(pos.cardinal_adjacent_positions().len(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Creates a new position with the given coordinates.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Calculates the Manhattan distance to another position.
    ///
    /// # Examples
    ///
    /// ```
    /// use grotto::Position;
    ///
    /// let pos1 = Position::new(0, 0);
    /// let pos2 = Position::new(3, 4);
    /// assert_eq!(pos1.manhattan_distance(pos2), 7);
    /// ```
    pub fn manhattan_distance(self, other: Position) -> u32 {
        ((self.x - other.x).abs() + (self.y - other.y).abs()) as u32
    }

    /// Returns only the 4 cardinal adjacent positions (no diagonals).
    pub fn cardinal_adjacent_positions(self) -> [Position; 4] {
        [
            Position::new(self.x + 1, self.y), // E
            Position::new(self.x - 1, self.y), // W
            Position::new(self.x, self.y + 1), // S
            Position::new(self.x, self.y - 1), // N
        ]
    }
}

impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Position {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Offsets of the 8 surrounding cells.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// A fixed-size, row-major grid of tile codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Copy + PartialEq> TileGrid<T> {
    /// Creates a `width` x `height` grid filled with `fill`.
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; width * height],
        }
    }

    /// Creates a `size` x `size` grid filled with `fill`.
    pub fn square(size: usize, fill: T) -> Self {
        Self::new(size, size, fill)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| y as usize * self.width + x as usize)
    }

    /// Tile at (`x`, `y`), or `None` outside the grid.
    pub fn get(&self, x: i32, y: i32) -> Option<T> {
        self.index(x, y).map(|i| self.cells[i])
    }

    pub fn get_at(&self, pos: Position) -> Option<T> {
        self.get(pos.x, pos.y)
    }

    /// Writes a tile. Returns `false` and leaves the grid untouched when the
    /// coordinates fall outside it.
    pub fn set(&mut self, x: i32, y: i32, value: T) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.cells[i] = value;
                true
            }
            None => false,
        }
    }

    pub fn set_at(&mut self, pos: Position, value: T) -> bool {
        self.set(pos.x, pos.y, value)
    }

    /// Whether the tile at (`x`, `y`) exists and equals `value`.
    pub fn is(&self, x: i32, y: i32, value: T) -> bool {
        self.get(x, y) == Some(value)
    }

    /// Sums `weight` over the 8 neighbours of (`x`, `y`) that lie inside the grid.
    pub fn weighted_neighbors<F>(&self, x: i32, y: i32, weight: F) -> usize
    where
        F: Fn(T) -> usize,
    {
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(|(dx, dy)| self.get(x + dx, y + dy))
            .map(weight)
            .sum()
    }

    /// Counts neighbours equal to any of `kinds`.
    pub fn count_neighbors(&self, x: i32, y: i32, kinds: &[T]) -> usize {
        self.weighted_neighbors(x, y, |tile| usize::from(kinds.contains(&tile)))
    }

    /// Iterates over every cell with its position, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (Position, T)> + '_ {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(i, tile)| {
            (
                Position::new((i % width) as i32, (i / width) as i32),
                *tile,
            )
        })
    }

    /// Counts cells equal to `value`.
    pub fn count(&self, value: T) -> usize {
        self.cells.iter().filter(|tile| **tile == value).count()
    }

    /// Builds a grid of the same shape by mapping every cell.
    pub fn map<U, F>(&self, f: F) -> TileGrid<U>
    where
        F: Fn(T) -> U,
    {
        TileGrid {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(|tile| f(*tile)).collect(),
        }
    }

    /// Row slices, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(self.width.max(1))
    }

    /// Copies the grid into nested row vectors for engine consumption.
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        self.rows().map(|row| row.to_vec()).collect()
    }
}

/// A set of cells inside a `size` x `size` square.
///
/// Cells are stored as integer keys and iterate in a stable order, which keeps
/// nearest-cell and random-cell queries reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSet {
    size: usize,
    cells: BTreeSet<usize>,
}

impl CellSet {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: BTreeSet::new(),
        }
    }

    /// Side of the square the set lives in.
    pub fn size(&self) -> usize {
        self.size
    }

    fn key(&self, pos: Position) -> Option<usize> {
        let size = self.size as i32;
        (pos.x >= 0 && pos.y >= 0 && pos.x < size && pos.y < size)
            .then(|| pos.x as usize * self.size + pos.y as usize)
    }

    fn position(&self, key: usize) -> Position {
        Position::new((key / self.size) as i32, (key % self.size) as i32)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.key(pos).is_some_and(|key| self.cells.contains(&key))
    }

    /// Adds a cell. Returns `false` if it was already present or lies outside the square.
    pub fn insert(&mut self, pos: Position) -> bool {
        match self.key(pos) {
            Some(key) => self.cells.insert(key),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells.iter().map(|key| self.position(*key))
    }

    /// Cell nearest to `target` by rectilinear distance. Ties go to the first
    /// cell in iteration order.
    pub fn closest(&self, target: Position) -> Option<Position> {
        let mut best: Option<(u32, Position)> = None;
        for cell in self.iter() {
            let distance = cell.manhattan_distance(target);
            if best.map_or(true, |(min, _)| distance < min) {
                best = Some((distance, cell));
            }
        }
        best.map(|(_, cell)| cell)
    }

    /// Uniformly random member of the set.
    pub fn random_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        if self.cells.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.cells.len());
        self.cells.iter().nth(index).map(|key| self.position(*key))
    }
}

impl Extend<Position> for CellSet {
    fn extend<I: IntoIterator<Item = Position>>(&mut self, iter: I) {
        for pos in iter {
            self.insert(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_grid_access() {
        let mut grid = TileGrid::new(4, 3, 0u8);
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 3);

        assert!(grid.set(3, 2, 7));
        assert!(!grid.set(4, 2, 7));
        assert!(!grid.set(-1, 0, 7));
        assert_eq!(grid.get(3, 2), Some(7));
        assert_eq!(grid.get(0, 3), None);
        assert!(grid.is(3, 2, 7));
        assert_eq!(grid.count(7), 1);
        assert_eq!(grid.to_rows()[2], vec![0, 0, 0, 7]);
    }

    #[test]
    fn test_neighbor_counting() {
        let mut grid = TileGrid::square(3, 0u8);
        grid.set(0, 0, 1);
        grid.set(1, 0, 1);
        grid.set(1, 1, 1);

        assert_eq!(grid.count_neighbors(1, 1, &[1]), 2); // excludes itself
        assert_eq!(grid.count_neighbors(0, 0, &[1]), 2);
        assert_eq!(grid.count_neighbors(2, 2, &[1]), 1);
        assert_eq!(grid.weighted_neighbors(1, 1, |t| if t == 1 { 2 } else { 0 }), 4);
    }

    #[test]
    fn test_grid_iteration_and_map() {
        let mut grid = TileGrid::new(2, 2, false);
        grid.set(1, 0, true);
        let cells: Vec<_> = grid.iter().collect();
        assert_eq!(cells[1], (Position::new(1, 0), true));

        let numbers = grid.map(u32::from);
        assert_eq!(numbers.get(1, 0), Some(1));
        assert_eq!(numbers.get(0, 1), Some(0));
    }

    #[test]
    fn test_cell_set_membership() {
        let mut set = CellSet::new(10);
        assert!(set.is_empty());
        assert!(set.insert(Position::new(3, 4)));
        assert!(!set.insert(Position::new(3, 4)));
        assert!(!set.insert(Position::new(10, 4)));
        assert!(set.contains(Position::new(3, 4)));
        assert!(!set.contains(Position::new(4, 3)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Position::new(3, 4)]);
    }

    #[test]
    fn test_cell_set_closest() {
        let mut set = CellSet::new(20);
        assert_eq!(set.closest(Position::new(0, 0)), None);

        set.extend([Position::new(2, 2), Position::new(10, 10), Position::new(15, 0)]);
        assert_eq!(set.closest(Position::new(0, 0)), Some(Position::new(2, 2)));
        assert_eq!(set.closest(Position::new(19, 0)), Some(Position::new(15, 0)));
        assert_eq!(set.closest(Position::new(9, 12)), Some(Position::new(10, 10)));
    }

    #[test]
    fn test_cell_set_random_cell() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut set = CellSet::new(8);
        assert_eq!(set.random_cell(&mut rng), None);

        set.extend((0..8).map(|i| Position::new(i, 7 - i)));
        for _ in 0..20 {
            let cell = set.random_cell(&mut rng).unwrap();
            assert!(set.contains(cell));
        }
    }
}
