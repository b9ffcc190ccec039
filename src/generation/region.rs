//! # Region Post-Processing
//!
//! Turns a freshly carved cave into a room with exactly one walkable region.
//!
//! Four erosion passes smooth the automaton output and dissolve the input
//! corridors into ordinary floor or rock. A flood fill then keeps the largest
//! floor region and fills every other one with rock. Finally, small rock
//! pockets enclosed by the region are reclaimed as floor.

use crate::{fill_circle, CarvedRoom, CaveTile, CellSet, Position, TileGrid, TileType, VertexId};
use pathfinding::prelude::bfs_reach;
use rand::Rng;

/// Largest enclosed rock pocket that is reclaimed as floor.
pub const MAX_POCKET_SIZE: usize = 8;

/// Rock-neighbour count condition under which a cell becomes floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    Above(usize),
    Below(usize),
}

impl Threshold {
    pub fn holds(self, count: usize) -> bool {
        match self {
            Threshold::Above(limit) => count > limit,
            Threshold::Below(limit) => count < limit,
        }
    }
}

/// One erosion rule.
///
/// Every candidate cell counts its rock neighbours and becomes floor when
/// `to_floor` holds, rock otherwise. Other cells are copied unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErosionPass {
    pub candidates: &'static [CaveTile],
    /// Weight of an input neighbour in the rock count
    pub input_weight: usize,
    pub to_floor: Threshold,
}

/// The erosion passes, in the order they run.
pub const EROSION_PASSES: [ErosionPass; 4] = [
    // Opens narrow gaps between rock clusters
    ErosionPass {
        candidates: &[CaveTile::Rock, CaveTile::Floor],
        input_weight: 0,
        to_floor: Threshold::Above(4),
    },
    // Resolves input corridors into floor or rock
    ErosionPass {
        candidates: &[CaveTile::Rock, CaveTile::Floor, CaveTile::Input],
        input_weight: 0,
        to_floor: Threshold::Above(6),
    },
    // Keeps rock only where it is almost fully surrounded
    ErosionPass {
        candidates: &[CaveTile::Rock, CaveTile::Floor],
        input_weight: 0,
        to_floor: Threshold::Below(7),
    },
    ErosionPass {
        candidates: &[CaveTile::Rock, CaveTile::Floor],
        input_weight: 0,
        to_floor: Threshold::Above(4),
    },
];

/// Applies one erosion pass, computing the result into a fresh grid.
pub fn erode(tiles: &TileGrid<CaveTile>, pass: &ErosionPass) -> TileGrid<CaveTile> {
    let weight = |tile: CaveTile| match tile {
        CaveTile::Rock => 1,
        CaveTile::Input => pass.input_weight,
        _ => 0,
    };
    let mut scratch = tiles.clone();
    for (pos, tile) in tiles.iter() {
        if !pass.candidates.contains(&tile) {
            continue;
        }
        let rocks = tiles.weighted_neighbors(pos.x, pos.y, weight);
        let next = if pass.to_floor.holds(rocks) {
            CaveTile::Floor
        } else {
            CaveTile::Rock
        };
        scratch.set_at(pos, next);
    }
    scratch
}

/// Connected regions of one tile kind, split by whether they touch a flag tile.
#[derive(Debug, Clone, Default)]
pub struct Components {
    pub plain: Vec<CellSet>,
    pub flagged: Vec<CellSet>,
}

/// Finds the 4-connected regions of `kind` inside the circle inscribed in a
/// square room grid.
///
/// Regions with a cell next to a `flag` tile are reported separately.
/// Regions larger than `max_size` are dropped. Cells outside the circle are
/// never entered.
pub fn find_components(
    tiles: &TileGrid<CaveTile>,
    kind: CaveTile,
    flag: Option<CaveTile>,
    max_size: Option<usize>,
) -> Components {
    let size = tiles.width();
    let r = (size as i32 - 1) / 2;
    let inside = |pos: Position| {
        let (dx, dy) = (pos.x - r, pos.y - r);
        dx * dx + dy * dy <= r * r
    };
    let limit = max_size.map_or(usize::MAX, |max| max + 1);

    let mut starts = Vec::new();
    fill_circle(r, r, r, |x1, x2, y| {
        starts.extend((x1 + 1..x2).map(|x| Position::new(x, y)));
    });

    let mut seen = TileGrid::square(size, false);
    let mut components = Components::default();
    for start in starts {
        if tiles.get_at(start) != Some(kind) || seen.get_at(start) != Some(false) {
            continue;
        }
        let mut touches_flag = false;
        let cells: Vec<Position> = bfs_reach(start, |pos: &Position| {
            let mut next = Vec::with_capacity(4);
            for neighbor in pos.cardinal_adjacent_positions() {
                match tiles.get_at(neighbor) {
                    Some(tile) if Some(tile) == flag => touches_flag = true,
                    Some(tile) if tile == kind && inside(neighbor) => next.push(neighbor),
                    _ => {}
                }
            }
            next
        })
        .take(limit)
        .collect();

        for cell in &cells {
            seen.set_at(*cell, true);
        }
        if cells.len() >= limit {
            continue;
        }
        let mut component = CellSet::new(size);
        component.extend(cells);
        if touches_flag {
            components.flagged.push(component);
        } else {
            components.plain.push(component);
        }
    }
    components
}

/// A finished room: cleaned tiles plus its single walkable region.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub vertex: VertexId,
    pub radius: i32,
    /// Map position of the local (0, 0) cell
    pub origin: Position,
    pub tiles: TileGrid<CaveTile>,
    pub crossroads: Position,
    pub roads: Vec<Position>,
    /// The walkable region, in local coordinates
    pub empty_space: CellSet,
    /// Carving attempts it took to produce this room
    pub attempts: u32,
    /// Floor kind painted into the map, once chosen
    pub biome: Option<TileType>,
}

impl Room {
    pub fn to_global(&self, local: Position) -> Position {
        local + self.origin
    }

    pub fn to_local(&self, global: Position) -> Position {
        global - self.origin
    }

    /// Walkable cells in map coordinates.
    pub fn walkable_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.empty_space.iter().map(move |cell| self.to_global(cell))
    }

    /// Whether the map cell `global` belongs to the walkable region.
    pub fn contains(&self, global: Position) -> bool {
        self.empty_space.contains(self.to_local(global))
    }

    /// Walkable cell nearest to the map cell `global`, in map coordinates.
    pub fn closest_walkable(&self, global: Position) -> Option<Position> {
        self.empty_space
            .closest(self.to_local(global))
            .map(|cell| self.to_global(cell))
    }

    /// Uniformly random walkable cell, in map coordinates.
    pub fn random_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        self.empty_space
            .random_cell(rng)
            .map(|cell| self.to_global(cell))
    }
}

/// Erosion and region selection for carved rooms.
#[derive(Debug, Clone)]
pub struct RegionProcessor {
    /// Skip reclaiming enclosed rock pockets
    pub fast_mode: bool,
    pub max_pocket_size: usize,
}

impl RegionProcessor {
    pub fn new(fast_mode: bool) -> Self {
        Self {
            fast_mode,
            max_pocket_size: MAX_POCKET_SIZE,
        }
    }

    /// Erodes a carved room and reduces it to one walkable region.
    pub fn process(&self, carved: CarvedRoom, attempts: u32) -> Room {
        let mut tiles = EROSION_PASSES
            .iter()
            .fold(carved.tiles, |tiles, pass| erode(&tiles, pass));
        let empty_space = self.isolate(&mut tiles);
        Room {
            vertex: carved.vertex,
            radius: carved.radius,
            origin: carved.origin,
            tiles,
            crossroads: carved.crossroads,
            roads: carved.roads,
            empty_space,
            attempts,
            biome: None,
        }
    }

    /// Keeps the largest floor region and fills the others with rock, then
    /// reclaims small rock pockets it encloses. Returns the region.
    pub fn isolate(&self, tiles: &mut TileGrid<CaveTile>) -> CellSet {
        let regions = find_components(tiles, CaveTile::Floor, None, None).plain;
        let Some(largest) = regions
            .iter()
            .enumerate()
            .max_by_key(|(_, region)| region.len())
            .map(|(index, _)| index)
        else {
            return CellSet::new(tiles.width());
        };

        let mut empty_space = CellSet::new(tiles.width());
        for (index, region) in regions.into_iter().enumerate() {
            if index == largest {
                empty_space = region;
            } else {
                for cell in region.iter() {
                    tiles.set_at(cell, CaveTile::Rock);
                }
            }
        }

        if !self.fast_mode {
            let pockets = find_components(
                tiles,
                CaveTile::Rock,
                Some(CaveTile::Board),
                Some(self.max_pocket_size),
            )
            .plain;
            for pocket in pockets {
                let enclosed = pocket.iter().any(|cell| {
                    cell.cardinal_adjacent_positions()
                        .iter()
                        .any(|n| empty_space.contains(*n))
                });
                if !enclosed {
                    continue;
                }
                for cell in pocket.iter() {
                    tiles.set_at(cell, CaveTile::Floor);
                    empty_space.insert(cell);
                }
            }
        }
        empty_space
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Alea, Circle, MapGraph, Road, RoomCarver, Vec2};
    use std::collections::HashSet;

    fn ringed_room(r: i32) -> TileGrid<CaveTile> {
        let mut tiles = TileGrid::square((2 * r + 1) as usize, CaveTile::Floor);
        fill_circle(r, r, r, |x1, x2, y| {
            tiles.set(x1, y, CaveTile::Board);
            tiles.set(x2, y, CaveTile::Board);
        });
        tiles
    }

    fn is_connected(cells: &CellSet) -> bool {
        let Some(start) = cells.iter().next() else {
            return true;
        };
        let reached: HashSet<Position> = bfs_reach(start, |pos: &Position| {
            pos.cardinal_adjacent_positions()
                .into_iter()
                .filter(|n| cells.contains(*n))
                .collect::<Vec<_>>()
        })
        .collect();
        reached.len() == cells.len()
    }

    #[test]
    fn test_thresholds() {
        assert!(Threshold::Above(4).holds(5));
        assert!(!Threshold::Above(4).holds(4));
        assert!(Threshold::Below(7).holds(6));
        assert!(!Threshold::Below(7).holds(7));
    }

    #[test]
    fn test_erosion_pass_rewrites_candidates_only() {
        let mut tiles = TileGrid::square(3, CaveTile::Rock);
        tiles.set(0, 0, CaveTile::Board);
        tiles.set(1, 0, CaveTile::Input);

        let first = erode(&tiles, &EROSION_PASSES[0]);
        // The center sees 6 rocks: the board and input neighbours do not count
        assert_eq!(first.get(1, 1), Some(CaveTile::Floor));
        // A corner sees at most 3 neighbours, so it stays rock
        assert_eq!(first.get(2, 2), Some(CaveTile::Rock));
        assert_eq!(first.get(0, 0), Some(CaveTile::Board));
        assert_eq!(first.get(1, 0), Some(CaveTile::Input));

        let second = erode(&tiles, &EROSION_PASSES[1]);
        // Input is a candidate in the second pass and has only 4 rock neighbours
        assert_eq!(second.get(1, 0), Some(CaveTile::Rock));
        assert_eq!(second.get(1, 1), Some(CaveTile::Rock));
    }

    #[test]
    fn test_components_split_by_flag() {
        let mut tiles = ringed_room(6);
        for y in 0..13 {
            if tiles.is(6, y, CaveTile::Floor) {
                tiles.set(6, y, CaveTile::Rock);
            }
        }

        let floors = find_components(&tiles, CaveTile::Floor, None, None);
        assert_eq!(floors.plain.len(), 2);
        assert!(floors.flagged.is_empty());
        assert!(floors.plain.iter().all(is_connected));

        let flagged = find_components(&tiles, CaveTile::Floor, Some(CaveTile::Board), None);
        assert_eq!(flagged.flagged.len(), 2);

        let capped = find_components(&tiles, CaveTile::Rock, Some(CaveTile::Board), Some(3));
        assert!(capped.plain.is_empty());
        assert!(capped.flagged.is_empty());
    }

    #[test]
    fn test_components_stay_inside_circle() {
        let tiles = ringed_room(8);
        let floors = find_components(&tiles, CaveTile::Floor, None, None);
        assert_eq!(floors.plain.len(), 1);
        // The floor corners outside the ring are never reached
        assert!(!floors.plain[0].contains(Position::new(0, 0)));
        assert!(floors.plain[0].contains(Position::new(8, 8)));
    }

    fn split_room() -> TileGrid<CaveTile> {
        let mut tiles = ringed_room(6);
        for y in 0..13 {
            if tiles.is(2, y, CaveTile::Floor) {
                tiles.set(2, y, CaveTile::Rock);
            }
        }
        tiles.set(8, 6, CaveTile::Rock);
        tiles.set(9, 6, CaveTile::Rock);
        tiles
    }

    #[test]
    fn test_isolate_keeps_largest_region() {
        let mut tiles = split_room();
        let empty_space = RegionProcessor::new(false).isolate(&mut tiles);

        assert_eq!(tiles.get(1, 6), Some(CaveTile::Rock));
        assert!(!empty_space.contains(Position::new(1, 6)));
        assert!(empty_space.contains(Position::new(6, 6)));
        // The enclosed pocket is reclaimed
        assert_eq!(tiles.get(8, 6), Some(CaveTile::Floor));
        assert!(empty_space.contains(Position::new(9, 6)));
        // The dividing wall touches the ring and stays
        assert_eq!(tiles.get(2, 6), Some(CaveTile::Rock));

        assert!(is_connected(&empty_space));
        assert!(empty_space.iter().all(|cell| tiles.is(cell.x, cell.y, CaveTile::Floor)));
    }

    #[test]
    fn test_fast_mode_skips_pockets() {
        let mut tiles = split_room();
        let empty_space = RegionProcessor::new(true).isolate(&mut tiles);
        assert_eq!(tiles.get(8, 6), Some(CaveTile::Rock));
        assert!(!empty_space.contains(Position::new(8, 6)));
        assert!(is_connected(&empty_space));
    }

    #[test]
    fn test_isolate_without_floor() {
        let mut tiles = TileGrid::square(9, CaveTile::Rock);
        let empty_space = RegionProcessor::new(false).isolate(&mut tiles);
        assert!(empty_space.is_empty());
    }

    #[test]
    fn test_processed_room_has_single_region() {
        let mut graph = MapGraph::new();
        let a = graph.add_vertex(Circle::new(40, 40, 25));
        let b = graph.add_vertex(Circle::new(120, 40, 20));
        graph
            .add_road(Road {
                from: a,
                to: b,
                start: Vec2::new(65.0, 40.0),
                end: Vec2::new(100.0, 40.0),
            })
            .unwrap();
        let mut rng: Alea = "!rnd,1,0.1,0.2,0.3".parse().unwrap();
        let carved = RoomCarver::new().carve(&graph, a, &mut rng).unwrap();
        let room = RegionProcessor::new(false).process(carved, 1);

        assert_eq!(room.attempts, 1);
        assert_eq!(room.tiles.count(CaveTile::Input), 0);
        assert!(!room.empty_space.is_empty());
        assert!(is_connected(&room.empty_space));
        assert!(room
            .empty_space
            .iter()
            .all(|cell| room.tiles.is(cell.x, cell.y, CaveTile::Floor)));

        let cell = room.walkable_cells().next().unwrap();
        assert!(room.contains(cell));
        assert_eq!(room.closest_walkable(cell), Some(cell));
    }
}
