//! # Room Carving
//!
//! Grows an organic cave inside one room circle with a cellular automaton.
//!
//! The carver works in room-local coordinates on a (2r+1)×(2r+1) square:
//! 1. Everything starts as floor, with a boundary ring at radius r
//! 2. Rock seeds are scattered inside 0.9r
//! 3. Protected "input" corridors run from a crossroads anchor to every road entry
//! 4. The automaton lets rock clusters grow while lone rocks erode away

use crate::{
    draw_line, fill_circle, CaveTile, GrottoError, GrottoResult, MapGraph, Position, TileGrid,
    VertexId,
};
use rand::Rng;

/// Weight of an input tile when the carving automaton counts rock neighbours.
pub const CARVE_INPUT_WEIGHT: usize = 1;

/// Rock with a neighbour count inside this range stays rock.
const ROCK_SURVIVAL: std::ops::RangeInclusive<usize> = 3..=6;

/// Floor with more rock neighbours than this turns to rock.
const FLOOR_TO_ROCK_ABOVE: usize = 2;

/// Raw carving output for one room.
#[derive(Debug, Clone, PartialEq)]
pub struct CarvedRoom {
    pub vertex: VertexId,
    /// Radius of the room circle, also the local center coordinate
    pub radius: i32,
    /// Map position of the local (0, 0) cell
    pub origin: Position,
    pub tiles: TileGrid<CaveTile>,
    /// Anchor every input corridor starts from (local coordinates)
    pub crossroads: Position,
    /// Road entry points on the outline (local coordinates)
    pub roads: Vec<Position>,
}

/// Cellular-automaton cave carver.
#[derive(Debug, Clone)]
pub struct RoomCarver {
    /// Rocks are scattered inside this fraction of the radius
    pub scatter_radius_factor: f64,
    /// Fewest rocks per scanline, as a fraction of its width
    pub min_scatter_density: f64,
    /// Most rocks per scanline, as a fraction of its width
    pub max_scatter_density: f64,
    /// Automaton iterations per started 100 cells of radius
    pub iterations_per_hundred: u32,
}

impl Default for RoomCarver {
    fn default() -> Self {
        Self {
            scatter_radius_factor: 0.9,
            min_scatter_density: 0.01,
            max_scatter_density: 0.25,
            iterations_per_hundred: 15,
        }
    }
}

impl RoomCarver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of automaton iterations for a room of radius `radius`.
    pub fn iterations(&self, radius: i32) -> u32 {
        let hundreds = (radius as u32).div_ceil(100).max(1);
        self.iterations_per_hundred * hundreds
    }

    /// Carves the raw cave of `vertex`.
    pub fn carve<R: Rng>(
        &self,
        graph: &MapGraph,
        vertex: VertexId,
        rng: &mut R,
    ) -> GrottoResult<CarvedRoom> {
        let site = graph.vertex(vertex).ok_or_else(|| {
            GrottoError::GenerationFailed(format!("unknown vertex {}", vertex.0))
        })?;
        let r = site.radius();
        let size = (2 * r + 1) as usize;
        let mut tiles = TileGrid::square(size, CaveTile::Floor);

        fill_circle(r, r, r, |x1, x2, y| {
            tiles.set(x1, y, CaveTile::Board);
            tiles.set(x2, y, CaveTile::Board);
        });
        self.scatter_rocks(&mut tiles, r, rng);

        let origin = Position::new(site.circle.left(), site.circle.top());
        let roads: Vec<Position> = graph
            .roads_of(vertex)
            .filter_map(|road| road.endpoint_for(vertex))
            .map(|point| {
                let (x, y) = point.round();
                Position::new(
                    (x - origin.x).clamp(0, 2 * r),
                    (y - origin.y).clamp(0, 2 * r),
                )
            })
            .collect();

        let crossroads = self.crossroads(r, &roads, rng);
        for &entry in &roads {
            tiles.set_at(entry, CaveTile::Input);
            draw_line(crossroads.x, crossroads.y, entry.x, entry.y, |x, y| {
                tiles.set(x, y, CaveTile::Input);
            });
        }

        let tiles = grow_caves(tiles, self.iterations(r));
        Ok(CarvedRoom {
            vertex,
            radius: r,
            origin,
            tiles,
            crossroads,
            roads,
        })
    }

    /// Sprinkles rock seeds on every scanline of the inner circle.
    fn scatter_rocks<R: Rng>(&self, tiles: &mut TileGrid<CaveTile>, r: i32, rng: &mut R) {
        let inner = (r as f64 * self.scatter_radius_factor) as i32;
        fill_circle(r, r, inner, |x1, x2, y| {
            let width = (x2 - x1) as f64;
            let fewest = (width * self.min_scatter_density) as usize;
            let most = ((width * self.max_scatter_density) as usize).max(fewest);
            let count = rng.gen_range(fewest..=most);
            for _ in 0..count {
                tiles.set(rng.gen_range(x1..=x2), y, CaveTile::Rock);
            }
        });
    }

    /// Averages a random seed point with all road entries, then mirrors the
    /// result through the room center so the corridors fan in from the side
    /// facing away from the roads.
    fn crossroads<R: Rng>(&self, r: i32, roads: &[Position], rng: &mut R) -> Position {
        let seed = Position::new(rng.gen_range(2..=r - 2), rng.gen_range(2..=r - 2));
        let sum = roads.iter().fold(seed, |acc, p| acc + *p);
        let n = roads.len() as i32 + 1;
        let mean = Position::new(sum.x / n, sum.y / n);
        Position::new(2 * r - mean.x, 2 * r - mean.y)
    }
}

/// Runs the carving automaton, computing each generation into a scratch grid
/// and swapping.
///
/// Rock survives with 3 to 6 rock-or-input neighbours and otherwise crumbles
/// to floor; floor with more than 2 such neighbours turns to rock. Board and
/// input cells never change.
pub fn grow_caves(tiles: TileGrid<CaveTile>, iterations: u32) -> TileGrid<CaveTile> {
    let weight = |tile: CaveTile| match tile {
        CaveTile::Rock => 1,
        CaveTile::Input => CARVE_INPUT_WEIGHT,
        _ => 0,
    };
    let mut current = tiles;
    let mut scratch = current.clone();
    for _ in 0..iterations {
        for (pos, tile) in current.iter() {
            let next = match tile {
                CaveTile::Rock | CaveTile::Floor => {
                    let rocks = current.weighted_neighbors(pos.x, pos.y, weight);
                    match tile {
                        CaveTile::Rock if !ROCK_SURVIVAL.contains(&rocks) => CaveTile::Floor,
                        CaveTile::Floor if rocks > FLOOR_TO_ROCK_ABOVE => CaveTile::Rock,
                        _ => tile,
                    }
                }
                other => other,
            };
            scratch.set_at(pos, next);
        }
        std::mem::swap(&mut current, &mut scratch);
    }
    current
}
