//! # Road Carving
//!
//! Stitches room regions together with "drunken" corridors.
//!
//! A walker takes unit steps from one room towards the other. Each step mixes
//! the heading to the target with random jitter and a push away from nearby
//! unrelated rooms, so corridors wind around obstacles instead of cutting
//! through them. Every step paints a small footprint, giving the corridor
//! some width.

use crate::{
    draw_line, GrottoError, GrottoResult, MapGraph, Position, Road, Room, TileGrid, TileType,
    Vec2, VertexId,
};
use rand::Rng;
use std::f64::consts::PI;

/// Strength of the push away from unrelated rooms.
pub const REPULSION_STRENGTH: f64 = 250.0;

/// Boundary distances below this are clamped before computing the push.
pub const MIN_REPULSION_DISTANCE: f64 = 0.5;

/// The walk ends once it is this close to the target.
pub const ARRIVAL_DISTANCE: f64 = 0.5;

/// Within this distance the walker steps straight onto the target.
pub const SNAP_DISTANCE: f64 = 1.0;

/// Shortest jitter vector.
const MIN_JITTER: f64 = 0.01;

/// Road tiles with fewer walkable neighbours than this are pruned.
pub const MIN_ROAD_NEIGHBORS: usize = 2;

/// Step budget for a walk between two points.
pub fn step_ceiling(start: Vec2, finish: Vec2) -> usize {
    let manhattan = (finish.x - start.x).abs() + (finish.y - start.y).abs();
    8 * manhattan.ceil() as usize + 256
}

/// Calls `plot` for the footprint painted around `point` while heading along
/// `direction`: the point itself plus offsets along the left-hand
/// perpendicular of the heading.
pub fn stamp_footprint<F>(point: Vec2, direction: Vec2, plot: &mut F)
where
    F: FnMut(i32, i32),
{
    let side = direction.left_hand();
    let (dx, dy) = (side.x, side.y);
    let offsets = [
        (0.0, 0.0),
        (dx, 0.0),
        (-dx, 0.0),
        (dx, dy),
        (-dx, dy),
        (0.0, dy),
        (0.0, -dy),
        (dx, -dy),
        (-dx, -dy),
    ];
    for (ox, oy) in offsets {
        let (x, y) = (point + Vec2::new(ox, oy)).round();
        plot(x, y);
    }
}

/// Inclusive box the walker's center is kept inside.
///
/// A footprint reaches one cell past the center, so a box inset by one cell
/// from a map keeps every painted cell on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl WalkBounds {
    pub const UNBOUNDED: WalkBounds = WalkBounds {
        min: Vec2 {
            x: f64::NEG_INFINITY,
            y: f64::NEG_INFINITY,
        },
        max: Vec2 {
            x: f64::INFINITY,
            y: f64::INFINITY,
        },
    };

    /// The box `[1, width - 2] x [1, height - 2]`.
    pub fn inside_map(width: usize, height: usize) -> Self {
        Self {
            min: Vec2::new(1.0, 1.0),
            max: Vec2::new(width as f64 - 2.0, height as f64 - 2.0),
        }
    }

    pub fn clamp(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }
}

/// Walks from `start` to `finish`, painting the footprint of every step.
///
/// `repulsion` gives the push away from obstacles at a point. Jitter grows
/// with the push: its length is drawn from `[0.01, max(1, 2·|push|)]`, so the
/// walker wanders more the closer it gets to an unrelated room. The walker
/// never leaves `bounds`; both endpoints must lie inside it.
///
/// The walk always ends on `finish`: close enough it snaps onto it, and if
/// the step budget runs out the rest of the way is drawn as a straight line.
/// Consecutive centers are joined 4-wise, so the painted cells form one
/// 4-connected corridor.
///
/// Returns the point the walk ended on.
///
/// # Examples
///
/// ```
/// use grotto::{drunken_line, Alea, Vec2, WalkBounds};
///
/// let mut rng: Alea = "!rnd,1,0.1,0.2,0.3".parse().unwrap();
/// let mut painted = Vec::new();
/// let end = drunken_line(
///     Vec2::new(0.0, 0.0),
///     Vec2::new(20.0, 5.0),
///     WalkBounds::UNBOUNDED,
///     &mut rng,
///     |x, y| painted.push((x, y)),
///     |_| Vec2::ZERO,
/// );
/// assert!(end.distance(Vec2::new(20.0, 5.0)) <= 0.5);
/// assert!(painted.contains(&(20, 5)));
/// ```
pub fn drunken_line<R, D, G>(
    start: Vec2,
    finish: Vec2,
    bounds: WalkBounds,
    rng: &mut R,
    mut draw: D,
    repulsion: G,
) -> Vec2
where
    R: Rng + ?Sized,
    D: FnMut(i32, i32),
    G: Fn(Vec2) -> Vec2,
{
    let mut current = start;
    stamp_footprint(current, (finish - start).normalize(), &mut draw);

    for _ in 0..step_ceiling(start, finish) {
        let remaining = finish - current;
        let distance = remaining.length();
        if distance <= ARRIVAL_DISTANCE {
            return current;
        }
        if distance <= SNAP_DISTANCE {
            join_cells(current, finish, &mut draw);
            stamp_footprint(finish, remaining.normalize(), &mut draw);
            return finish;
        }

        let push = repulsion(current);
        let reach = (2.0 * push.length()).max(1.0);
        let jitter = Vec2::from_angle(rng.gen_range(-PI..PI)) * rng.gen_range(MIN_JITTER..=reach);
        let mut direction = (remaining.normalize() + jitter + push).normalize();
        if direction == Vec2::ZERO {
            direction = remaining.normalize();
        }
        let next = bounds.clamp(current + direction);
        join_cells(current, next, &mut draw);
        current = next;
        stamp_footprint(current, direction, &mut draw);
    }

    log::debug!(
        "drunken line from {:?} exhausted its steps, finishing straight",
        start
    );
    let heading = (finish - current).normalize();
    let (x0, y0) = current.round();
    let (x1, y1) = finish.round();
    let mut previous = current;
    draw_line(x0, y0, x1, y1, |x, y| {
        let point = Vec2::new(x as f64, y as f64);
        join_cells(previous, point, &mut draw);
        stamp_footprint(point, heading, &mut draw);
        previous = point;
    });
    join_cells(previous, finish, &mut draw);
    stamp_footprint(finish, heading, &mut draw);
    finish
}

/// Paints the corner cell between two diagonal neighbours.
fn join_cells<F>(from: Vec2, to: Vec2, plot: &mut F)
where
    F: FnMut(i32, i32),
{
    let (x0, y0) = from.round();
    let (x1, y1) = to.round();
    if x0 != x1 && y0 != y1 {
        plot(x1, y0);
    }
}

/// Push away from the nearest room circle other than the road's own two.
///
/// The magnitude falls with the square of the distance to that circle's
/// outline; the direction points away from its center.
pub fn repulsion(graph: &MapGraph, road: &Road, point: Vec2) -> Vec2 {
    let nearest = graph
        .vertex_ids()
        .filter(|id| !road.belongs(*id))
        .filter_map(|id| graph.vertex(id))
        .map(|vertex| (vertex.circle.boundary_distance(point), vertex.circle))
        .min_by(|(a, _), (b, _)| a.total_cmp(b));
    match nearest {
        Some((distance, circle)) => {
            let d = distance.max(MIN_REPULSION_DISTANCE);
            (point - circle.center()).normalize() * (REPULSION_STRENGTH / (d * d))
        }
        None => Vec2::ZERO,
    }
}

/// Carves `road` into the map between the walkable regions of its two rooms.
///
/// Walks between the region cells nearest to the road's endpoints and paints
/// road over wall cells only, leaving room floors untouched. The walk stays
/// one cell clear of the map edge.
pub fn carve_road<R: Rng + ?Sized>(
    tiles: &mut TileGrid<TileType>,
    graph: &MapGraph,
    rooms: &[Room],
    road: &Road,
    rng: &mut R,
) -> GrottoResult<()> {
    let start = endpoint_cell(rooms, road, road.from, road.start)?;
    let finish = endpoint_cell(rooms, road, road.to, road.end)?;
    let bounds = WalkBounds::inside_map(tiles.width(), tiles.height());
    let paint = |x: i32, y: i32| {
        if tiles.is(x, y, TileType::Wall) {
            tiles.set(x, y, TileType::Road);
        }
    };
    drunken_line(
        Vec2::new(start.x as f64, start.y as f64),
        Vec2::new(finish.x as f64, finish.y as f64),
        bounds,
        rng,
        paint,
        |point| repulsion(graph, road, point),
    );
    Ok(())
}

/// Walkable cell of `vertex`'s room nearest to a road endpoint, in map coordinates.
fn endpoint_cell(
    rooms: &[Room],
    road: &Road,
    vertex: VertexId,
    endpoint: Vec2,
) -> GrottoResult<Position> {
    let (x, y) = endpoint.round();
    rooms
        .iter()
        .find(|room| room.vertex == vertex)
        .and_then(|room| room.closest_walkable(Position::new(x, y)))
        .ok_or_else(|| {
            GrottoError::GenerationFailed(format!(
                "road {}-{} has no walkable cell in room {}",
                road.from.0, road.to.0, vertex.0
            ))
        })
}

/// Turns road tiles with fewer than two walkable neighbours back into wall,
/// repeating until no tile changes.
///
/// Each pass counts all 8 neighbours against the previous state of the map.
/// A pruned tile touches at most one walkable cell, so pruning never cuts a
/// 4-connected path.
pub fn prune_roads(tiles: &TileGrid<TileType>) -> TileGrid<TileType> {
    let mut current = tiles.clone();
    loop {
        let (next, pruned) = prune_pass(&current);
        if pruned == 0 {
            return next;
        }
        current = next;
    }
}

/// One double-buffered prune pass. Returns the new map and the pruned count.
fn prune_pass(tiles: &TileGrid<TileType>) -> (TileGrid<TileType>, usize) {
    let mut scratch = tiles.clone();
    let mut pruned = 0;
    for (pos, tile) in tiles.iter() {
        if tile != TileType::Road {
            continue;
        }
        let walkable = tiles.weighted_neighbors(pos.x, pos.y, |t| usize::from(t.is_walkable()));
        if walkable < MIN_ROAD_NEIGHBORS {
            scratch.set_at(pos, TileType::Wall);
            pruned += 1;
        }
    }
    (scratch, pruned)
}
