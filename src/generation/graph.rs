//! # Map Graph
//!
//! Placement of circular room sites and the straight roads between them.
//!
//! Vertices and roads live in flat arenas and refer to each other through
//! [`VertexId`] and [`RoadId`] handles. The graph is planar by construction:
//! no two rooms overlap, no road crosses an unrelated room, and no two roads
//! cross each other.

use crate::{
    config, Circle, GenerationConfig, Generator, GrottoError, GrottoResult, Segment, Vec2,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Handle of a vertex inside a [`MapGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub usize);

/// Handle of a road inside a [`MapGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoadId(pub usize);

/// A circular room site.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub circle: Circle,
    /// Neighbouring vertex → road leading to it
    pub roads: BTreeMap<VertexId, RoadId>,
}

impl Vertex {
    pub fn new(circle: Circle) -> Self {
        Self {
            circle,
            roads: BTreeMap::new(),
        }
    }

    pub fn radius(&self) -> i32 {
        self.circle.radius
    }

    pub fn is_connected_to(&self, other: VertexId) -> bool {
        self.roads.contains_key(&other)
    }
}

/// An undirected edge between two vertices, clipped to their outlines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Road {
    pub from: VertexId,
    pub to: VertexId,
    /// Endpoint on the `from` vertex outline
    pub start: Vec2,
    /// Endpoint on the `to` vertex outline
    pub end: Vec2,
}

impl Road {
    pub fn segment(&self) -> Segment {
        Segment::new(self.start, self.end)
    }

    pub fn belongs(&self, vertex: VertexId) -> bool {
        self.from == vertex || self.to == vertex
    }

    /// Endpoint lying on `vertex`'s outline.
    pub fn endpoint_for(&self, vertex: VertexId) -> Option<Vec2> {
        if vertex == self.from {
            Some(self.start)
        } else if vertex == self.to {
            Some(self.end)
        } else {
            None
        }
    }
}

/// Rooms and roads produced by one generation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapGraph {
    pub vertices: Vec<Vertex>,
    pub roads: Vec<Road>,
}

impl MapGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.0)
    }

    pub fn road(&self, id: RoadId) -> Option<&Road> {
        self.roads.get(id.0)
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> {
        (0..self.vertices.len()).map(VertexId)
    }

    /// Roads touching `vertex`, ordered by neighbour.
    pub fn roads_of(&self, vertex: VertexId) -> impl Iterator<Item = &Road> + '_ {
        self.vertex(vertex)
            .into_iter()
            .flat_map(|v| v.roads.values())
            .filter_map(|id| self.road(*id))
    }

    /// Appends a vertex and returns its handle.
    pub fn add_vertex(&mut self, circle: Circle) -> VertexId {
        self.vertices.push(Vertex::new(circle));
        VertexId(self.vertices.len() - 1)
    }

    /// Appends a road and registers it with both endpoints.
    pub fn add_road(&mut self, road: Road) -> GrottoResult<RoadId> {
        if road.from == road.to {
            return Err(GrottoError::InvalidGraph(format!(
                "road loops on vertex {}",
                road.from.0
            )));
        }
        if self.vertex(road.from).is_none() || self.vertex(road.to).is_none() {
            return Err(GrottoError::InvalidGraph(format!(
                "road references unknown vertex ({} -> {})",
                road.from.0, road.to.0
            )));
        }
        if self.vertices[road.from.0].is_connected_to(road.to) {
            return Err(GrottoError::InvalidGraph(format!(
                "duplicate road between {} and {}",
                road.from.0, road.to.0
            )));
        }
        let id = RoadId(self.roads.len());
        self.roads.push(road);
        self.vertices[road.from.0].roads.insert(road.to, id);
        self.vertices[road.to.0].roads.insert(road.from, id);
        Ok(id)
    }

    /// Converts the graph to its compact, index-based form.
    pub fn to_compact(&self) -> CompactGraph {
        CompactGraph {
            vertexes: self
                .vertices
                .iter()
                .map(|v| CompactVertex {
                    x: v.circle.x,
                    y: v.circle.y,
                    r: v.circle.radius,
                })
                .collect(),
            roads: self
                .roads
                .iter()
                .map(|road| CompactRoad {
                    from: road.from.0,
                    to: road.to.0,
                    p1: road.start,
                    p2: road.end,
                })
                .collect(),
        }
    }

    /// Rebuilds a graph from its compact form, restoring every vertex's road map.
    ///
    /// Vertices too small to carve a room into are rejected.
    pub fn from_compact(compact: &CompactGraph) -> GrottoResult<Self> {
        let mut graph = MapGraph::new();
        for (i, v) in compact.vertexes.iter().enumerate() {
            if v.r < config::MIN_CARVABLE_RADIUS {
                return Err(GrottoError::InvalidGraph(format!(
                    "vertex {} has radius {}, need at least {}",
                    i,
                    v.r,
                    config::MIN_CARVABLE_RADIUS
                )));
            }
            graph.add_vertex(Circle::new(v.x, v.y, v.r));
        }
        for road in &compact.roads {
            graph.add_road(Road {
                from: VertexId(road.from),
                to: VertexId(road.to),
                start: road.p1,
                end: road.p2,
            })?;
        }
        Ok(graph)
    }

    /// Compact JSON export for debug logging.
    pub fn to_json(&self) -> GrottoResult<String> {
        Ok(serde_json::to_string(&self.to_compact())?)
    }

    pub fn from_json(json: &str) -> GrottoResult<Self> {
        let compact: CompactGraph = serde_json::from_str(json)?;
        Self::from_compact(&compact)
    }
}

/// Serializable form of a [`MapGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactGraph {
    pub vertexes: Vec<CompactVertex>,
    pub roads: Vec<CompactRoad>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompactVertex {
    pub x: i32,
    pub y: i32,
    pub r: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompactRoad {
    pub from: usize,
    pub to: usize,
    pub p1: Vec2,
    pub p2: Vec2,
}

/// Places rooms and roads.
///
/// Every loop has a fixed ceiling, so generation always terminates; when a
/// ceiling is hit the graph simply ends up sparser than requested.
#[derive(Debug, Clone, Default)]
pub struct GraphGenerator;

impl GraphGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Places up to `config.room_count` non-overlapping circles.
    fn place_vertices<R: Rng>(
        &self,
        graph: &mut MapGraph,
        config: &GenerationConfig,
        rng: &mut R,
    ) {
        for slot in 0..config.room_count {
            match self.try_place_vertex(graph, config, rng) {
                Some(circle) => {
                    graph.add_vertex(circle);
                }
                None => log::debug!(
                    "room slot {} skipped after {} placement attempts",
                    slot,
                    config.max_placement_attempts
                ),
            }
        }
    }

    fn try_place_vertex<R: Rng>(
        &self,
        graph: &MapGraph,
        config: &GenerationConfig,
        rng: &mut R,
    ) -> Option<Circle> {
        for _ in 0..config.max_placement_attempts {
            let circle = Circle::new(
                rng.gen_range(0..=config.width as i32),
                rng.gen_range(0..=config.height as i32),
                rng.gen_range(config.min_radius..=config.max_radius),
            );
            if circle.crosses_border(config.width, config.height) {
                continue;
            }
            if graph.vertices.iter().any(|v| v.circle.intersects(&circle)) {
                continue;
            }
            return Some(circle);
        }
        None
    }

    /// Draws road slots for every vertex.
    fn connect_vertices<R: Rng>(
        &self,
        graph: &mut MapGraph,
        config: &GenerationConfig,
        rng: &mut R,
    ) -> GrottoResult<()> {
        for from in graph.vertex_ids().collect::<Vec<_>>() {
            let slots = rng.gen_range(config.min_roads_per_room..=config.max_roads_per_room);
            for _ in 0..slots {
                if let Some(road) = self.try_draw_road(graph, from, config, rng) {
                    graph.add_road(road)?;
                }
            }
        }
        Ok(())
    }

    fn try_draw_road<R: Rng>(
        &self,
        graph: &MapGraph,
        from: VertexId,
        config: &GenerationConfig,
        rng: &mut R,
    ) -> Option<Road> {
        let source = &graph.vertices[from.0];
        for _ in 0..config.max_road_attempts {
            let candidates: Vec<VertexId> = graph
                .vertex_ids()
                .filter(|id| *id != from && !source.is_connected_to(*id))
                .collect();
            let to = *candidates.choose(rng)?;
            let target = &graph.vertices[to.0];

            let road = draft_road(from, &source.circle, to, &target.circle, rng)?;
            let segment = road.segment();
            let blocked = graph.vertex_ids().any(|id| {
                id != from && id != to && segment.intersects_circle(&graph.vertices[id.0].circle)
            });
            if blocked {
                continue;
            }
            if graph.roads.iter().any(|other| other.segment().intersects(&segment)) {
                continue;
            }
            return Some(road);
        }
        None
    }

    /// Re-checks every geometric invariant of a graph.
    pub fn check(graph: &MapGraph, width: u32, height: u32) -> GrottoResult<()> {
        for (i, a) in graph.vertices.iter().enumerate() {
            if a.circle.crosses_border(width, height) {
                return Err(GrottoError::InvalidGraph(format!(
                    "vertex {} crosses the map border",
                    i
                )));
            }
            for (j, b) in graph.vertices.iter().enumerate().skip(i + 1) {
                if a.circle.intersects(&b.circle) {
                    return Err(GrottoError::InvalidGraph(format!(
                        "vertices {} and {} overlap",
                        i, j
                    )));
                }
            }
        }
        for (i, road) in graph.roads.iter().enumerate() {
            for (vertex, point) in [(road.from, road.start), (road.to, road.end)] {
                let circle = graph
                    .vertex(vertex)
                    .ok_or_else(|| {
                        GrottoError::InvalidGraph(format!("road {} has a dangling vertex", i))
                    })?
                    .circle;
                if circle.boundary_distance(point).abs() > 1e-6 {
                    return Err(GrottoError::InvalidGraph(format!(
                        "road {} endpoint is off the outline of vertex {}",
                        i, vertex.0
                    )));
                }
            }
            let segment = road.segment();
            for (id, v) in graph.vertices.iter().enumerate() {
                if !road.belongs(VertexId(id)) && segment.intersects_circle(&v.circle) {
                    return Err(GrottoError::InvalidGraph(format!(
                        "road {} crosses vertex {}",
                        i, id
                    )));
                }
            }
            for (j, other) in graph.roads.iter().enumerate().skip(i + 1) {
                if segment.intersects(&other.segment()) {
                    return Err(GrottoError::InvalidGraph(format!(
                        "roads {} and {} cross",
                        i, j
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Builds a road between two circles through random interior points.
///
/// The draft line joins points at half radius from each center; the road
/// keeps only the part between the two outlines.
fn draft_road<R: Rng>(
    from: VertexId,
    source: &Circle,
    to: VertexId,
    target: &Circle,
    rng: &mut R,
) -> Option<Road> {
    let angle1 = rng.gen_range(-PI..PI);
    let angle2 = rng.gen_range(-PI..PI);
    let draft = Segment::new(
        source.center() + Vec2::from_angle(angle1) * (source.radius as f64 / 2.0),
        target.center() + Vec2::from_angle(angle2) * (target.radius as f64 / 2.0),
    );
    let start = *draft.circle_crossings(source).first()?;
    let end = *draft.circle_crossings(target).first()?;
    Some(Road {
        from,
        to,
        start,
        end,
    })
}

impl Generator<MapGraph> for GraphGenerator {
    fn generate<R: Rng>(&self, config: &GenerationConfig, rng: &mut R) -> GrottoResult<MapGraph> {
        config.validate()?;
        let mut graph = MapGraph::new();
        self.place_vertices(&mut graph, config, rng);
        self.connect_vertices(&mut graph, config, rng)?;
        log::debug!(
            "graph: {} of {} rooms placed, {} roads",
            graph.vertices.len(),
            config.room_count,
            graph.roads.len()
        );
        Ok(graph)
    }

    fn validate(&self, graph: &MapGraph, config: &GenerationConfig) -> GrottoResult<()> {
        Self::check(graph, config.width, config.height)
    }

    fn generator_type(&self) -> &'static str {
        "GraphGenerator"
    }
}
