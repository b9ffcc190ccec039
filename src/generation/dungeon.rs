//! # Dungeon Generation
//!
//! Drives the whole pipeline and owns its result.
//!
//! The generator runs the stages in a fixed order, all drawing from the same
//! random stream:
//! 1. Build the room graph
//! 2. Carve and post-process every room, re-carving rooms that come out too small
//! 3. Paint each room's region with a random biome
//! 4. Carve the roads between rooms and prune stray road tiles
//! 5. Check that every walkable tile is reachable

use super::utils;
use crate::{
    carve_road, prune_roads, GenerationConfig, Generator, GraphGenerator, GrottoError,
    GrottoResult, MapGraph, Position, RegionProcessor, Room, RoomCarver, TileGrid, TileType,
    VertexId,
};
use pathfinding::prelude::bfs_reach;
use rand::Rng;
use std::collections::HashSet;

/// A generated dungeon.
#[derive(Debug, Clone)]
pub struct Dungeon {
    pub graph: MapGraph,
    /// Carved rooms, in vertex order
    pub rooms: Vec<Room>,
    pub tiles: TileGrid<TileType>,
    /// Stream state the dungeon was generated from
    pub random_state: String,
}

impl Dungeon {
    pub fn width(&self) -> usize {
        self.tiles.width()
    }

    pub fn height(&self) -> usize {
        self.tiles.height()
    }

    /// Where the player starts: the walkable cell of the first room nearest
    /// to its crossroads anchor.
    pub fn player_spawn(&self) -> Option<Position> {
        let room = self.rooms.first()?;
        room.closest_walkable(room.to_global(room.crossroads))
    }

    /// A random walkable cell from a random room.
    pub fn random_walkable_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        if self.rooms.is_empty() {
            return None;
        }
        let room = &self.rooms[rng.gen_range(0..self.rooms.len())];
        room.random_cell(rng)
    }

    /// The room whose walkable region contains `position`.
    pub fn room_at(&self, position: Position) -> Option<&Room> {
        self.rooms.iter().find(|room| room.contains(position))
    }

    pub fn is_walkable(&self, position: Position) -> bool {
        self.tiles
            .get_at(position)
            .is_some_and(|tile| tile.is_walkable())
    }

    /// Number of walkable tiles in the map.
    pub fn walkable_count(&self) -> usize {
        self.tiles.iter().filter(|(_, tile)| tile.is_walkable()).count()
    }
}

/// Generates complete dungeons from a [`GenerationConfig`].
#[derive(Debug, Clone, Default)]
pub struct DungeonGenerator {
    pub graph_generator: GraphGenerator,
    pub carver: RoomCarver,
}

impl DungeonGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carves one room, re-carving until it is large enough.
    ///
    /// After `max_room_attempts` the largest attempt is kept. Fails only when
    /// no attempt produced a single walkable cell.
    pub fn build_room<R: Rng>(
        &self,
        graph: &MapGraph,
        vertex: VertexId,
        config: &GenerationConfig,
        rng: &mut R,
    ) -> GrottoResult<Room> {
        let processor = RegionProcessor::new(config.fast_mode);
        let mut best: Option<Room> = None;
        let mut radius = 0;

        for attempt in 1..=config.max_room_attempts {
            let carved = self.carver.carve(graph, vertex, rng)?;
            radius = carved.radius;
            let room = processor.process(carved, attempt);
            let threshold = config.room_quality_threshold(room.radius);
            if room.empty_space.len() as f64 >= threshold {
                return Ok(room);
            }
            log::debug!(
                "room {} attempt {}: {} walkable cells, need {:.0}",
                vertex.0,
                attempt,
                room.empty_space.len(),
                threshold
            );
            if best
                .as_ref()
                .map_or(true, |b| room.empty_space.len() > b.empty_space.len())
            {
                best = Some(room);
            }
        }

        match best {
            Some(mut room) if !room.empty_space.is_empty() => {
                log::warn!(
                    "room {} kept with {} walkable cells after {} attempts (radius {})",
                    vertex.0,
                    room.empty_space.len(),
                    config.max_room_attempts,
                    room.radius
                );
                room.attempts = config.max_room_attempts;
                Ok(room)
            }
            _ => Err(GrottoError::RoomQuality {
                vertex: vertex.0,
                radius,
                attempts: config.max_room_attempts,
            }),
        }
    }

    /// Vertices of the largest connected part of the graph, in vertex order.
    ///
    /// Ties go to the part containing the lowest vertex.
    pub fn main_component(graph: &MapGraph) -> Vec<VertexId> {
        let mut seen = HashSet::new();
        let mut best: Vec<VertexId> = Vec::new();
        for id in graph.vertex_ids() {
            if seen.contains(&id) {
                continue;
            }
            let mut component: Vec<VertexId> = bfs_reach(id, |v: &VertexId| {
                graph
                    .vertex(*v)
                    .map(|vertex| vertex.roads.keys().copied().collect::<Vec<_>>())
                    .unwrap_or_default()
            })
            .collect();
            seen.extend(component.iter().copied());
            if component.len() > best.len() {
                component.sort();
                best = component;
            }
        }
        best
    }

    /// Paints every room's region with a random biome.
    fn paint_biomes<R: Rng>(
        &self,
        tiles: &mut TileGrid<TileType>,
        rooms: &mut [Room],
        rng: &mut R,
    ) {
        for room in rooms.iter_mut() {
            let biome = TileType::BIOMES[rng.gen_range(0..TileType::BIOMES.len())];
            for cell in room.walkable_cells() {
                tiles.set_at(cell, biome);
            }
            room.biome = Some(biome);
        }
    }

    /// Carves every road whose rooms were both carved, then prunes stray tiles.
    fn stitch_rooms<R: Rng>(
        &self,
        tiles: &mut TileGrid<TileType>,
        graph: &MapGraph,
        rooms: &[Room],
        rng: &mut R,
    ) -> GrottoResult<()> {
        let carved: HashSet<VertexId> = rooms.iter().map(|room| room.vertex).collect();
        for road in &graph.roads {
            if carved.contains(&road.from) && carved.contains(&road.to) {
                carve_road(tiles, graph, rooms, road, rng)?;
            }
        }
        *tiles = prune_roads(tiles);
        Ok(())
    }

    /// Walls off walkable tiles that cannot be reached from the first room and
    /// drops rooms left without a path to it. Returns the number of tiles sealed.
    pub fn seal_unreachable(tiles: &mut TileGrid<TileType>, rooms: &mut Vec<Room>) -> usize {
        let Some(start) = rooms.first().and_then(|room| room.walkable_cells().next()) else {
            return 0;
        };
        let reached: HashSet<Position> = bfs_reach(start, |pos: &Position| {
            pos.cardinal_adjacent_positions()
                .into_iter()
                .filter(|n| tiles.get_at(*n).is_some_and(TileType::is_walkable))
                .collect::<Vec<_>>()
        })
        .collect();

        let stray: Vec<Position> = tiles
            .iter()
            .filter(|(pos, tile)| tile.is_walkable() && !reached.contains(pos))
            .map(|(pos, _)| pos)
            .collect();
        for pos in &stray {
            tiles.set_at(*pos, TileType::Wall);
        }
        rooms.retain(|room| {
            room.walkable_cells()
                .next()
                .is_some_and(|cell| reached.contains(&cell))
        });
        stray.len()
    }

    /// Checks that every walkable tile is reachable from the first room.
    fn validate_connectivity(&self, dungeon: &Dungeon) -> GrottoResult<()> {
        let Some(start) = dungeon.rooms.first().and_then(|room| room.walkable_cells().next())
        else {
            return Ok(());
        };
        let reached = bfs_reach(start, |pos: &Position| {
            pos.cardinal_adjacent_positions()
                .into_iter()
                .filter(|n| dungeon.is_walkable(*n))
                .collect::<Vec<_>>()
        })
        .count();
        let walkable = dungeon.walkable_count();
        if reached != walkable {
            return Err(GrottoError::GenerationFailed(format!(
                "{} of {} walkable tiles are unreachable",
                walkable - reached,
                walkable
            )));
        }
        Ok(())
    }
}

impl Generator<Dungeon> for DungeonGenerator {
    fn generate<R: Rng>(&self, config: &GenerationConfig, rng: &mut R) -> GrottoResult<Dungeon> {
        let graph = self.graph_generator.generate(config, rng)?;

        let main = Self::main_component(&graph);
        if main.len() < graph.vertices.len() {
            log::debug!(
                "{} of {} rooms are cut off from the road network and stay solid",
                graph.vertices.len() - main.len(),
                graph.vertices.len()
            );
        }
        let mut rooms = main
            .iter()
            .map(|vertex| self.build_room(&graph, *vertex, config, rng))
            .collect::<GrottoResult<Vec<_>>>()?;

        let mut tiles = TileGrid::new(
            config.width as usize,
            config.height as usize,
            TileType::Wall,
        );
        self.paint_biomes(&mut tiles, &mut rooms, rng);
        self.stitch_rooms(&mut tiles, &graph, &rooms, rng)?;
        let sealed = Self::seal_unreachable(&mut tiles, &mut rooms);
        if sealed > 0 {
            log::warn!("walled off {} unreachable walkable tiles", sealed);
        }

        let dungeon = Dungeon {
            graph,
            rooms,
            tiles,
            random_state: config.random_state.clone().unwrap_or_default(),
        };
        self.validate(&dungeon, config)?;
        log::info!(
            "generated {}x{} dungeon: {} rooms, {} roads, {} walkable tiles",
            config.width,
            config.height,
            dungeon.rooms.len(),
            dungeon.graph.roads.len(),
            dungeon.walkable_count()
        );
        Ok(dungeon)
    }

    fn validate(&self, dungeon: &Dungeon, config: &GenerationConfig) -> GrottoResult<()> {
        GraphGenerator::check(&dungeon.graph, config.width, config.height)?;
        for room in &dungeon.rooms {
            if room.empty_space.is_empty() {
                return Err(GrottoError::GenerationFailed(format!(
                    "room {} has no walkable cells",
                    room.vertex.0
                )));
            }
            if let Some(cell) = room
                .walkable_cells()
                .find(|cell| !dungeon.tiles.get_at(*cell).is_some_and(TileType::is_biome))
            {
                return Err(GrottoError::GenerationFailed(format!(
                    "room {} region is blocked at ({}, {})",
                    room.vertex.0, cell.x, cell.y
                )));
            }
        }
        self.validate_connectivity(dungeon)
    }

    fn generator_type(&self) -> &'static str {
        "DungeonGenerator"
    }
}

/// Generates a dungeon, restoring the random stream from `config` or drawing
/// a fresh one.
///
/// The returned dungeon records the stream state it started from, so
/// `config.with_random_state(dungeon.random_state)` regenerates it exactly.
#[cfg_attr(
    feature = "dev-tools",
    tracing::instrument(skip_all, fields(width = config.width, height = config.height))
)]
pub fn generate_dungeon(config: &GenerationConfig) -> GrottoResult<Dungeon> {
    let mut rng = utils::create_rng(config)?;
    let state = rng.state();
    let config = config.clone().with_random_state(state);
    DungeonGenerator::new().generate(&config, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Alea, CaveTile, CellSet, Circle, Road, Vec2};

    fn small_dungeon() -> Dungeon {
        generate_dungeon(&GenerationConfig::for_testing()).unwrap()
    }

    #[test]
    fn test_dungeon_generator_creation() {
        let generator = DungeonGenerator::new();
        assert_eq!(generator.generator_type(), "DungeonGenerator");
        assert_eq!(generator.carver.iterations(30), 15);
    }

    #[test]
    fn test_generation_with_small_map() {
        let config = GenerationConfig::for_testing();
        let dungeon = small_dungeon();
        assert_eq!(dungeon.width(), 200);
        assert_eq!(dungeon.height(), 200);
        assert_eq!(dungeon.random_state, "!rnd,1,0.1,0.2,0.3");
        assert!(!dungeon.rooms.is_empty());
        assert!(dungeon.rooms.len() <= config.room_count as usize);
        assert!(dungeon.walkable_count() > 0);
        assert!(DungeonGenerator::new().validate(&dungeon, &config).is_ok());
    }

    #[test]
    fn test_rooms_meet_quality_or_exhaust_attempts() {
        let config = GenerationConfig::for_testing();
        for room in &small_dungeon().rooms {
            let big_enough =
                room.empty_space.len() as f64 >= config.room_quality_threshold(room.radius);
            assert!(big_enough || room.attempts == config.max_room_attempts);
            assert!(room.biome.is_some_and(TileType::is_biome));
        }
    }

    #[test]
    fn test_generation_is_reproducible() {
        let a = small_dungeon();
        let b = small_dungeon();
        assert_eq!(a.tiles, b.tiles);
        assert_eq!(a.graph, b.graph);
    }

    #[test]
    fn test_recorded_state_regenerates_dungeon() {
        let mut config = GenerationConfig::for_testing();
        config.random_state = None;
        let first = generate_dungeon(&config).unwrap();
        let again = generate_dungeon(&config.with_random_state(first.random_state.clone())).unwrap();
        assert_eq!(first.tiles, again.tiles);
    }

    #[test]
    fn test_spawn_and_random_cells() {
        let dungeon = small_dungeon();
        let spawn = dungeon.player_spawn().unwrap();
        assert!(dungeon.is_walkable(spawn));
        assert_eq!(dungeon.room_at(spawn).map(|room| room.vertex), Some(dungeon.rooms[0].vertex));

        let mut rng: Alea = "!rnd,1,0.5,0.25,0.125".parse().unwrap();
        for _ in 0..20 {
            let cell = dungeon.random_walkable_cell(&mut rng).unwrap();
            assert!(dungeon.is_walkable(cell));
            assert!(dungeon.room_at(cell).is_some());
        }
        assert!(dungeon.room_at(Position::new(-5, -5)).is_none());
    }

    #[test]
    fn test_main_component() {
        let mut graph = MapGraph::new();
        let a = graph.add_vertex(Circle::new(20, 20, 10));
        let b = graph.add_vertex(Circle::new(60, 20, 10));
        let c = graph.add_vertex(Circle::new(20, 60, 10));
        let d = graph.add_vertex(Circle::new(100, 20, 10));
        let road = |from, to, start, end| Road {
            from,
            to,
            start,
            end,
        };
        graph
            .add_road(road(b, d, Vec2::new(70.0, 20.0), Vec2::new(90.0, 20.0)))
            .unwrap();
        graph
            .add_road(road(a, b, Vec2::new(30.0, 20.0), Vec2::new(50.0, 20.0)))
            .unwrap();

        assert_eq!(DungeonGenerator::main_component(&graph), vec![a, b, d]);
        assert!(!DungeonGenerator::main_component(&graph).contains(&c));
        assert!(DungeonGenerator::main_component(&MapGraph::new()).is_empty());
    }

    #[test]
    fn test_room_attempts_are_capped() {
        let mut graph = MapGraph::new();
        let v = graph.add_vertex(Circle::new(30, 30, 12));
        let mut config = GenerationConfig::for_testing();
        config.max_room_attempts = 3;
        // No cave can ever reach this size
        config.room_quality_factor = 1000.0;
        let mut rng: Alea = "!rnd,1,0.1,0.2,0.3".parse().unwrap();

        let room = DungeonGenerator::new()
            .build_room(&graph, v, &config, &mut rng)
            .unwrap();
        assert_eq!(room.attempts, 3);
        assert!(!room.empty_space.is_empty());
    }

    fn square_room(vertex: usize, origin: Position, side: i32) -> Room {
        let mut empty_space = CellSet::new(side as usize);
        empty_space.extend((0..side).flat_map(|x| (0..side).map(move |y| Position::new(x, y))));
        Room {
            vertex: VertexId(vertex),
            radius: side / 2,
            origin,
            tiles: TileGrid::square(side as usize, CaveTile::Floor),
            crossroads: Position::new(side / 2, side / 2),
            roads: Vec::new(),
            empty_space,
            attempts: 1,
            biome: Some(TileType::Land),
        }
    }

    #[test]
    fn test_unreachable_tiles_are_sealed() {
        let mut tiles = TileGrid::new(40, 20, TileType::Wall);
        let mut rooms = vec![
            square_room(0, Position::new(2, 2), 5),
            square_room(1, Position::new(10, 2), 5),
            square_room(2, Position::new(25, 10), 4),
        ];
        for room in &rooms {
            for cell in room.walkable_cells() {
                tiles.set_at(cell, TileType::Land);
            }
        }
        // A corridor joins the first two rooms
        for x in 7..10 {
            tiles.set(x, 4, TileType::Road);
        }
        // A stray fragment on the map edge
        tiles.set(35, 0, TileType::Road);
        tiles.set(36, 0, TileType::Road);

        let sealed = DungeonGenerator::seal_unreachable(&mut tiles, &mut rooms);
        assert_eq!(sealed, 2 + 16);
        assert_eq!(
            rooms.iter().map(|room| room.vertex).collect::<Vec<_>>(),
            vec![VertexId(0), VertexId(1)]
        );
        assert_eq!(tiles.get(35, 0), Some(TileType::Wall));
        assert_eq!(tiles.get(26, 11), Some(TileType::Wall));
        assert_eq!(tiles.get(8, 4), Some(TileType::Road));
        assert_eq!(tiles.count(TileType::Land), 50);

        // Nothing left to seal
        assert_eq!(DungeonGenerator::seal_unreachable(&mut tiles, &mut rooms), 0);
    }

    #[test]
    fn test_room_quality_error_names_the_room() {
        let error = GrottoError::RoomQuality {
            vertex: 4,
            radius: 12,
            attempts: 50,
        };
        assert!(error.to_string().contains("Room 4"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = GenerationConfig::for_testing();
        config.min_radius = 40;
        config.max_radius = 10;
        assert!(matches!(
            generate_dungeon(&config),
            Err(GrottoError::InvalidConfig(_))
        ));
    }
}
