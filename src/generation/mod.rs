//! # Generation Module
//!
//! The procedural dungeon pipeline.
//!
//! Generation runs in stages, each consuming the previous stage's output:
//! the [`graph`] stage places circular rooms and the roads between them, the
//! [`room`] stage grows a cave inside every circle, the [`region`] stage keeps
//! one walkable region per room, and the [`road`] stage stitches the regions
//! together. The [`dungeon`] module drives the stages and owns the result.

pub mod dungeon;
pub mod graph;
pub mod grid;
pub mod region;
pub mod road;
pub mod room;

pub use dungeon::*;
pub use graph::*;
pub use grid::*;
pub use region::*;
pub use road::*;
pub use room::*;

use crate::{config, GrottoError, GrottoResult};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for procedural generation.
///
/// Controls map bounds, room placement limits and the retry budgets that keep
/// every stage bounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Map width in tiles
    pub width: u32,
    /// Map height in tiles
    pub height: u32,
    /// Number of room slots to try to fill
    pub room_count: u32,
    /// Serialized random stream state (`!rnd,...`); a fresh one is drawn when absent
    pub random_state: Option<String>,
    /// Skip the small wall-pocket repair step
    pub fast_mode: bool,
    /// Smallest room radius
    pub min_radius: i32,
    /// Largest room radius
    pub max_radius: i32,
    /// Circle samples tried per room slot
    pub max_placement_attempts: u32,
    /// Minimum road slots per room
    pub min_roads_per_room: u32,
    /// Maximum road slots per room
    pub max_roads_per_room: u32,
    /// Target picks tried per road slot
    pub max_road_attempts: u32,
    /// Full re-carves allowed per room before the best attempt is kept
    pub max_room_attempts: u32,
    /// Required walkable cells per r² of a room
    pub room_quality_factor: f64,
}

impl GenerationConfig {
    /// Creates a configuration for a `width` x `height` map with `room_count` room slots.
    ///
    /// # Examples
    ///
    /// ```
    /// use grotto::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(500, 500, 15);
    /// assert!(config.min_radius <= config.max_radius);
    /// assert!(config.random_state.is_none());
    /// ```
    pub fn new(width: u32, height: u32, room_count: u32) -> Self {
        Self {
            width,
            height,
            room_count,
            random_state: None,
            fast_mode: false,
            min_radius: config::MIN_ROOM_RADIUS,
            max_radius: config::MAX_ROOM_RADIUS,
            max_placement_attempts: config::MAX_PLACEMENT_ATTEMPTS,
            min_roads_per_room: 1,
            max_roads_per_room: 3,
            max_road_attempts: config::MAX_ROAD_ATTEMPTS,
            max_room_attempts: config::MAX_ROOM_ATTEMPTS,
            room_quality_factor: config::ROOM_QUALITY_FACTOR,
        }
    }

    /// Creates a small, seeded configuration for testing.
    pub fn for_testing() -> Self {
        Self {
            random_state: Some("!rnd,1,0.1,0.2,0.3".to_string()),
            max_radius: 30,
            ..Self::new(200, 200, 6)
        }
    }

    /// Replaces the random state, keeping everything else.
    pub fn with_random_state(mut self, state: impl Into<String>) -> Self {
        self.random_state = Some(state.into());
        self
    }

    /// Minimum walkable cells for a room of the given radius.
    pub fn room_quality_threshold(&self, radius: i32) -> f64 {
        let r = radius as f64;
        r * r * self.room_quality_factor
    }

    /// Checks that the parameters can produce a map at all.
    pub fn validate(&self) -> GrottoResult<()> {
        if self.min_radius < config::MIN_CARVABLE_RADIUS {
            return Err(GrottoError::InvalidConfig(format!(
                "min_radius must be at least {}, got {}",
                config::MIN_CARVABLE_RADIUS,
                self.min_radius
            )));
        }
        if self.min_radius > self.max_radius {
            return Err(GrottoError::InvalidConfig(format!(
                "min_radius {} exceeds max_radius {}",
                self.min_radius, self.max_radius
            )));
        }
        let smallest_room = 2 * self.min_radius as u32 + 2;
        if self.width < smallest_room || self.height < smallest_room {
            return Err(GrottoError::InvalidConfig(format!(
                "{}x{} map cannot fit a room of radius {}",
                self.width, self.height, self.min_radius
            )));
        }
        if self.min_roads_per_room > self.max_roads_per_room {
            return Err(GrottoError::InvalidConfig(format!(
                "min_roads_per_room {} exceeds max_roads_per_room {}",
                self.min_roads_per_room, self.max_roads_per_room
            )));
        }
        if self.max_room_attempts == 0 {
            return Err(GrottoError::InvalidConfig(
                "max_room_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(
            config::DEFAULT_MAP_WIDTH,
            config::DEFAULT_MAP_HEIGHT,
            config::DEFAULT_ROOM_COUNT,
        )
    }
}

/// Semantic tile kinds of the finished map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileType {
    Empty,
    Wall,
    Road,
    Swamp,
    Desert,
    Land,
}

impl TileType {
    /// Floor kinds a room can be painted with.
    pub const BIOMES: [TileType; 3] = [TileType::Desert, TileType::Land, TileType::Swamp];

    /// Whether this is one of the room floor kinds.
    pub fn is_biome(self) -> bool {
        Self::BIOMES.contains(&self)
    }

    /// Whether creatures can stand on this tile.
    pub fn is_walkable(self) -> bool {
        self == TileType::Road || self.is_biome()
    }
}

/// Cell states used while carving a single room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaveTile {
    /// Open cave floor
    Floor,
    /// Solid rock
    Rock,
    /// The room's boundary ring
    Board,
    /// Protected corridor cell leading to a road entry point
    Input,
}

/// Trait for procedural generators.
///
/// Every pipeline stage that produces a standalone artefact implements this
/// trait, so callers can generate and re-check content the same way.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random stream.
    fn generate<R: Rng>(&self, config: &GenerationConfig, rng: &mut R) -> GrottoResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> GrottoResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Utility functions for generation algorithms.
pub mod utils {
    use super::*;
    use crate::Alea;
    use rand::SeedableRng;

    /// Creates the random stream for a run.
    ///
    /// Restores `config.random_state` when present, otherwise seeds a fresh
    /// stream from system entropy. The state is logged either way so the run
    /// can be reproduced.
    pub fn create_rng(config: &GenerationConfig) -> GrottoResult<Alea> {
        let rng = match &config.random_state {
            Some(state) => state.parse::<Alea>()?,
            None => Alea::from_entropy(),
        };
        log::debug!("random state: {}", rng.state());
        Ok(rng)
    }
}
