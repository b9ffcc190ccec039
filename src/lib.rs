//! # Grotto
//!
//! A procedural generator for cave-like roguelike dungeons.
//!
//! ## Architecture Overview
//!
//! Generation is a single synchronous pipeline over plain data:
//!
//! - **Graph Generation**: non-overlapping circular rooms joined by roads that
//!   never cross each other or an unrelated room
//! - **Room Carving**: a cellular automaton grows organic caves inside each circle
//! - **Region Post-Processing**: erosion passes and flood fills keep exactly one
//!   walkable region per room
//! - **Road Carving**: "drunken" random walks stitch the rooms together
//! - **Tile Classification**: type grids become tileset indices using
//!   neighbourhood connectivity
//!
//! The whole pipeline is driven by one seedable random stream, so a random
//! state string is enough to reproduce any dungeon.
//!
//! ```
//! use grotto::{generate_dungeon, GenerationConfig};
//!
//! let config = GenerationConfig::for_testing().with_random_state("!rnd,1,0.1,0.2,0.3");
//! let dungeon = generate_dungeon(&config).unwrap();
//! assert_eq!(dungeon.random_state, "!rnd,1,0.1,0.2,0.3");
//! assert!(!dungeon.rooms.is_empty());
//! ```

pub mod generation;
pub mod rendering;
pub mod utils;

// Core module re-exports
pub use generation::*;
pub use rendering::*;
pub use utils::*;

/// Core error type for the Grotto generator.
#[derive(thiserror::Error, Debug)]
pub enum GrottoError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Random state string could not be parsed
    #[error("Invalid random state: {0}")]
    InvalidRandomState(String),

    /// Generation parameters are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A map graph breaks one of its geometric invariants
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// A room never produced a walkable region
    #[error("Room {vertex} produced no walkable cells after {attempts} attempts (radius {radius})")]
    RoomQuality {
        vertex: usize,
        radius: i32,
        attempts: u32,
    },

    /// The static connectivity table is malformed
    #[error("Invalid tile table: {0}")]
    InvalidTileTable(String),

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

/// Result type used throughout the Grotto codebase.
pub type GrottoResult<T> = Result<T, GrottoError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generator configuration constants.
pub mod config {
    /// Default map width in tiles
    pub const DEFAULT_MAP_WIDTH: u32 = 500;

    /// Default map height in tiles
    pub const DEFAULT_MAP_HEIGHT: u32 = 500;

    /// Default number of room slots
    pub const DEFAULT_ROOM_COUNT: u32 = 15;

    /// Smallest room radius
    pub const MIN_ROOM_RADIUS: i32 = 10;

    /// Smallest radius the room carver can work with
    pub const MIN_CARVABLE_RADIUS: i32 = 4;

    /// Largest room radius
    pub const MAX_ROOM_RADIUS: i32 = 100;

    /// Circle samples tried per room slot
    pub const MAX_PLACEMENT_ATTEMPTS: u32 = 100;

    /// Target picks tried per road slot
    pub const MAX_ROAD_ATTEMPTS: u32 = 10;

    /// Full re-carves allowed before a room is accepted as is
    pub const MAX_ROOM_ATTEMPTS: u32 = 50;

    /// A room is good enough once its walkable region reaches this many r²
    pub const ROOM_QUALITY_FACTOR: f64 = 1.25;
}
