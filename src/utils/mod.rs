//! # Utilities Module
//!
//! Geometry, rasterization and random-stream primitives shared by every
//! generation stage.

pub mod geometry;
pub mod random;
pub mod raster;

pub use geometry::*;
pub use random::*;
pub use raster::*;
