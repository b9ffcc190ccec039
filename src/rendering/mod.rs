//! # Rendering Module
//!
//! Engine-facing views of a generated map: tileset indices for drawing and a
//! text minimap for debugging.

pub mod minimap;
pub mod tiles;

pub use minimap::*;
pub use tiles::*;
