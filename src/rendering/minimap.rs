//! # Minimap
//!
//! A one-character-per-tile text dump of a map, handy in logs and bug reports.

use crate::{TileGrid, TileType};

/// Glyph used for wall tiles.
pub const WALL_GLYPH: char = '.';

/// Palette slots taken before any tile kind is seen.
const RESERVED_SLOTS: usize = 3;

/// Renders `tiles` as one string per row.
///
/// Walls print as `.`. Every other kind gets a hexadecimal palette digit in
/// the order it first appears, starting after the reserved slots.
///
/// # Examples
///
/// ```
/// use grotto::{render_minimap, TileGrid, TileType};
///
/// let mut tiles = TileGrid::new(3, 1, TileType::Wall);
/// tiles.set(1, 0, TileType::Road);
/// assert_eq!(render_minimap(&tiles), vec![".4.".to_string()]);
/// ```
pub fn render_minimap(tiles: &TileGrid<TileType>) -> Vec<String> {
    let mut palette: Vec<Option<TileType>> = vec![None; RESERVED_SLOTS];
    tiles
        .rows()
        .map(|row| {
            row.iter()
                .map(|tile| {
                    if *tile == TileType::Wall {
                        return WALL_GLYPH.to_string();
                    }
                    let slot = match palette.iter().position(|entry| *entry == Some(*tile)) {
                        Some(slot) => slot,
                        None => {
                            palette.push(Some(*tile));
                            palette.len() - 1
                        }
                    };
                    format!("{:x}", slot + 1)
                })
                .collect()
        })
        .collect()
}
