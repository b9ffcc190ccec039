//! # Tile Classification
//!
//! Turns tile-type grids into tileset indices.
//!
//! Every tile group in the tileset is a 6×8 block of variants, one per
//! neighbourhood shape. A tile picks its variant from which of its eight
//! neighbours share its type, so walls, roads and floors join up seamlessly.

use crate::{GrottoError, GrottoResult, TileGrid, TileType};
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::BitOr;
use std::sync::OnceLock;

/// Tiles per row of the tileset image.
pub const TILESET_COLUMNS: u32 = 32;

/// Index returned for a neighbourhood the table does not describe.
pub const UNKNOWN_TILE_INDEX: u32 = 3040;

/// Variants per row of a tile group.
pub const GROUP_WIDTH: usize = 8;

/// Tile group of [`TileType::Empty`].
pub const EMPTY_TILE_GROUP: u32 = 0;
/// Tile group of [`TileType::Wall`].
pub const WALL_TILE_GROUP: u32 = 2727;
/// Tile group of [`TileType::Road`].
pub const ROAD_TILE_GROUP: u32 = 830;

/// Bit set of same-type neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Connectivity(pub u16);

impl Connectivity {
    pub const NONE: Connectivity = Connectivity(0);
    pub const N: Connectivity = Connectivity(1);
    pub const E: Connectivity = Connectivity(2);
    pub const S: Connectivity = Connectivity(4);
    pub const W: Connectivity = Connectivity(8);
    pub const NE: Connectivity = Connectivity(16);
    pub const NW: Connectivity = Connectivity(32);
    pub const SE: Connectivity = Connectivity(64);
    pub const SW: Connectivity = Connectivity(128);
    pub const ALL: Connectivity = Connectivity(255);

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: Connectivity) -> bool {
        self.0 & other.0 == other.0
    }

    const fn without(self, other: Connectivity) -> Connectivity {
        Connectivity(self.0 & !other.0)
    }

    /// Bit for the neighbour at offset (`dx`, `dy`), `NONE` for the center.
    pub fn from_offset(dx: i32, dy: i32) -> Connectivity {
        match (dx, dy) {
            (-1, -1) => Self::NW,
            (0, -1) => Self::N,
            (1, -1) => Self::NE,
            (-1, 0) => Self::W,
            (1, 0) => Self::E,
            (-1, 1) => Self::SW,
            (0, 1) => Self::S,
            (1, 1) => Self::SE,
            _ => Self::NONE,
        }
    }

    /// Drops every diagonal whose two adjacent sides are not both set.
    ///
    /// A corner neighbour only changes the picture when the tile already
    /// connects along both of its edges.
    pub fn masked(self) -> Connectivity {
        let mut mask = self;
        if !self.contains(Self::E) {
            mask = mask.without(Self::SE | Self::NE);
        }
        if !self.contains(Self::W) {
            mask = mask.without(Self::SW | Self::NW);
        }
        if !self.contains(Self::N) {
            mask = mask.without(Self::NW | Self::NE);
        }
        if !self.contains(Self::S) {
            mask = mask.without(Self::SW | Self::SE);
        }
        mask
    }
}

impl BitOr for Connectivity {
    type Output = Connectivity;

    fn bitor(self, other: Connectivity) -> Connectivity {
        Connectivity(self.0 | other.0)
    }
}

const N: u16 = 1;
const E: u16 = 2;
const S: u16 = 4;
const W: u16 = 8;
const NE: u16 = 16;
const NW: u16 = 32;
const SE: u16 = 64;
const SW: u16 = 128;

/// Neighbourhood shown by each variant of a tile group, row by row.
///
/// The last cell has no 8-bit shape and is never selected.
pub const GROUP_LAYOUT: [[u16; GROUP_WIDTH]; 6] = [
    [0, E, W | E, W, S, S | E | SE, W | E | S | SW | SE, W | S | SW],
    [
        E | S,
        W | S,
        N | E | S,
        W | E | S,
        N | S,
        N | NE | E | SE | S,
        N | E | S | W | NE | NW | SE | SW,
        N | S | SW | W | NW,
    ],
    [
        N | E,
        W | N,
        N | E | W,
        N | S | W,
        N,
        N | NE | E,
        N | NE | E | W | NW,
        N | W | NW,
    ],
    [
        N | NE | E | S,
        N | S | W | NW,
        E | S | SW | W,
        E | SE | W | S,
        N | NE | E | S | SW | W | NW,
        N | NE | E | SE | S | W | NW,
        N | E | S | W | NW,
        N | NE | E | S | W,
    ],
    [
        N | E | SE | S,
        N | S | SW | W,
        N | E | W | NW,
        N | NE | E | W,
        N | E | SE | S | SW | W | NW,
        N | NE | E | SE | S | SW | W,
        N | E | S | SW | W,
        N | E | SE | S | W,
    ],
    [
        N | E | SE | S | SW | W,
        N | NE | E | S | W | NW,
        N | E | S | SW | W | NW,
        N | NE | E | SE | W | S,
        N | E | SE | S | W | NW,
        N | NE | E | S | SW | W,
        N | E | S | W,
        256,
    ],
];

/// Lookup from neighbourhood shape to variant position inside a tile group.
#[derive(Debug, Clone)]
pub struct ConnectivityTable {
    positions: HashMap<Connectivity, (u32, u32)>,
    rows: usize,
}

impl ConnectivityTable {
    /// Builds the table for [`GROUP_LAYOUT`].
    pub fn new() -> GrottoResult<Self> {
        Self::from_layout(&GROUP_LAYOUT)
    }

    /// Builds a table from rows of neighbourhood shapes.
    ///
    /// Every row must hold [`GROUP_WIDTH`] entries and no shape may appear twice.
    pub fn from_layout<L: AsRef<[u16]>>(layout: &[L]) -> GrottoResult<Self> {
        let mut positions = HashMap::new();
        for (row, entries) in layout.iter().enumerate() {
            let entries = entries.as_ref();
            if entries.len() != GROUP_WIDTH {
                return Err(GrottoError::InvalidTileTable(format!(
                    "row {} has {} entries, expected {}",
                    row,
                    entries.len(),
                    GROUP_WIDTH
                )));
            }
            for (col, bits) in entries.iter().enumerate() {
                let position = (row as u32, col as u32);
                if let Some((dup_row, dup_col)) = positions.insert(Connectivity(*bits), position) {
                    return Err(GrottoError::InvalidTileTable(format!(
                        "shape {:#010b} appears at {};{} and {};{}",
                        bits, dup_row, dup_col, row, col
                    )));
                }
            }
        }
        Ok(Self {
            positions,
            rows: layout.len(),
        })
    }

    /// Tileset index of the variant of group `base` for a neighbourhood.
    ///
    /// Returns [`UNKNOWN_TILE_INDEX`] when no variant matches.
    pub fn index(&self, base: u32, connectivity: Connectivity) -> u32 {
        let masked = connectivity.masked();
        match self.positions.get(&masked) {
            Some((row, col)) => base + row * TILESET_COLUMNS + col,
            None => {
                log::warn!("unknown connectivity {:#010b}", masked.bits());
                UNKNOWN_TILE_INDEX
            }
        }
    }

    /// Every tileset index belonging to group `base`, row by row.
    pub fn all_indexes(&self, base: u32) -> Vec<u32> {
        (0..self.rows as u32)
            .flat_map(|row| {
                (0..GROUP_WIDTH as u32).map(move |col| base + row * TILESET_COLUMNS + col)
            })
            .collect()
    }
}

/// The process-wide table, built on first use.
///
/// # Panics
///
/// Panics if [`GROUP_LAYOUT`] is malformed.
pub fn connectivity_table() -> &'static ConnectivityTable {
    static TABLE: OnceLock<ConnectivityTable> = OnceLock::new();
    TABLE.get_or_init(|| match ConnectivityTable::new() {
        Ok(table) => table,
        Err(e) => panic!("built-in tile layout is broken: {}", e),
    })
}

impl TileType {
    /// Tileset group drawn for this kind, if it has its own.
    pub fn tile_group(self) -> Option<u32> {
        match self {
            TileType::Empty => Some(EMPTY_TILE_GROUP),
            TileType::Wall => Some(WALL_TILE_GROUP),
            TileType::Road => Some(ROAD_TILE_GROUP),
            _ => None,
        }
    }

    /// Group mapping for every kind that has its own group.
    pub fn default_tile_groups() -> HashMap<TileType, u32> {
        [TileType::Empty, TileType::Wall, TileType::Road]
            .into_iter()
            .filter_map(|tile| tile.tile_group().map(|group| (tile, group)))
            .collect()
    }
}

/// Same-type neighbourhood of the cell at (`x`, `y`).
pub fn connectivity_at<T: Copy + PartialEq>(tiles: &TileGrid<T>, x: i32, y: i32) -> Connectivity {
    let Some(kind) = tiles.get(x, y) else {
        return Connectivity::NONE;
    };
    let mut connectivity = Connectivity::NONE;
    for dy in -1..=1 {
        for dx in -1..=1 {
            if tiles.get(x + dx, y + dy) == Some(kind) {
                connectivity = connectivity | Connectivity::from_offset(dx, dy);
            }
        }
    }
    connectivity
}

/// Maps every cell to a tileset index.
///
/// Kinds missing from `groups` are drawn from `default_group`.
///
/// # Examples
///
/// ```
/// use grotto::{classify_tiles, TileGrid, TileType, WALL_TILE_GROUP};
///
/// let tiles = TileGrid::new(3, 3, TileType::Wall);
/// let indexes = classify_tiles(&tiles, &TileType::default_tile_groups(), 0);
/// // The center wall connects in every direction
/// assert_eq!(indexes.get(1, 1), Some(WALL_TILE_GROUP + 32 + 6));
/// ```
pub fn classify_tiles<T>(
    tiles: &TileGrid<T>,
    groups: &HashMap<T, u32>,
    default_group: u32,
) -> TileGrid<u32>
where
    T: Copy + Eq + Hash,
{
    let table = connectivity_table();
    let mut indexes = TileGrid::new(tiles.width(), tiles.height(), 0);
    for (pos, tile) in tiles.iter() {
        let base = groups.get(&tile).copied().unwrap_or(default_group);
        indexes.set_at(pos, table.index(base, connectivity_at(tiles, pos.x, pos.y)));
    }
    indexes
}
