//! Regular tile grid over the image, visited in row-major order.

/// Position and size of one tile in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub index: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// `ceil(width / tile_width)` x `ceil(height / tile_height)` tiles; the last
/// column and row are clipped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
}

impl TileGrid {
    /// Callers guarantee all four sizes are non-zero.
    pub fn new(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Self {
        debug_assert!(width > 0 && height > 0 && tile_width > 0 && tile_height > 0);
        Self {
            width,
            height,
            tile_width,
            tile_height,
        }
    }

    pub fn columns(&self) -> u32 {
        self.width.div_ceil(self.tile_width.max(1))
    }

    pub fn rows(&self) -> u32 {
        self.height.div_ceil(self.tile_height.max(1))
    }

    /// Total number of tiles; wide enough that no grid overflows it.
    pub fn tile_count(&self) -> u64 {
        u64::from(self.columns()) * u64::from(self.rows())
    }

    /// The tile at `column`, `row`.
    pub fn tile(&self, column: u32, row: u32) -> TileRect {
        let x = column * self.tile_width;
        let y = row * self.tile_height;
        TileRect {
            index: row * self.columns() + column,
            x,
            y,
            width: self.tile_width.min(self.width - x),
            height: self.tile_height.min(self.height - y),
        }
    }

    /// Every tile, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = TileRect> + '_ {
        (0..self.rows()).flat_map(move |row| (0..self.columns()).map(move |column| self.tile(column, row)))
    }
}
