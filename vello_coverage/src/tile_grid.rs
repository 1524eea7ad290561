// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tile arena: per-tile backdrops and tile-relative segments.

use crate::util::Vec2;
use crate::{Error, Result};
use bytemuck::{Pod, Zeroable};

/// Default width and height of a tile in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 16;

/// Largest supported tile size.
///
/// Tile-relative coordinates are kept in f32 with epsilons around 1e-6, which
/// stops being meaningful well before tiles reach this size.
pub const MAX_TILE_SIZE: u32 = 256;

/// Sentinel stored in [`TileSegment::y_edge`] when the segment does not touch
/// the left edge of its tile.
pub const NO_Y_EDGE: f32 = 1e9;

/// Fail with [`Error::InvalidTileSize`] unless `tile_size` is a power of two
/// no larger than [`MAX_TILE_SIZE`].
pub(crate) fn check_tile_size(tile_size: u32) -> Result<()> {
    if !tile_size.is_power_of_two() || tile_size > MAX_TILE_SIZE {
        return Err(Error::InvalidTileSize(tile_size));
    }
    Ok(())
}

/// A line segment clipped to one tile, in tile-relative coordinates.
///
/// The segment keeps the direction of the edge it was cut from, so `point0` to
/// `point1` going up winds positively.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct TileSegment {
    // Points are relative to tile origin
    pub point0: Vec2,
    pub point1: Vec2,
    /// The y coordinate where the segment touches the tile's left edge, or [`NO_Y_EDGE`].
    pub y_edge: f32,
}

impl TileSegment {
    /// The y coordinate where this segment touches the left edge of its tile, if it does.
    pub fn left_edge(&self) -> Option<f32> {
        (self.y_edge < NO_Y_EDGE).then_some(self.y_edge)
    }

    /// +1 for a segment going up, -1 for a segment going down, 0 for a horizontal one.
    pub fn winding(&self) -> i32 {
        if self.point1.y < self.point0.y {
            1
        } else if self.point1.y > self.point0.y {
            -1
        } else {
            0
        }
    }
}

/// One square tile of the canvas.
#[derive(Clone, Debug, Default)]
pub struct Tile {
    /// Raw winding delta after binning; accumulated backdrop at the left edge
    /// of the tile after propagation.
    pub backdrop: i32,
    /// Segments of the geometry clipped to this tile.
    pub segments: Vec<TileSegment>,
}

impl Tile {
    /// The tile's segments as raw bytes, in the `#[repr(C)]` layout of [`TileSegment`].
    pub fn segment_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.segments)
    }
}

/// Dimensions of a [`TileGrid`] and the tiles active in the current pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileLayout {
    pub tile_size: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
    /// Active tiles as `[x0, y0, x1, y1]`, exclusive at the far end.
    pub bbox: [u32; 4],
}

impl TileLayout {
    /// Index of the tile at `(x, y)` in the flat tile array.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.tiles_x as usize + x as usize
    }

    pub fn bbox_width(&self) -> u32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn bbox_height(&self) -> u32 {
        self.bbox[3] - self.bbox[1]
    }

    pub fn is_empty(&self) -> bool {
        self.bbox_width() == 0 || self.bbox_height() == 0
    }

    /// All tile coordinates inside the active bbox, row by row.
    pub fn active_tiles(&self) -> impl Iterator<Item = (u32, u32)> {
        let [x0, y0, x1, y1] = self.bbox;
        (y0..y1).flat_map(move |y| (x0..x1).map(move |x| (x, y)))
    }
}

/// A flat arena of tiles covering the whole canvas.
///
/// The arena is meant to be reused across render passes: [`TileGrid::clear`]
/// empties segment lists without giving their memory back.
#[derive(Clone, Debug)]
pub struct TileGrid {
    width: u32,
    height: u32,
    layout: TileLayout,
    tiles: Vec<Tile>,
}

impl TileGrid {
    /// Create a grid for a `width` × `height` canvas.
    ///
    /// `tile_size` must be a power of two no larger than [`MAX_TILE_SIZE`], and
    /// both canvas dimensions must be non-zero.
    pub fn new(width: u32, height: u32, tile_size: u32) -> Result<Self> {
        check_tile_size(tile_size)?;
        if width == 0 || height == 0 {
            return Err(Error::EmptyCanvas { width, height });
        }
        let tiles_x = width.div_ceil(tile_size);
        let tiles_y = height.div_ceil(tile_size);
        let tiles = vec![Tile::default(); tiles_x as usize * tiles_y as usize];
        Ok(Self {
            width,
            height,
            layout: TileLayout {
                tile_size,
                tiles_x,
                tiles_y,
                bbox: [0; 4],
            },
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> u32 {
        self.layout.tile_size
    }

    pub fn tiles_x(&self) -> u32 {
        self.layout.tiles_x
    }

    pub fn tiles_y(&self) -> u32 {
        self.layout.tiles_y
    }

    pub fn layout(&self) -> TileLayout {
        self.layout
    }

    /// The active tiles of the current pass as `[x0, y0, x1, y1]`.
    pub fn bbox(&self) -> [u32; 4] {
        self.layout.bbox
    }

    pub fn tile(&self, x: u32, y: u32) -> &Tile {
        &self.tiles[self.layout.index(x, y)]
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub(crate) fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    /// A full row of tiles, including those outside the active bbox.
    pub fn row(&self, y: u32) -> &[Tile] {
        let start = self.layout.index(0, y);
        &self.tiles[start..start + self.layout.tiles_x as usize]
    }

    /// Reset every tile of the previous pass and deactivate all tiles.
    ///
    /// Only tiles inside the previous bbox can have been written, so only those
    /// are visited.
    pub fn clear(&mut self) {
        let layout = self.layout;
        for y in layout.bbox[1]..layout.bbox[3] {
            let start = layout.index(layout.bbox[0], y);
            let end = layout.index(layout.bbox[2], y);
            for tile in &mut self.tiles[start..end] {
                tile.backdrop = 0;
                tile.segments.clear();
            }
        }
        self.layout.bbox = [0; 4];
    }

    /// Activate the tiles overlapping a device-space bounding box `[x0, y0, x1, y1]`.
    ///
    /// The bbox is snapped outwards to tile boundaries and clamped to the canvas.
    /// One spare column is kept to the right of the tile holding the right-most
    /// point, so that every top-boundary crossing has a tile to put its winding
    /// delta in. Only crossings in the last column of the canvas lose theirs,
    /// and no pixel depends on those. An empty bbox, a missing one, or one
    /// entirely outside the canvas activates no tiles.
    pub fn set_bbox(&mut self, bbox: Option<[f32; 4]>) {
        let scale = 1.0 / self.layout.tile_size as f32;
        let mut x0 = 0;
        let mut y0 = 0;
        let mut x1 = 0;
        let mut y1 = 0;
        let mut x1_spare = 0;
        if let Some(bbox) = bbox {
            if bbox[0] < bbox[2] && bbox[1] < bbox[3] {
                x0 = (bbox[0] * scale).floor() as i32;
                y0 = (bbox[1] * scale).floor() as i32;
                x1 = (bbox[2] * scale).ceil() as i32;
                y1 = (bbox[3] * scale).ceil() as i32;
                x1_spare = ((bbox[2] * scale).floor() as i32).saturating_add(2);
            }
        }
        let tiles_x = self.layout.tiles_x as i32;
        let tiles_y = self.layout.tiles_y as i32;
        let ux0 = x0.clamp(0, tiles_x) as u32;
        let uy0 = y0.clamp(0, tiles_y) as u32;
        let ux1 = x1.clamp(0, tiles_x) as u32;
        let uy1 = y1.clamp(0, tiles_y) as u32;
        self.layout.bbox = if ux0 < ux1 && uy0 < uy1 {
            [ux0, uy0, x1_spare.clamp(0, tiles_x) as u32, uy1]
        } else {
            [0; 4]
        };
    }
}
