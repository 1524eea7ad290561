// Copyright 2022 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The three-pass coverage pipeline: binning, backdrop propagation and fine
//! rasterization.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use peniko::Fill;

use crate::backdrop;
use crate::binning::{self, BinStats};
use crate::contour::{self, Contour};
use crate::fine;
use crate::tile_grid::{self, TileGrid, DEFAULT_TILE_SIZE};
use crate::{Error, Result};

/// Options which are set at renderer creation time, used in [`Renderer::new`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RendererOptions {
    /// Width and height of a tile in pixels. Must be a power of two, at most
    /// [`MAX_TILE_SIZE`](crate::tile_grid::MAX_TILE_SIZE).
    pub tile_size: u32,
    /// Number of worker threads.
    ///
    /// 0 runs every pass on the calling thread. Without the `multithreading`
    /// feature this is ignored.
    pub num_threads: u16,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            num_threads: 0,
        }
    }
}

/// Parameters used in a single render that are configurable by the client.
#[derive(Clone, Debug)]
pub struct RenderParams {
    /// Dimensions of the canvas in pixels.
    pub width: u32,
    pub height: u32,
    /// The fill rule applied to accumulated winding.
    pub fill: Fill,
    /// When set to `true` by another thread, the render stops at the next tile
    /// and returns [`Error::Cancelled`].
    pub cancel: Option<Arc<AtomicBool>>,
}

impl RenderParams {
    pub fn new(width: u32, height: u32, fill: Fill) -> Self {
        Self {
            width,
            height,
            fill,
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// The 8-bit coverage of one tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileCoverage {
    /// Tile coordinates, in tiles.
    pub x: u32,
    pub y: u32,
    /// `tile_size * tile_size` alpha values, row-major. Tiles on the right and
    /// bottom border of the canvas include pixels past its edge.
    pub alpha: Vec<u8>,
}

/// A canvas-sized 8-bit coverage mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverageMask {
    pub width: u32,
    pub height: u32,
    /// `width * height` alpha values, row-major.
    pub data: Vec<u8>,
}

impl CoverageMask {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// The coverage of the pixel at `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }
}

/// Turns contours into per-pixel coverage.
///
/// The tile arena is kept between renders and only reallocated when the canvas
/// size changes.
pub struct Renderer {
    options: RendererOptions,
    grid: Option<TileGrid>,
    stats: BinStats,
    #[cfg(feature = "multithreading")]
    thread_pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("options", &self.options)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Creates a new renderer.
    pub fn new(options: RendererOptions) -> Result<Self> {
        tile_grid::check_tile_size(options.tile_size)?;
        #[cfg(feature = "multithreading")]
        let thread_pool = if options.num_threads > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(options.num_threads as usize)
                    .build()?,
            )
        } else {
            None
        };
        #[cfg(not(feature = "multithreading"))]
        {
            if options.num_threads > 0 {
                log::debug!(
                    "num_threads = {} ignored without the `multithreading` feature",
                    options.num_threads
                );
            }
        }
        Ok(Self {
            options,
            grid: None,
            stats: BinStats::default(),
            #[cfg(feature = "multithreading")]
            thread_pool,
        })
    }

    /// The options this renderer was created with.
    pub fn options(&self) -> RendererOptions {
        self.options
    }

    /// The tile grid of the most recent render, after propagation.
    pub fn grid(&self) -> Option<&TileGrid> {
        self.grid.as_ref()
    }

    /// Binning counters of the most recent render.
    pub fn last_stats(&self) -> BinStats {
        self.stats
    }

    /// Render and report every pixel inside the canvas with non-zero coverage.
    ///
    /// Pixels are reported tile by tile, and row by row within each tile.
    pub fn render_with(
        &mut self,
        contours: &[Contour],
        params: &RenderParams,
        mut f: impl FnMut(u32, u32, u8),
    ) -> Result<()> {
        let tiles = self.render_tiles(contours, params)?;
        let tile_size = self.options.tile_size;
        for tile in &tiles {
            for (x, y, alpha) in tile_pixels(tile, tile_size, params.width, params.height) {
                if alpha != 0 {
                    f(x, y, alpha);
                }
            }
        }
        Ok(())
    }

    /// Render into a canvas-sized mask.
    pub fn render_to_mask(
        &mut self,
        contours: &[Contour],
        params: &RenderParams,
    ) -> Result<CoverageMask> {
        let tiles = self.render_tiles(contours, params)?;
        let tile_size = self.options.tile_size;
        let mut mask = CoverageMask::new(params.width, params.height);
        for tile in &tiles {
            for (x, y, alpha) in tile_pixels(tile, tile_size, params.width, params.height) {
                mask.data[y as usize * params.width as usize + x as usize] = alpha;
            }
        }
        Ok(mask)
    }

    /// Render and return the coverage of every active tile, row by row.
    ///
    /// The active tiles are those under the geometry's bounding box, plus one
    /// column to its right.
    ///
    /// Tiles that are not returned have zero coverage.
    pub fn render_tiles(
        &mut self,
        contours: &[Contour],
        params: &RenderParams,
    ) -> Result<Vec<TileCoverage>> {
        let cancel = params.cancel.as_deref();
        let tile_size = self.options.tile_size;
        let grid = match self.grid.take() {
            Some(grid) if grid.width() == params.width && grid.height() == params.height => grid,
            _ => TileGrid::new(params.width, params.height, tile_size)?,
        };
        let grid = self.grid.insert(grid);
        grid.clear();
        grid.set_bbox(contour::bounds(contours));
        check_cancel(cancel)?;

        #[cfg(feature = "multithreading")]
        {
            if let Some(pool) = &self.thread_pool {
                self.stats = pool.install(|| binning::bin_contours_par(grid, contours));
                check_cancel(cancel)?;
                pool.install(|| backdrop::propagate_par(grid));
                check_cancel(cancel)?;
                log_pass(grid, &self.stats);
                let grid = &*grid;
                return pool.install(|| fill_tiles_par(grid, params.fill, cancel));
            }
        }

        self.stats = binning::bin_contours(grid, contours);
        check_cancel(cancel)?;
        backdrop::propagate(grid);
        check_cancel(cancel)?;
        log_pass(grid, &self.stats);
        fill_tiles(grid, params.fill, cancel)
    }
}

fn check_cancel(cancel: Option<&AtomicBool>) -> Result<()> {
    match cancel {
        Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
        _ => Ok(()),
    }
}

fn log_pass(grid: &TileGrid, stats: &BinStats) {
    let layout = grid.layout();
    log::debug!(
        "binned {} edges into {} segments over {}x{} tiles, {} degenerate edges dropped",
        stats.edges,
        stats.segments,
        layout.bbox_width(),
        layout.bbox_height(),
        stats.dropped,
    );
}

/// The canvas pixels of a tile, with their coverage.
fn tile_pixels(
    tile: &TileCoverage,
    tile_size: u32,
    width: u32,
    height: u32,
) -> impl Iterator<Item = (u32, u32, u8)> + '_ {
    let x0 = tile.x * tile_size;
    let y0 = tile.y * tile_size;
    let w = tile_size.min(width - x0);
    let h = tile_size.min(height - y0);
    (0..h).flat_map(move |dy| {
        (0..w).map(move |dx| {
            let alpha = tile.alpha[(dy * tile_size + dx) as usize];
            (x0 + dx, y0 + dy, alpha)
        })
    })
}

fn fill_one(grid: &TileGrid, x: u32, y: u32, fill: Fill, area: &mut [f32]) -> TileCoverage {
    let tile_size = grid.tile_size() as usize;
    let mut alpha = vec![0; tile_size * tile_size];
    if !fine::fill_tile(grid.tile(x, y), tile_size, fill, area, &mut alpha) {
        log::warn!("tile ({x}, {y}) accumulated non-finite coverage and was cleared");
    }
    TileCoverage { x, y, alpha }
}

fn fill_tiles(
    grid: &TileGrid,
    fill: Fill,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<TileCoverage>> {
    let tile_size = grid.tile_size() as usize;
    let mut area = vec![0.0; tile_size * tile_size];
    grid.layout()
        .active_tiles()
        .map(|(x, y)| {
            check_cancel(cancel)?;
            Ok(fill_one(grid, x, y, fill, &mut area))
        })
        .collect()
}

#[cfg(feature = "multithreading")]
fn fill_tiles_par(
    grid: &TileGrid,
    fill: Fill,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<TileCoverage>> {
    use rayon::prelude::*;

    let tile_size = grid.tile_size() as usize;
    let coords: Vec<(u32, u32)> = grid.layout().active_tiles().collect();
    coords
        .into_par_iter()
        .map_init(
            || vec![0.0; tile_size * tile_size],
            |area, (x, y)| {
                check_cancel(cancel)?;
                Ok(fill_one(grid, x, y, fill, area))
            },
        )
        .collect()
}
