// Copyright 2023 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backdrop propagation.
//!
//! After binning, each tile's backdrop holds the raw winding deltas of the
//! edges that crossed a top boundary just left of it. A running sum along each
//! row of the active bbox turns those into the winding number at the left edge
//! of every tile.

use crate::tile_grid::{Tile, TileGrid};

fn propagate_row(row: &mut [Tile]) {
    let mut sum = 0;
    for tile in row {
        sum += tile.backdrop;
        tile.backdrop = sum;
    }
}

/// Turn raw winding deltas into accumulated backdrops, row by row.
pub fn propagate(grid: &mut TileGrid) {
    let layout = grid.layout();
    if layout.is_empty() {
        return;
    }
    let stride = layout.tiles_x as usize;
    let [x0, y0, x1, y1] = layout.bbox.map(|v| v as usize);
    for row in grid.tiles_mut()[y0 * stride..y1 * stride].chunks_exact_mut(stride) {
        propagate_row(&mut row[x0..x1]);
    }
}

/// Like [`propagate`], with rows processed in parallel on the current rayon
/// thread pool. Returns only once every row is complete.
#[cfg(feature = "multithreading")]
pub fn propagate_par(grid: &mut TileGrid) {
    use rayon::prelude::*;

    let layout = grid.layout();
    if layout.is_empty() {
        return;
    }
    let stride = layout.tiles_x as usize;
    let [x0, y0, x1, y1] = layout.bbox.map(|v| v as usize);
    grid.tiles_mut()[y0 * stride..y1 * stride]
        .par_chunks_exact_mut(stride)
        .for_each(|row| propagate_row(&mut row[x0..x1]));
}

#[cfg(test)]
mod tests {
    use super::propagate;
    use crate::binning::BinSink;
    use crate::tile_grid::TileGrid;

    #[test]
    fn prefix_sum_per_row() {
        let mut grid = TileGrid::new(64, 32, 16).unwrap();
        grid.set_bbox(Some([0.0, 0.0, 64.0, 32.0]));
        let layout = grid.layout();
        grid.add_backdrop(layout.index(1, 0), -1);
        grid.add_backdrop(layout.index(3, 0), 1);
        grid.add_backdrop(layout.index(2, 1), 2);
        propagate(&mut grid);
        let row0: Vec<i32> = grid.row(0).iter().map(|t| t.backdrop).collect();
        let row1: Vec<i32> = grid.row(1).iter().map(|t| t.backdrop).collect();
        assert_eq!(row0, [0, -1, -1, 0]);
        assert_eq!(row1, [0, 0, 2, 2]);
    }

    #[test]
    fn only_active_tiles_are_touched() {
        let mut grid = TileGrid::new(96, 64, 16).unwrap();
        grid.set_bbox(Some([16.0, 16.0, 40.0, 48.0]));
        assert_eq!(grid.bbox(), [1, 1, 4, 3]);
        let layout = grid.layout();
        grid.add_backdrop(layout.index(1, 1), 1);
        propagate(&mut grid);
        assert_eq!(grid.tile(1, 1).backdrop, 1);
        assert_eq!(grid.tile(3, 1).backdrop, 1);
        assert_eq!(grid.tile(4, 1).backdrop, 0);
        assert_eq!(grid.tile(1, 2).backdrop, 0);
    }

    #[test]
    fn empty_bbox_is_a_no_op() {
        let mut grid = TileGrid::new(16, 16, 16).unwrap();
        propagate(&mut grid);
        assert_eq!(grid.tile(0, 0).backdrop, 0);
    }

    #[cfg(feature = "multithreading")]
    #[test]
    fn parallel_matches_sequential() {
        use super::propagate_par;

        let mut a = TileGrid::new(128, 128, 16).unwrap();
        a.set_bbox(Some([0.0, 0.0, 128.0, 128.0]));
        let layout = a.layout();
        for (i, (x, y)) in layout.active_tiles().enumerate() {
            a.add_backdrop(layout.index(x, y), (i % 5) as i32 - 2);
        }
        let mut b = a.clone();
        propagate(&mut a);
        propagate_par(&mut b);
        for (ta, tb) in a.tiles().iter().zip(b.tiles()) {
            assert_eq!(ta.backdrop, tb.backdrop);
        }
    }
}
