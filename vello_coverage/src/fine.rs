// Copyright 2023 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-tile analytic coverage.
//!
//! Every pixel starts from the tile's propagated backdrop. Each segment then
//! adds, row by row, the fraction of every pixel lying right of it times its
//! signed height within the row. Segments that touch the tile's left edge also
//! carry a correction for the winding they hand over to the tile on the left.

use crate::tile_grid::Tile;
use peniko::Fill;

/// Accumulate the float coverage of one tile into `area`.
///
/// `area` must hold `tile_size * tile_size` values, row-major. On return it
/// holds coverage in `0.0..=1.0` after `fill` has been applied.
///
/// Returns `false` if the accumulation produced a non-finite value. The whole
/// tile is then reset to zero coverage.
pub fn fill_tile_area(tile: &Tile, tile_size: usize, fill: Fill, area: &mut [f32]) -> bool {
    let area = &mut area[..tile_size * tile_size];
    area.fill(tile.backdrop as f32);
    for segment in &tile.segments {
        let delta = segment.point1 - segment.point0;
        for (yi, row) in area.chunks_exact_mut(tile_size).enumerate() {
            let y = segment.point0.y - yi as f32;
            let y0 = y.clamp(0.0, 1.0);
            let y1 = (y + delta.y).clamp(0.0, 1.0);
            let dy = y0 - y1;
            let y_edge = delta.x.signum() * (yi as f32 - segment.y_edge + 1.0).clamp(0.0, 1.0);
            if dy != 0.0 {
                let vec_y_recip = delta.y.recip();
                let t0 = (y0 - y) * vec_y_recip;
                let t1 = (y1 - y) * vec_y_recip;
                let startx = segment.point0.x;
                let x0 = startx + t0 * delta.x;
                let x1 = startx + t1 * delta.x;
                let xmin0 = x0.min(x1);
                let xmax0 = x0.max(x1);
                // Right of `reach` every pixel is fully right of the segment.
                let reach = (xmax0.ceil().max(0.0) as usize).min(tile_size);
                for (i, a_acc) in row[..reach].iter_mut().enumerate() {
                    let i_f = i as f32;
                    let xmin = (xmin0 - i_f).min(1.0) - 1.0e-6;
                    let xmax = xmax0 - i_f;
                    let b = xmax.min(1.0);
                    let c = b.max(0.0);
                    let d = xmin.max(0.0);
                    let a = (b + 0.5 * (d * d - c * c) - xmin) / (xmax - xmin);
                    *a_acc += y_edge + a * dy;
                }
                let tail = y_edge + dy;
                if tail != 0.0 {
                    for a_acc in &mut row[reach..] {
                        *a_acc += tail;
                    }
                }
            } else if y_edge != 0.0 {
                for a_acc in row.iter_mut() {
                    *a_acc += y_edge;
                }
            }
        }
    }
    if area.iter().any(|a| !a.is_finite()) {
        area.fill(0.0);
        return false;
    }
    if matches!(fill, Fill::EvenOdd) {
        for a in area.iter_mut() {
            *a = (*a - 2.0 * (0.5 * *a).round()).abs();
        }
    } else {
        for a in area.iter_mut() {
            *a = a.abs().min(1.0);
        }
    }
    true
}

/// Convert float coverage into 8-bit alpha, with rounding.
pub fn pack_alpha(area: &[f32], alpha: &mut [u8]) {
    for (dst, &a) in alpha.iter_mut().zip(area) {
        *dst = (a.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
}

/// Compute the 8-bit coverage of one tile.
///
/// `area` is scratch space of at least `tile_size * tile_size` values and
/// `alpha` receives the same number of bytes. Returns `false` if the tile was
/// degraded to zero coverage, see [`fill_tile_area`].
pub fn fill_tile(
    tile: &Tile,
    tile_size: usize,
    fill: Fill,
    area: &mut [f32],
    alpha: &mut [u8],
) -> bool {
    let finite = fill_tile_area(tile, tile_size, fill, area);
    let n = tile_size * tile_size;
    pack_alpha(&area[..n], &mut alpha[..n]);
    finite
}
