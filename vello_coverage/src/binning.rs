// Copyright 2023 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binning of edges into tiles.
//!
//! Each edge is walked across the tile grid with a DDA. Every tile the edge
//! touches receives a copy of the edge clipped to the tile, in tile-relative
//! coordinates, and every tile row whose top boundary the edge crosses receives
//! a winding delta in the tile immediately to the right of the crossing.
//!
//! The DDA works in "i space": step `i` of an edge that spans `count` tiles
//! visits the tile at `x = x0 + sign * z`, `y = y0 + i - z` with
//! `z = floor(a * i + b)`. A step that keeps `z` unchanged moved down one tile,
//! a step that increments `z` moved one tile sideways.

use crate::contour::Contour;
use crate::tile_grid::{TileGrid, TileLayout, TileSegment, NO_Y_EDGE};
use crate::util::{span, Vec2, ONE_MINUS_ULP, ROBUST_EPSILON};

#[cfg(feature = "multithreading")]
const EDGES_PER_CHUNK: usize = 256;

/// Receiver of binning output.
pub trait BinSink {
    /// Add a winding delta to the raw backdrop of a tile.
    fn add_backdrop(&mut self, tile_ix: usize, delta: i32);
    /// Append a tile-relative segment to a tile.
    fn push_segment(&mut self, tile_ix: usize, segment: TileSegment);
}

impl BinSink for TileGrid {
    fn add_backdrop(&mut self, tile_ix: usize, delta: i32) {
        self.tiles_mut()[tile_ix].backdrop += delta;
    }

    fn push_segment(&mut self, tile_ix: usize, segment: TileSegment) {
        self.tiles_mut()[tile_ix].segments.push(segment);
    }
}

/// One write into the tile grid, recorded for later application.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BinRecord {
    Backdrop { tile_ix: usize, delta: i32 },
    Segment { tile_ix: usize, segment: TileSegment },
}

/// Binning output collected away from the grid.
///
/// This is the first phase of the collect-then-bucket scheme: workers bin
/// disjoint sets of edges into their own buffers, which are then applied to
/// the grid one after the other.
#[derive(Clone, Debug, Default)]
pub struct BinBuffer {
    records: Vec<BinRecord>,
}

impl BinBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[BinRecord] {
        &self.records
    }

    /// Replay the recorded writes, in order, into a grid.
    pub fn apply(&self, grid: &mut TileGrid) {
        for record in &self.records {
            match *record {
                BinRecord::Backdrop { tile_ix, delta } => grid.add_backdrop(tile_ix, delta),
                BinRecord::Segment { tile_ix, segment } => grid.push_segment(tile_ix, segment),
            }
        }
    }
}

impl BinSink for BinBuffer {
    fn add_backdrop(&mut self, tile_ix: usize, delta: i32) {
        self.records.push(BinRecord::Backdrop { tile_ix, delta });
    }

    fn push_segment(&mut self, tile_ix: usize, segment: TileSegment) {
        self.records.push(BinRecord::Segment { tile_ix, segment });
    }
}

/// Counters of one binning pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BinStats {
    /// Edges seen, including dropped ones.
    pub edges: usize,
    /// Zero-length or non-finite edges that were skipped.
    pub dropped: usize,
    /// Tile segments produced.
    pub segments: usize,
}

impl BinStats {
    fn record(&mut self, outcome: Option<u32>) {
        self.edges += 1;
        match outcome {
            Some(n) => self.segments += n as usize,
            None => self.dropped += 1,
        }
    }
}

impl std::ops::AddAssign for BinStats {
    fn add_assign(&mut self, rhs: Self) {
        self.edges += rhs.edges;
        self.dropped += rhs.dropped;
        self.segments += rhs.segments;
    }
}

/// Bin every edge of `contours` into the active tiles of `grid`.
///
/// The grid's bbox must already be set for this pass.
pub fn bin_contours(grid: &mut TileGrid, contours: &[Contour]) -> BinStats {
    let layout = grid.layout();
    let mut stats = BinStats::default();
    for contour in contours {
        for (p0, p1) in contour.edges() {
            stats.record(bin_edge(&layout, p0, p1, grid));
        }
    }
    stats
}

/// Bin every edge of `contours` on the current rayon thread pool.
///
/// Chunks of edges are binned into separate [`BinBuffer`]s in parallel and
/// then applied in edge order, so the segment order in every tile is the same
/// as with [`bin_contours`].
#[cfg(feature = "multithreading")]
pub fn bin_contours_par(grid: &mut TileGrid, contours: &[Contour]) -> BinStats {
    use rayon::prelude::*;

    let layout = grid.layout();
    let edges: Vec<(Vec2, Vec2)> = contours.iter().flat_map(Contour::edges).collect();
    let buffers: Vec<(BinBuffer, BinStats)> = edges
        .par_chunks(EDGES_PER_CHUNK)
        .map(|chunk| {
            let mut buffer = BinBuffer::new();
            let mut stats = BinStats::default();
            for &(p0, p1) in chunk {
                stats.record(bin_edge(&layout, p0, p1, &mut buffer));
            }
            (buffer, stats)
        })
        .collect();
    let mut stats = BinStats::default();
    for (buffer, chunk_stats) in &buffers {
        buffer.apply(grid);
        stats += *chunk_stats;
    }
    stats
}

/// Bin one directed edge `p0 → p1`, given in device space.
///
/// Returns the number of tile segments produced, or `None` if the edge was
/// dropped because it has zero length or a non-finite coordinate.
pub fn bin_edge(layout: &TileLayout, p0: Vec2, p1: Vec2, sink: &mut impl BinSink) -> Option<u32> {
    if !p0.is_finite() || !p1.is_finite() {
        return None;
    }
    let tile_size = layout.tile_size as f32;
    let dda = EdgeDda::new(p0, p1, 1.0 / tile_size)?;
    let EdgeDda {
        s0,
        s1,
        a,
        b,
        x0,
        y0,
        sign,
        is_positive_slope,
        is_down,
        count,
        ..
    } = dda;

    // Horizontal edges on a row boundary enclose no area.
    if s1.y == s0.y && s0.y.floor() == s0.y {
        return Some(0);
    }

    let bbox = layout.bbox.map(|v| v as i32);
    let xmin = s0.x.min(s1.x);
    let stride = bbox[2] - bbox[0];
    if s0.y >= bbox[3] as f32 || s1.y < bbox[1] as f32 || xmin >= bbox[2] as f32 || stride == 0 {
        return Some(0);
    }
    // Clip to the bounding box. Clipping is done in "i" space.
    let mut imin = 0;
    if s0.y < bbox[1] as f32 {
        let mut iminf = ((bbox[1] as f32 - y0 + b - a) / (1.0 - a)).round() - 1.0;
        if y0 + iminf - (a * iminf + b).floor() < bbox[1] as f32 {
            iminf += 1.0;
        }
        imin = iminf as u32;
    }
    let mut imax = count;
    if s1.y > bbox[3] as f32 {
        let mut imaxf = ((bbox[3] as f32 - y0 + b - a) / (1.0 - a)).round() - 1.0;
        if y0 + imaxf - (a * imaxf + b).floor() < bbox[3] as f32 {
            imaxf += 1.0;
        }
        imax = imaxf as u32;
    }
    let delta = if is_down { -1 } else { 1 };
    // Rows whose winding comes from the part of the edge left of the bbox.
    let mut ymin = 0;
    let mut ymax = 0;
    if s0.x.max(s1.x) < bbox[0] as f32 {
        ymin = s0.y.ceil() as i32;
        ymax = s1.y.ceil() as i32;
        imax = imin;
    } else {
        let fudge = if is_positive_slope { 0.0 } else { 1.0 };
        if xmin < bbox[0] as f32 {
            let mut f = ((sign * (bbox[0] as f32 - x0) - b + fudge) / a).round();
            if (x0 + sign * (a * f + b).floor() < bbox[0] as f32) == is_positive_slope {
                f += 1.0;
            }
            let ynext = (y0 + f - (a * f + b).floor() + 1.0) as i32;
            if is_positive_slope {
                if f as u32 > imin {
                    ymin = (y0 + if y0 == s0.y { 0.0 } else { 1.0 }) as i32;
                    ymax = ynext;
                    imin = f as u32;
                }
            } else if (f as u32) < imax {
                ymin = ynext;
                ymax = s1.y.ceil() as i32;
                imax = f as u32;
            }
        }
        if s0.x.max(s1.x) > bbox[2] as f32 {
            let mut f = ((sign * (bbox[2] as f32 - x0) - b + fudge) / a).round();
            if (x0 + sign * (a * f + b).floor() < bbox[2] as f32) == is_positive_slope {
                f += 1.0;
            }
            if is_positive_slope {
                imax = imax.min(f as u32);
            } else {
                imin = imin.max(f as u32);
            }
        }
    }
    imax = imin.max(imax);
    ymin = ymin.max(bbox[1]);
    ymax = ymax.min(bbox[3]);
    for y in ymin..ymax {
        sink.add_backdrop(layout.index(bbox[0] as u32, y as u32), delta);
    }

    // `i` is always the step index within the whole, unclipped edge; the
    // first-row and top-edge decisions below depend on it.
    let mut last_z = (a * (imin as f32 - 1.0) + b).floor();
    let mut n_segments = 0;
    for i in imin..imax {
        let z = dda.z(i);
        let (x, y) = dda.tile(i, z);
        let z_prev = std::mem::replace(&mut last_z, z);
        if x < bbox[0] || x >= bbox[2] || y < bbox[1] || y >= bbox[3] {
            continue;
        }
        // The edge enters this tile through its top boundary, so everything to
        // the right in this row sees its winding. The active bbox keeps a spare
        // column, so only crossings in the canvas's last column fall off.
        let top_edge = if i == 0 { y0 == s0.y } else { z_prev == z };
        if top_edge && x + 1 < bbox[2] {
            let x_bump = (x + 1).max(bbox[0]);
            sink.add_backdrop(layout.index(x_bump as u32, y as u32), delta);
        }
        let segment = dda.segment(i, z, x, y, tile_size);
        sink.push_segment(layout.index(x as u32, y as u32), segment);
        n_segments += 1;
    }
    Some(n_segments)
}

/// DDA state of one edge, oriented downwards, in tile units.
#[derive(Clone, Copy, Debug)]
struct EdgeDda {
    /// Device-space endpoints, `xy0.y <= xy1.y`.
    xy0: Vec2,
    xy1: Vec2,
    /// Endpoints in tile units.
    s0: Vec2,
    s1: Vec2,
    is_down: bool,
    is_positive_slope: bool,
    sign: f32,
    a: f32,
    b: f32,
    x0: f32,
    y0: f32,
    /// Number of tiles visited by the unclipped edge.
    count: u32,
}

impl EdgeDda {
    fn new(p0: Vec2, p1: Vec2, tile_scale: f32) -> Option<Self> {
        let is_down = p1.y >= p0.y;
        let (xy0, xy1) = if is_down { (p0, p1) } else { (p1, p0) };
        let s0 = xy0 * tile_scale;
        let s1 = xy1 * tile_scale;
        let count_x = span(s0.x, s1.x) - 1;
        let count = count_x.saturating_add(span(s0.y, s1.y));

        let dx = (s1.x - s0.x).abs();
        let dy = s1.y - s0.y;
        if dx + dy == 0.0 {
            return None;
        }
        let idxdy = 1.0 / (dx + dy);
        let mut a = dx * idxdy;
        let is_positive_slope = s1.x >= s0.x;
        let sign = if is_positive_slope { 1.0 } else { -1.0 };
        let xt0 = (s0.x * sign).floor();
        let c = s0.x * sign - xt0;
        let y0 = s0.y.floor();
        let ytop = if s0.y == s1.y { s0.y.ceil() } else { y0 + 1.0 };
        let b = ((dy * c + dx * (ytop - s0.y)) * idxdy).min(ONE_MINUS_ULP);
        let robust_err = (a * (count as f32 - 1.0) + b).floor() - count_x as f32;
        if robust_err != 0.0 {
            a -= ROBUST_EPSILON.copysign(robust_err);
        }
        let x0 = xt0 * sign + if is_positive_slope { 0.0 } else { -1.0 };
        Some(Self {
            xy0,
            xy1,
            s0,
            s1,
            is_down,
            is_positive_slope,
            sign,
            a,
            b,
            x0,
            y0,
            count,
        })
    }

    #[inline]
    fn z(&self, i: u32) -> f32 {
        (self.a * i as f32 + self.b).floor()
    }

    #[inline]
    fn tile(&self, i: u32, z: f32) -> (i32, i32) {
        let x = (self.x0 + self.sign * z) as i32;
        let y = (self.y0 + i as f32 - z) as i32;
        (x, y)
    }

    /// The part of the edge inside the tile visited at step `i`, relative to that tile.
    fn segment(&self, i: u32, z: f32, x: i32, y: i32, tile_size: f32) -> TileSegment {
        let (mut xy0, mut xy1) = (self.xy0, self.xy1);
        let tile_xy = Vec2::new(x as f32 * tile_size, y as f32 * tile_size);
        let tile_xy1 = tile_xy + Vec2::new(tile_size, tile_size);

        if i > 0 {
            if z == self.z(i - 1) {
                // Top edge is clipped
                let mut xt = xy0.x + (xy1.x - xy0.x) * (tile_xy.y - xy0.y) / (xy1.y - xy0.y);
                xt = xt.clamp(tile_xy.x + 1e-3, tile_xy1.x);
                xy0 = Vec2::new(xt, tile_xy.y);
            } else {
                // If is_positive_slope, left edge is clipped, otherwise right
                let x_clip = if self.is_positive_slope {
                    tile_xy.x
                } else {
                    tile_xy1.x
                };
                let mut yt = xy0.y + (xy1.y - xy0.y) * (x_clip - xy0.x) / (xy1.x - xy0.x);
                yt = yt.clamp(tile_xy.y + 1e-3, tile_xy1.y);
                xy0 = Vec2::new(x_clip, yt);
            }
        }
        if i < self.count - 1 {
            if z == self.z(i + 1) {
                // Bottom edge is clipped
                let mut xt = xy0.x + (xy1.x - xy0.x) * (tile_xy1.y - xy0.y) / (xy1.y - xy0.y);
                xt = xt.clamp(tile_xy.x + 1e-3, tile_xy1.x);
                xy1 = Vec2::new(xt, tile_xy1.y);
            } else {
                // If is_positive_slope, right edge is clipped, otherwise left
                let x_clip = if self.is_positive_slope {
                    tile_xy1.x
                } else {
                    tile_xy.x
                };
                let mut yt = xy0.y + (xy1.y - xy0.y) * (x_clip - xy0.x) / (xy1.x - xy0.x);
                yt = yt.clamp(tile_xy.y + 1e-3, tile_xy1.y);
                xy1 = Vec2::new(x_clip, yt);
            }
        }

        let max = Vec2::new(tile_size, tile_size);
        let mut p0 = (xy0 - tile_xy).max(Vec2::ZERO).min(max);
        let mut p1 = (xy1 - tile_xy).max(Vec2::ZERO).min(max);
        let mut y_edge = NO_Y_EDGE;
        // Apply numerical robustness logic
        const EPSILON: f32 = 1e-6;
        if p0.x == 0.0 {
            if p1.x == 0.0 {
                p0.x = EPSILON;
                if p0.y == 0.0 {
                    // Entire tile
                    p1.x = EPSILON;
                    p1.y = tile_size;
                } else {
                    // Make segment disappear
                    p1.x = 2.0 * EPSILON;
                    p1.y = p0.y;
                }
            } else if p0.y == 0.0 {
                // Starting on the top-left corner counts as crossing the top edge.
                p0.x = EPSILON;
            } else {
                y_edge = p0.y;
            }
        } else if p1.x == 0.0 {
            if p1.y == 0.0 {
                p1.x = EPSILON;
            } else {
                y_edge = p1.y;
            }
        }
        if p0.x == p0.x.floor() && p0.x != 0.0 {
            p0.x -= EPSILON;
        }
        if p1.x == p1.x.floor() && p1.x != 0.0 {
            p1.x -= EPSILON;
        }
        if !self.is_down {
            (p0, p1) = (p1, p0);
        }
        TileSegment {
            point0: p0,
            point1: p1,
            y_edge,
        }
    }
}
