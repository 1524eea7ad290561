// Copyright 2022 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vello Coverage is a tile-based analytic coverage engine for 2D vector paths.
//!
//! It turns flattened contours into exact per-pixel opacity, without
//! supersampling, in three ordered passes:
//!
//! 1. [`binning`] walks every edge across the tile grid, storing a
//!    tile-relative copy of the edge in every tile it touches and a winding
//!    delta wherever it crosses the top boundary of a tile row.
//! 2. [`backdrop`] sums those deltas along each row, giving every tile the
//!    winding number at its left edge.
//! 3. [`fine`] integrates the signed area of each tile's segments on top of
//!    its backdrop and applies the fill rule.
//!
//! [`Renderer`] runs the passes and keeps the tile arena between renders.
//!
//! ```
//! use vello_coverage::kurbo::{Affine, Circle, Shape};
//! use vello_coverage::{fill_contours, Fill, RenderParams, Renderer, RendererOptions};
//!
//! let circle = Circle::new((32.0, 32.0), 20.0);
//! let contours = fill_contours(circle.path_elements(0.1), Affine::IDENTITY, 0.1);
//! let mut renderer = Renderer::new(RendererOptions::default())?;
//! let mask = renderer.render_to_mask(&contours, &RenderParams::new(64, 64, Fill::NonZero))?;
//! assert_eq!(mask.get(32, 32), 255);
//! assert_eq!(mask.get(1, 1), 0);
//! # Ok::<(), vello_coverage::Error>(())
//! ```
//!
//! # Features
//!
//! - `multithreading`: run every pass on a `rayon` thread pool when
//!   [`RendererOptions::num_threads`] is non-zero. The output is identical to
//!   the single-threaded pipeline.

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]
#![allow(missing_docs, reason = "We have many as-yet undocumented items.")]

mod render;
mod util;

pub mod backdrop;
pub mod binning;
pub mod contour;
pub mod fine;
pub mod tile_grid;

/// Styling and composition primitives.
pub use peniko;
/// 2D geometry, with a focus on curves.
pub use peniko::kurbo;
pub use peniko::Fill;

pub use contour::{fill_contours, Contour, DEFAULT_TOLERANCE};
pub use render::{CoverageMask, RenderParams, Renderer, RendererOptions, TileCoverage};
pub use tile_grid::{Tile, TileGrid, TileSegment};
pub use util::Vec2;

use thiserror::Error;

/// Errors that can occur in Vello Coverage.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The tile size is not a power of two, or is larger than
    /// [`MAX_TILE_SIZE`](tile_grid::MAX_TILE_SIZE).
    #[error("Invalid tile size {0}, expected a power of two no larger than 256")]
    InvalidTileSize(u32),
    /// The canvas has no pixels.
    #[error("Empty canvas of size {width}x{height}")]
    EmptyCanvas { width: u32, height: u32 },
    /// The render was cancelled through [`RenderParams::cancel`].
    #[error("Render cancelled")]
    Cancelled,
    /// Failed to build the worker thread pool.
    /// See [`rayon::ThreadPoolBuildError`] for more information.
    #[cfg(feature = "multithreading")]
    #[error("Couldn't build thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
