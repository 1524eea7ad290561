// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared helpers for the integration tests: a brute-force reference
//! rasterizer and image dumps for failed comparisons.

#![allow(dead_code, reason = "Not every test binary uses every helper")]

use std::path::{Path, PathBuf};

use vello_coverage::{Contour, CoverageMask, Fill, RenderParams, Renderer, RendererOptions};

/// Sub-scanlines per pixel used by [`reference_mask`].
pub const REFERENCE_SUBSAMPLES: u32 = 64;

fn comparison_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("comparisons")
}

/// Render with the default single-threaded renderer.
pub fn render(contours: &[Contour], width: u32, height: u32, fill: Fill) -> CoverageMask {
    render_with_options(contours, width, height, fill, RendererOptions::default())
}

pub fn render_with_options(
    contours: &[Contour],
    width: u32,
    height: u32,
    fill: Fill,
    options: RendererOptions,
) -> CoverageMask {
    let mut renderer = Renderer::new(options).unwrap();
    renderer
        .render_to_mask(contours, &RenderParams::new(width, height, fill))
        .unwrap()
}

/// Coverage computed by brute force.
///
/// Each pixel is cut into [`REFERENCE_SUBSAMPLES`] horizontal sub-scanlines.
/// Along each one, the crossings of every edge give the exact intervals that are
/// inside the shape, and the length of those intervals in every pixel column is
/// accumulated. Only the vertical direction is sampled.
pub fn reference_mask(contours: &[Contour], width: u32, height: u32, fill: Fill) -> CoverageMask {
    let edges: Vec<_> = contours.iter().flat_map(Contour::edges).collect();
    let mut data = vec![0_u8; width as usize * height as usize];
    let mut acc = vec![0.0_f64; width as usize];
    let mut crossings: Vec<(f64, i32)> = Vec::new();
    for py in 0..height {
        acc.fill(0.0);
        for k in 0..REFERENCE_SUBSAMPLES {
            let y = py as f64 + (k as f64 + 0.5) / REFERENCE_SUBSAMPLES as f64;
            crossings.clear();
            for (p0, p1) in &edges {
                let (x0, y0, x1, y1) = (p0.x as f64, p0.y as f64, p1.x as f64, p1.y as f64);
                if (y0 <= y) != (y1 <= y) {
                    let x = x0 + (y - y0) * (x1 - x0) / (y1 - y0);
                    crossings.push((x, if y1 > y0 { -1 } else { 1 }));
                }
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));
            let mut winding = 0;
            let mut prev_x = f64::NEG_INFINITY;
            for &(x, dir) in &crossings {
                let inside = match fill {
                    Fill::EvenOdd => winding % 2 != 0,
                    _ => winding != 0,
                };
                if inside {
                    add_span(&mut acc, prev_x, x);
                }
                winding += dir;
                prev_x = x;
            }
        }
        for (px, &a) in acc.iter().enumerate() {
            let coverage = (a / REFERENCE_SUBSAMPLES as f64).clamp(0.0, 1.0);
            data[py as usize * width as usize + px] = (coverage * 255.0).round() as u8;
        }
    }
    CoverageMask {
        width,
        height,
        data,
    }
}

fn add_span(acc: &mut [f64], x0: f64, x1: f64) {
    let x0 = x0.max(0.0);
    let x1 = x1.min(acc.len() as f64);
    if x0 >= x1 {
        return;
    }
    for col in x0.floor() as usize..x1.ceil() as usize {
        let lo = x0.max(col as f64);
        let hi = x1.min(col as f64 + 1.0);
        acc[col] += hi - lo;
    }
}

/// Number of pixels whose coverage differs by more than `tolerance`.
pub fn count_differences(a: &CoverageMask, b: &CoverageMask, tolerance: u8) -> usize {
    assert_eq!((a.width, a.height), (b.width, b.height));
    a.data
        .iter()
        .zip(&b.data)
        .filter(|(x, y)| x.abs_diff(**y) > tolerance)
        .count()
}

/// Write both masks and their difference as PNGs into `comparisons/`.
pub fn write_comparison(name: &str, actual: &CoverageMask, expected: &CoverageMask) {
    let dir = comparison_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let diff: Vec<u8> = actual
        .data
        .iter()
        .zip(&expected.data)
        .map(|(a, b)| a.abs_diff(*b))
        .collect();
    for (suffix, data) in [
        ("actual", &actual.data),
        ("expected", &expected.data),
        ("diff", &diff),
    ] {
        let path = dir.join(format!("{name}.{suffix}.png"));
        image::GrayImage::from_raw(actual.width, actual.height, data.clone())
            .unwrap()
            .save(&path)
            .unwrap();
        eprintln!("Wrote {path:?}");
    }
}

/// Compare against the reference, allowing at most `max_fraction` of the pixels
/// to differ by more than `tolerance`. Writes the images on failure.
pub fn assert_close_to_reference(
    name: &str,
    actual: &CoverageMask,
    expected: &CoverageMask,
    tolerance: u8,
    max_fraction: f64,
) {
    let differing = count_differences(actual, expected, tolerance);
    let total = actual.data.len();
    if differing as f64 > max_fraction * total as f64 {
        write_comparison(name, actual, expected);
        panic!("{name}: {differing} of {total} pixels differ by more than {tolerance}");
    }
}
