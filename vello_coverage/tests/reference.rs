// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Comparisons against the brute-force reference rasterizer.
//!
//! Failed comparisons write the rendered, reference and difference images to
//! `vello_coverage/comparisons/`.

#![allow(
    clippy::missing_assert_message,
    clippy::allow_attributes_without_reason
)]

mod util;

use util::{assert_close_to_reference, reference_mask, render};
use vello_coverage::kurbo::{Affine, BezPath, Circle, Rect, Shape};
use vello_coverage::{fill_contours, Contour, Fill, DEFAULT_TOLERANCE};

/// Per-pixel difference below which coverage counts as matching.
const TOLERANCE: u8 = 8;

fn flatten(shape: &impl Shape) -> Vec<Contour> {
    fill_contours(
        shape.path_elements(DEFAULT_TOLERANCE),
        Affine::IDENTITY,
        DEFAULT_TOLERANCE,
    )
}

fn compare(name: &str, contours: &[Contour], size: u32, fill: Fill, max_fraction: f64) {
    let actual = render(contours, size, size, fill);
    let expected = reference_mask(contours, size, size, fill);
    assert_close_to_reference(name, &actual, &expected, TOLERANCE, max_fraction);
}

#[test]
fn circle_radius_80() {
    let contours = flatten(&Circle::new((100.0, 100.0), 80.0));
    compare("circle_radius_80", &contours, 200, Fill::NonZero, 0.0013);
}

#[test]
fn off_center_circle() {
    let contours = flatten(&Circle::new((71.3, 90.6), 47.9));
    compare("off_center_circle", &contours, 160, Fill::NonZero, 0.0013);
}

#[test]
fn shapes_starting_on_tile_corners() {
    let contours = [
        // Diamond with every vertex on a tile corner.
        Contour::closed([(32.0, 16.0), (48.0, 32.0), (32.0, 48.0), (16.0, 32.0)]),
        // Triangle leaving its first corner down and to the right.
        Contour::closed([(64.0, 16.0), (90.0, 21.0), (71.0, 47.0)]),
        // Triangle leaving its first corner down and to the left.
        Contour::closed([(32.0, 64.0), (43.0, 90.0), (9.0, 81.0)]),
        // Vertical edges on tile boundaries with a slanted top.
        Contour::closed([(64.0, 64.0), (80.0, 70.0), (80.0, 96.0), (64.0, 96.0)]),
    ];
    for fill in [Fill::NonZero, Fill::EvenOdd] {
        compare("shapes_starting_on_tile_corners", &contours, 112, fill, 0.0);
    }
}

#[test]
fn edges_through_tile_corners() {
    // Each triangle has a diagonal passing exactly through tile corners.
    let contours = [
        Contour::closed([(8.0, 8.0), (56.0, 56.0), (8.0, 56.0)]),
        Contour::closed([(64.0, 16.0), (96.0, 16.0), (64.0, 48.0)]),
    ];
    compare("edges_through_tile_corners", &contours, 112, Fill::NonZero, 0.0);
}

#[test]
fn self_intersecting_star() {
    let star = [
        (64.0, 6.0),
        (99.3, 112.0),
        (8.5, 46.3),
        (119.5, 46.3),
        (28.7, 112.0),
    ];
    let contours = [Contour::closed(star)];
    // Area coverage only deviates from exact coverage where edges cross.
    compare("star_nonzero", &contours, 128, Fill::NonZero, 0.005);
    compare("star_even_odd", &contours, 128, Fill::EvenOdd, 0.005);
}

#[test]
fn curves_with_holes() {
    let mut path = BezPath::new();
    path.move_to((20.0, 20.0));
    path.curve_to((90.0, -10.0), (150.0, 60.0), (110.0, 110.0));
    path.quad_to((60.0, 140.0), (20.0, 100.0));
    path.close_path();
    path.move_to((50.0, 50.0));
    path.line_to((50.0, 80.0));
    path.line_to((80.0, 80.0));
    path.line_to((80.0, 50.0));
    path.close_path();
    let contours = fill_contours(path, Affine::IDENTITY, DEFAULT_TOLERANCE);
    assert_eq!(contours.len(), 2);
    compare("curves_with_holes", &contours, 144, Fill::NonZero, 0.0013);
    compare("curves_with_holes_even_odd", &contours, 144, Fill::EvenOdd, 0.0013);
}

#[test]
fn transformed_geometry() {
    let transform = Affine::rotate(0.4).then_translate((60.0, 10.0).into());
    let rect = Rect::new(0.0, 0.0, 70.0, 45.0);
    let contours = fill_contours(
        rect.path_elements(DEFAULT_TOLERANCE),
        transform,
        DEFAULT_TOLERANCE,
    );
    compare("transformed_geometry", &contours, 128, Fill::NonZero, 0.0013);
}
