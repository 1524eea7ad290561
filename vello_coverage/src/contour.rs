// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flattened input contours.

use crate::util::Vec2;
use peniko::kurbo::{self, Affine, PathEl};

/// Flattening tolerance used by [`fill_contours`] callers that have no better choice.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// An ordered sequence of device-space points.
///
/// A closed contour has an implicit edge from its last point back to its first.
/// An open contour only contributes the edges between consecutive points, which
/// is useful when a caller already splits one closed outline into several
/// pieces; the pieces together must still close for the winding to balance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contour {
    pub points: Vec<Vec2>,
    pub closed: bool,
}

impl Contour {
    pub fn new(points: Vec<Vec2>, closed: bool) -> Self {
        Self { points, closed }
    }

    /// Create a closed contour from any sequence of points.
    pub fn closed<P: Into<Vec2>>(points: impl IntoIterator<Item = P>) -> Self {
        Self::new(points.into_iter().map(Into::into).collect(), true)
    }

    /// Create an open contour from any sequence of points.
    pub fn open<P: Into<Vec2>>(points: impl IntoIterator<Item = P>) -> Self {
        Self::new(points.into_iter().map(Into::into).collect(), false)
    }

    /// The directed edges of this contour, including the closing edge of a closed contour.
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let closing = match (self.closed, self.points.first(), self.points.last()) {
            (true, Some(&first), Some(&last)) if self.points.len() > 1 => Some((last, first)),
            _ => None,
        };
        self.points
            .windows(2)
            .map(|w| (w[0], w[1]))
            .chain(closing)
    }

    pub fn edge_count(&self) -> usize {
        let n = self.points.len();
        match n {
            0 | 1 => 0,
            _ if self.closed => n,
            _ => n - 1,
        }
    }
}

/// The device-space bounding box `[x0, y0, x1, y1]` of all finite points.
///
/// Returns `None` if there are no finite points.
pub fn bounds(contours: &[Contour]) -> Option<[f32; 4]> {
    let mut points = contours
        .iter()
        .flat_map(|c| c.points.iter().copied())
        .filter(|p| p.is_finite());
    let first = points.next()?;
    let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
    Some([min.x, min.y, max.x, max.y])
}

/// Flatten a path into closed contours for filling.
///
/// Curve flattening is delegated to [`kurbo::flatten`]. Every subpath is closed,
/// as it would be for any fill.
pub fn fill_contours(
    path: impl IntoIterator<Item = PathEl>,
    transform: Affine,
    tolerance: f64,
) -> Vec<Contour> {
    let mut contours = Vec::new();
    let mut current: Option<Contour> = None;
    kurbo::flatten(
        path.into_iter().map(|el| transform * el),
        tolerance,
        |el| match el {
            PathEl::MoveTo(p) => {
                if let Some(c) = current.take() {
                    contours.push(c);
                }
                current = Some(Contour::new(vec![p.into()], true));
            }
            PathEl::LineTo(p) => {
                current
                    .get_or_insert_with(|| Contour::new(vec![], true))
                    .points
                    .push(p.into());
            }
            PathEl::ClosePath => {
                if let Some(c) = current.take() {
                    contours.push(c);
                }
            }
            // `flatten` only emits the variants above.
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
        },
    );
    if let Some(c) = current.take() {
        contours.push(c);
    }
    contours.retain(|c| c.points.len() > 1);
    contours
}
