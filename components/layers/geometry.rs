/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Geometry helpers shared by clipping, painting and hit-testing.
//!
//! Box-space geometry is kept in `Au` (app units, 1/60th of a CSS pixel);
//! transform math happens in `f32` and converts back at the boundary.

use app_units::{Au, MAX_AU, MIN_AU};
use euclid::default::{Point2D, Point3D, Rect, Size2D, Transform3D, Vector2D};

/// A rectangle large enough to stand in for "no clipping at all". The root
/// layer's clip is defined as this rectangle.
#[inline]
pub fn max_rect() -> Rect<Au> {
    Rect::new(
        Point2D::new(MIN_AU / 2, MIN_AU / 2),
        Size2D::new(MAX_AU, MAX_AU),
    )
}

pub fn au_rect_to_f32_rect(rect: Rect<Au>) -> Rect<f32> {
    Rect::new(
        Point2D::new(rect.origin.x.to_f32_px(), rect.origin.y.to_f32_px()),
        Size2D::new(
            rect.size.width.to_f32_px(),
            rect.size.height.to_f32_px(),
        ),
    )
}

pub fn f32_rect_to_au_rect(rect: Rect<f32>) -> Rect<Au> {
    Rect::new(
        Point2D::new(Au::from_f32_px(rect.origin.x), Au::from_f32_px(rect.origin.y)),
        Size2D::new(
            Au::from_f32_px(rect.size.width),
            Au::from_f32_px(rect.size.height),
        ),
    )
}

pub fn au_point_to_f32_point(point: Point2D<Au>) -> Point2D<f32> {
    Point2D::new(point.x.to_f32_px(), point.y.to_f32_px())
}

pub fn f32_point_to_au_point(point: Point2D<f32>) -> Point2D<Au> {
    Point2D::new(Au::from_f32_px(point.x), Au::from_f32_px(point.y))
}

pub fn au_vector_to_f32_vector(vector: Vector2D<Au>) -> Vector2D<f32> {
    Vector2D::new(vector.x.to_f32_px(), vector.y.to_f32_px())
}

/// Maps a point through `transform`, projecting onto the 2D plane. Returns
/// `None` when the point cannot be represented after projection (the plane is
/// perpendicular to the viewer or behind the eye).
pub fn project_point(transform: &Transform3D<f32>, point: Point2D<Au>) -> Option<Point2D<Au>> {
    transform
        .transform_point2d(au_point_to_f32_point(point))
        .map(f32_point_to_au_point)
}

/// Maps a rectangle through `transform` by projecting its corners and taking
/// their bounding box. Returns `None` when any corner fails to project.
pub fn project_rect(transform: &Transform3D<f32>, rect: &Rect<Au>) -> Option<Rect<Au>> {
    let rect = au_rect_to_f32_rect(*rect);
    let corners = [
        rect.origin,
        Point2D::new(rect.max_x(), rect.min_y()),
        Point2D::new(rect.min_x(), rect.max_y()),
        Point2D::new(rect.max_x(), rect.max_y()),
    ];

    let mut min = Point2D::new(f32::MAX, f32::MAX);
    let mut max = Point2D::new(f32::MIN, f32::MIN);
    for corner in &corners {
        let mapped = transform.transform_point2d(*corner)?;
        min = min.min(mapped);
        max = max.max(mapped);
    }
    Some(f32_rect_to_au_rect(Rect::new(
        min,
        Size2D::new(max.x - min.x, max.y - min.y),
    )))
}

/// The depth at which `point`, taken on the local z = 0 plane, ends up after
/// `transform`. Used to order hit-test candidates inside 3D rendering
/// contexts.
pub fn mapped_depth(transform: &Transform3D<f32>, point: Point2D<Au>) -> f32 {
    let point = Point3D::new(point.x.to_f32_px(), point.y.to_f32_px(), 0.0);
    transform.transform_point3d(point).map_or(0.0, |p| p.z)
}

/// Whether a viewer in front of the plane sees the back of content drawn
/// with `transform` applied. The sign of the inverted z basis tells us which
/// way the plane normal ended up facing.
pub fn is_back_face_visible(transform: &Transform3D<f32>) -> bool {
    transform.inverse().is_some_and(|inverse| inverse.m33 < 0.0)
}

/// Whether a transform moves content out of the z = 0 plane. Flat transforms
/// never participate in depth sorting.
pub fn has_3d_component(transform: &Transform3D<f32>) -> bool {
    !transform.is_2d()
}
