//! Geometry primitives for curve fitting.
//!
//! This module provides the floating-point types and fitting helpers used by
//! the arc and spline solvers:
//! - [`PointF`] and [`Point3F`] - 2D and 3D points (mm)
//! - [`Circle`] - circle through three points, or least-squares fit over many
//! - [`CubicBezier`] - cubic Bézier evaluation, length and least-squares fit
//!
//! All coordinates are unscaled millimeters as they appear in G-code.

mod bezier;
mod circle;
mod point;

pub use bezier::{chord_length_parameterize, CubicBezier};
pub use circle::Circle;
pub use point::{Point3F, PointF};

use crate::CoordF;

/// Calculate the cross product of two 2D vectors (returns a scalar).
/// Positive when `v2` turns counter-clockwise from `v1`.
#[inline]
pub fn cross2f(v1: PointF, v2: PointF) -> CoordF {
    v1.x * v2.y - v1.y * v2.x
}

/// Calculate the dot product of two 2D vectors.
#[inline]
pub fn dot2f(v1: PointF, v2: PointF) -> CoordF {
    v1.x * v2.x + v1.y * v2.y
}

/// Signed angle from `v1` to `v2` in radians, in `(-PI, PI]`.
/// Counter-clockwise is positive.
pub fn angle_between(v1: PointF, v2: PointF) -> CoordF {
    let dot = dot2f(v1, v2);
    let cross = cross2f(v1, v2);
    cross.atan2(dot)
}

/// Check if a value is approximately equal to another within epsilon.
#[inline]
pub fn approx_eq(a: CoordF, b: CoordF, epsilon: CoordF) -> bool {
    (a - b).abs() < epsilon
}

/// Check if a value is within epsilon of zero.
#[inline]
pub fn is_zero(v: CoordF, epsilon: CoordF) -> bool {
    v.abs() < epsilon
}

/// Combine a planar length with a Z rise into a helical length.
#[inline]
pub fn helical_length(planar: CoordF, dz: CoordF) -> CoordF {
    if dz == 0.0 {
        planar
    } else {
        (planar * planar + dz * dz).sqrt()
    }
}
