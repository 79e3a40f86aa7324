//! Circle construction and fitting.

use super::PointF;
use crate::CoordF;

/// Determinants below this are treated as collinear input.
const COLLINEAR_EPSILON: CoordF = 1e-10;

/// A circle in the XY plane.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Circle {
    /// Center point.
    pub center: PointF,
    /// Radius (mm).
    pub radius: CoordF,
}

impl Circle {
    /// Create a new circle.
    pub const fn new(center: PointF, radius: CoordF) -> Self {
        Self { center, radius }
    }

    /// Find the circle passing through three points.
    ///
    /// Uses the perpendicular bisector method. Returns `None` for collinear
    /// (or coincident) points.
    pub fn from_three_points(p1: PointF, p2: PointF, p3: PointF) -> Option<Self> {
        let ax = p1.x;
        let ay = p1.y;
        let bx = p2.x;
        let by = p2.y;
        let cx = p3.x;
        let cy = p3.y;

        let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));

        if d.abs() < COLLINEAR_EPSILON {
            return None;
        }

        let ux = ((ax * ax + ay * ay) * (by - cy)
            + (bx * bx + by * by) * (cy - ay)
            + (cx * cx + cy * cy) * (ay - by))
            / d;

        let uy = ((ax * ax + ay * ay) * (cx - bx)
            + (bx * bx + by * by) * (ax - cx)
            + (cx * cx + cy * cy) * (bx - ax))
            / d;

        let center = PointF::new(ux, uy);
        let radius = center.distance(&p1);
        Self::finite(center, radius)
    }

    /// Algebraic (Kåsa) least-squares circle fit over all points.
    ///
    /// Solved in mean-centered coordinates to keep the normal equations well
    /// conditioned far from the origin. Returns `None` for fewer than three
    /// points or when the system is singular (collinear input).
    pub fn least_squares(points: &[PointF]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }

        let n = points.len() as CoordF;
        let mean_x = points.iter().map(|p| p.x).sum::<CoordF>() / n;
        let mean_y = points.iter().map(|p| p.y).sum::<CoordF>() / n;

        let mut suu = 0.0;
        let mut svv = 0.0;
        let mut suv = 0.0;
        let mut suuu = 0.0;
        let mut svvv = 0.0;
        let mut suvv = 0.0;
        let mut svuu = 0.0;

        for p in points {
            let u = p.x - mean_x;
            let v = p.y - mean_y;
            suu += u * u;
            svv += v * v;
            suv += u * v;
            suuu += u * u * u;
            svvv += v * v * v;
            suvv += u * v * v;
            svuu += v * u * u;
        }

        let det = suu * svv - suv * suv;
        if det.abs() <= COLLINEAR_EPSILON * (suu * svv).max(COLLINEAR_EPSILON) {
            return None;
        }

        let b1 = 0.5 * (suuu + suvv);
        let b2 = 0.5 * (svvv + svuu);
        let uc = (b1 * svv - b2 * suv) / det;
        let vc = (b2 * suu - b1 * suv) / det;

        let radius = (uc * uc + vc * vc + (suu + svv) / n).sqrt();
        Self::finite(PointF::new(uc + mean_x, vc + mean_y), radius)
    }

    fn finite(center: PointF, radius: CoordF) -> Option<Self> {
        if center.x.is_finite() && center.y.is_finite() && radius.is_finite() && radius > 0.0 {
            Some(Self { center, radius })
        } else {
            None
        }
    }

    /// Distance of a point from the circle's perimeter.
    #[inline]
    pub fn deviation(&self, point: &PointF) -> CoordF {
        (self.center.distance(point) - self.radius).abs()
    }

    /// Maximum deviation of a polyline from the circle.
    ///
    /// Both the vertices and the midpoint of every chord are measured, since a
    /// long chord can leave the circle even when its endpoints sit on it.
    pub fn max_deviation(&self, points: &[PointF]) -> CoordF {
        let vertices = points.iter().map(|p| self.deviation(p));
        let midpoints = points
            .windows(2)
            .map(|w| self.deviation(&w[0].midpoint(&w[1])));
        vertices.chain(midpoints).fold(0.0, CoordF::max)
    }
}
