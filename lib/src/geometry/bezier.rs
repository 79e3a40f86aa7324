//! Cubic Bézier curves with fixed endpoints.
//!
//! Least-squares fitting with chord-length parameterization and
//! Newton-Raphson reparameterization.

use super::PointF;
use crate::CoordF;

/// 5-point Gauss-Legendre nodes on [-1, 1].
const GAUSS_NODES: [CoordF; 5] = [
    0.0,
    -0.538_469_310_105_683_1,
    0.538_469_310_105_683_1,
    -0.906_179_845_938_664,
    0.906_179_845_938_664,
];

/// 5-point Gauss-Legendre weights matching [`GAUSS_NODES`].
const GAUSS_WEIGHTS: [CoordF; 5] = [
    0.568_888_888_888_888_9,
    0.478_628_670_499_366_5,
    0.478_628_670_499_366_5,
    0.236_926_885_056_189_1,
    0.236_926_885_056_189_1,
];

/// A cubic Bézier curve.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CubicBezier {
    /// Start point.
    pub p0: PointF,
    /// First control point.
    pub p1: PointF,
    /// Second control point.
    pub p2: PointF,
    /// End point.
    pub p3: PointF,
}

impl CubicBezier {
    /// Create a new curve from its four points.
    pub const fn new(p0: PointF, p1: PointF, p2: PointF, p3: PointF) -> Self {
        Self { p0, p1, p2, p3 }
    }

    /// A straight line expressed as a cubic.
    pub fn line(start: PointF, end: PointF) -> Self {
        let d = end - start;
        Self::new(start, start + d * (1.0 / 3.0), start + d * (2.0 / 3.0), end)
    }

    /// Point at parameter `t`.
    pub fn eval(&self, t: CoordF) -> PointF {
        let mt = 1.0 - t;
        let b0 = mt * mt * mt;
        let b1 = 3.0 * mt * mt * t;
        let b2 = 3.0 * mt * t * t;
        let b3 = t * t * t;
        PointF::new(
            b0 * self.p0.x + b1 * self.p1.x + b2 * self.p2.x + b3 * self.p3.x,
            b0 * self.p0.y + b1 * self.p1.y + b2 * self.p2.y + b3 * self.p3.y,
        )
    }

    /// First derivative at parameter `t`.
    pub fn derivative(&self, t: CoordF) -> PointF {
        let mt = 1.0 - t;
        let d0 = self.p1 - self.p0;
        let d1 = self.p2 - self.p1;
        let d2 = self.p3 - self.p2;
        (d0 * (mt * mt) + d1 * (2.0 * mt * t) + d2 * (t * t)) * 3.0
    }

    /// Second derivative at parameter `t`.
    pub fn second_derivative(&self, t: CoordF) -> PointF {
        let a = self.p2 - self.p1 * 2.0 + self.p0;
        let b = self.p3 - self.p2 * 2.0 + self.p1;
        (a * (1.0 - t) + b * t) * 6.0
    }

    /// Arc length between two parameters (Gauss-Legendre quadrature).
    pub fn length_between(&self, t0: CoordF, t1: CoordF) -> CoordF {
        let half = 0.5 * (t1 - t0);
        let mid = 0.5 * (t1 + t0);
        GAUSS_NODES
            .iter()
            .zip(GAUSS_WEIGHTS.iter())
            .map(|(x, w)| w * self.derivative(mid + half * x).length())
            .sum::<CoordF>()
            * half
    }

    /// Arc length over a parameter partition, summed interval by interval.
    pub fn length_over(&self, t_values: &[CoordF]) -> CoordF {
        t_values
            .windows(2)
            .map(|w| self.length_between(w[0], w[1]))
            .sum()
    }

    /// Least-squares fit of the inner control points with fixed endpoints.
    ///
    /// `t_values` gives the curve parameter of every point. Falls back to a
    /// straight line when the normal equations are singular.
    pub fn fit(points: &[PointF], t_values: &[CoordF]) -> Self {
        let n = points.len();
        let start = points[0];
        let end = points[n - 1];

        let mut a11 = 0.0;
        let mut a12 = 0.0;
        let mut a22 = 0.0;
        let mut bx1 = 0.0;
        let mut by1 = 0.0;
        let mut bx2 = 0.0;
        let mut by2 = 0.0;

        for (p, &t) in points.iter().zip(t_values) {
            let mt = 1.0 - t;
            let b0 = mt * mt * mt;
            let b1 = 3.0 * mt * mt * t;
            let b2 = 3.0 * mt * t * t;
            let b3 = t * t * t;

            a11 += b1 * b1;
            a12 += b1 * b2;
            a22 += b2 * b2;

            let rx = p.x - b0 * start.x - b3 * end.x;
            let ry = p.y - b0 * start.y - b3 * end.y;

            bx1 += b1 * rx;
            by1 += b1 * ry;
            bx2 += b2 * rx;
            by2 += b2 * ry;
        }

        let det = a11 * a22 - a12 * a12;
        if det.abs() < 1e-12 {
            // Too few interior points to separate the controls; fit one shared control
            let shared = a11 + 2.0 * a12 + a22;
            if shared < 1e-12 {
                return Self::line(start, end);
            }
            let control = PointF::new((bx1 + bx2) / shared, (by1 + by2) / shared);
            return Self::new(start, control, control, end);
        }

        let inv_det = 1.0 / det;
        let control1 = PointF::new(
            (a22 * bx1 - a12 * bx2) * inv_det,
            (a22 * by1 - a12 * by2) * inv_det,
        );
        let control2 = PointF::new(
            (a11 * bx2 - a12 * bx1) * inv_det,
            (a11 * by2 - a12 * by1) * inv_det,
        );

        Self::new(start, control1, control2, end)
    }

    /// Fit with up to `iterations` Newton-Raphson reparameterization passes.
    ///
    /// Returns the curve with the smallest maximum deviation together with the
    /// parameterization it was fitted on.
    pub fn fit_refined(points: &[PointF], iterations: usize) -> (Self, Vec<CoordF>) {
        let mut t_values = chord_length_parameterize(points);
        let mut best = Self::fit(points, &t_values);
        let mut best_err = best.max_deviation(points, &t_values);

        for _ in 0..iterations {
            let new_t = best.reparameterize(points, &t_values);
            let candidate = Self::fit(points, &new_t);
            let err = candidate.max_deviation(points, &new_t);
            if err < best_err {
                best = candidate;
                best_err = err;
                t_values = new_t;
            } else {
                break;
            }
        }

        (best, t_values)
    }

    /// Newton-Raphson step towards the parameter of the closest curve point.
    fn reparameterize(&self, points: &[PointF], t_values: &[CoordF]) -> Vec<CoordF> {
        let mut new_t = t_values.to_vec();
        let last = points.len() - 1;
        for i in 1..last {
            let t = t_values[i];
            let diff = self.eval(t) - points[i];
            let d1 = self.derivative(t);
            let d2 = self.second_derivative(t);

            let numerator = diff.x * d1.x + diff.y * d1.y;
            let denominator = d1.x * d1.x + d1.y * d1.y + diff.x * d2.x + diff.y * d2.y;

            if denominator.abs() > 1e-12 {
                new_t[i] = (t - numerator / denominator).clamp(0.0, 1.0);
            }
        }
        // Keep the parameterization strictly increasing
        for i in 1..new_t.len() {
            if new_t[i] <= new_t[i - 1] {
                new_t[i] = new_t[i - 1] + 1e-10;
            }
        }
        new_t[0] = 0.0;
        new_t[last] = 1.0;
        new_t
    }

    /// Maximum distance between the polyline and the curve.
    ///
    /// Every vertex and every chord midpoint is projected onto the curve,
    /// searching only the parameter range of its neighbouring points.
    pub fn max_deviation(&self, points: &[PointF], t_values: &[CoordF]) -> CoordF {
        let last = t_values.len().saturating_sub(1);
        let vertices = points.iter().enumerate().map(|(i, p)| {
            let lo = t_values[i.saturating_sub(1)];
            let hi = t_values[(i + 1).min(last)];
            self.distance_near(p, t_values[i], lo, hi)
        });
        let midpoints = points.windows(2).zip(t_values.windows(2)).map(|(p, t)| {
            let chord_mid = p[0].midpoint(&p[1]);
            self.distance_near(&chord_mid, 0.5 * (t[0] + t[1]), t[0], t[1])
        });
        vertices.chain(midpoints).fold(0.0, CoordF::max)
    }

    /// Distance from `point` to the curve, refining `t` within `[lo, hi]`.
    fn distance_near(&self, point: &PointF, t: CoordF, lo: CoordF, hi: CoordF) -> CoordF {
        let mut t = t;
        for _ in 0..PROJECTION_STEPS {
            let diff = self.eval(t) - *point;
            let d1 = self.derivative(t);
            let d2 = self.second_derivative(t);
            let denominator = d1.x * d1.x + d1.y * d1.y + diff.x * d2.x + diff.y * d2.y;
            if denominator.abs() <= 1e-12 {
                break;
            }
            t = (t - (diff.x * d1.x + diff.y * d1.y) / denominator).clamp(lo, hi);
        }
        self.eval(t).distance(point)
    }
}

/// Newton steps used when projecting a point onto the curve.
const PROJECTION_STEPS: usize = 4;

/// Chord-length parameterization of a polyline onto [0, 1].
pub fn chord_length_parameterize(points: &[PointF]) -> Vec<CoordF> {
    let n = points.len();
    let mut t = vec![0.0; n];
    for i in 1..n {
        t[i] = t[i - 1] + points[i].distance(&points[i - 1]);
    }
    let total = t[n - 1];
    if total > 0.0 {
        for ti in t.iter_mut() {
            *ti /= total;
        }
    }
    if n > 1 {
        t[n - 1] = 1.0;
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_line_length() {
        let curve = CubicBezier::line(PointF::new(0.0, 0.0), PointF::new(3.0, 4.0));
        assert!((curve.length_between(0.0, 1.0) - 5.0).abs() < 1e-9);
        assert!(curve.eval(0.5).approx_eq(&PointF::new(1.5, 2.0), 1e-12));
    }

    #[test]
    fn test_chord_length_parameterize() {
        let points = vec![
            PointF::new(0.0, 0.0),
            PointF::new(1.0, 0.0),
            PointF::new(4.0, 0.0),
        ];
        let t = chord_length_parameterize(&points);
        assert_eq!(t, vec![0.0, 0.25, 1.0]);
    }

    #[test]
    fn test_fit_recovers_cubic() {
        let original = CubicBezier::new(
            PointF::new(0.0, 0.0),
            PointF::new(2.0, 6.0),
            PointF::new(8.0, 6.0),
            PointF::new(10.0, 0.0),
        );
        let t_values: Vec<f64> = (0..=10).map(|i| i as f64 / 10.0).collect();
        let points: Vec<PointF> = t_values.iter().map(|&t| original.eval(t)).collect();

        let fitted = CubicBezier::fit(&points, &t_values);

        assert!(fitted.p1.approx_eq(&original.p1, 1e-9));
        assert!(fitted.p2.approx_eq(&original.p2, 1e-9));
    }

    #[test]
    fn test_fit_refined_quarter_circle() {
        let points: Vec<PointF> = (0..=9)
            .map(|i| {
                let a = (i as f64) * PI / 18.0;
                PointF::new(10.0 * a.cos(), 10.0 * a.sin())
            })
            .collect();

        let (curve, t_values) = CubicBezier::fit_refined(&points, 4);

        assert!(curve.max_deviation(&points, &t_values) < 0.05);
        let length = curve.length_over(&t_values);
        assert!((length - 10.0 * PI / 2.0).abs() < 0.05);
    }

    #[test]
    fn test_fit_single_interior_point() {
        let points = vec![
            PointF::new(0.0, 0.0),
            PointF::new(1.0, 0.5),
            PointF::new(2.0, 0.0),
        ];
        let t_values = chord_length_parameterize(&points);
        let curve = CubicBezier::fit(&points, &t_values);

        assert_eq!(curve.p1, curve.p2);
        assert!(curve.eval(0.5).approx_eq(&points[1], 1e-9));
    }

    #[test]
    fn test_fit_collinear_is_straight() {
        let points: Vec<PointF> = (0..5).map(|i| PointF::new(i as f64, 0.0)).collect();
        let t_values = chord_length_parameterize(&points);
        let curve = CubicBezier::fit(&points, &t_values);
        assert!(curve.max_deviation(&points, &t_values) < 1e-9);
        assert!((curve.length_over(&t_values) - 4.0).abs() < 1e-9);
    }
}
