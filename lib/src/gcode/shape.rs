//! Incremental shape accumulator.
//!
//! A [`SegmentedShape`] grows one point at a time. Every accepted point leaves
//! a curve fitted to the whole buffer; every rejected point leaves the
//! accumulator exactly as it was before the call, so the caller can emit the
//! current shape and start a new one from its end point.

use super::{BufferMark, Command, PointBuffer, PrinterPoint};
use super::{Arc, Spline};
use crate::config::ShapeConfig;
use crate::CoordF;
use std::fmt::Debug;

/// A curve family that can replace a run of linear moves.
pub trait Curve: Clone + Default + PartialEq + Debug {
    /// Human readable name, used in log output.
    const NAME: &'static str;

    /// Fit a curve to every point in the buffer, or `None` if the points
    /// cannot be represented within the configured tolerances.
    fn try_fit(points: &PointBuffer, config: &ShapeConfig) -> Option<Self>;

    /// Curve length (mm).
    fn length(&self) -> CoordF;

    /// First point of the shape.
    fn start_point(&self) -> &PrinterPoint;

    /// Last point of the shape.
    fn end_point(&self) -> &PrinterPoint;

    /// Command keyword and geometry terms, without E and F.
    fn begin_command(&self, config: &ShapeConfig) -> Command;

    /// Whether the controller would render the curve too coarsely.
    fn needs_firmware_compensation(
        &self,
        _config: &ShapeConfig,
        _original_length: CoordF,
    ) -> bool {
        false
    }

    /// Whether the fitted curve is too small to be meaningful.
    fn is_degenerate(&self, tolerance: CoordF) -> bool;
}

/// Rejection counters for one accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShapeStats {
    /// Fits rejected because the command exceeded `max_gcode_length`.
    pub gcode_length_exceptions: usize,
    /// Fits rejected by firmware compensation.
    pub firmware_compensations: usize,
}

/// Everything a rejected attempt has to restore.
struct Checkpoint<C> {
    curve: C,
    mark: BufferMark,
    e_relative: CoordF,
}

/// Accumulates points into a single curve command.
///
/// # Example
///
/// ```
/// use arc_welder::{PrinterPoint, SegmentedArc, ShapeConfig};
///
/// let mut arc = SegmentedArc::new(ShapeConfig::default());
/// let mut previous: Option<PrinterPoint> = None;
/// for i in 0..=9 {
///     let a = (i as f64 * 10.0).to_radians();
///     let mut p = PrinterPoint::new(10.0 * a.cos(), 10.0 * a.sin(), 0.2);
///     p.distance = previous.map_or(0.0, |q| q.xy().distance(&p.xy()));
///     assert!(arc.try_add_point(p));
///     previous = Some(p);
/// }
/// assert!(arc.is_shape());
/// assert!(arc.gcode().starts_with("G3 "));
/// assert_eq!(arc.gcode_length(), arc.gcode().len());
/// ```
#[derive(Debug, Clone)]
pub struct SegmentedShape<C: Curve> {
    config: ShapeConfig,
    points: PointBuffer,
    curve: C,
    /// Filament extruded along the shape (second point onwards).
    e_relative: CoordF,
    is_shape: bool,
    stats: ShapeStats,
}

/// Accumulator producing G2/G3 arcs.
pub type SegmentedArc = SegmentedShape<Arc>;

/// Accumulator producing G5 splines.
pub type SegmentedSpline = SegmentedShape<Spline>;

impl<C: Curve> SegmentedShape<C> {
    /// Create an empty accumulator. The configuration is clamped once here.
    pub fn new(config: ShapeConfig) -> Self {
        let config = config.clamped();
        Self {
            points: PointBuffer::with_capacity(config.max_segments.saturating_add(1)),
            config,
            curve: C::default(),
            e_relative: 0.0,
            is_shape: false,
            stats: ShapeStats::default(),
        }
    }

    /// Offer the next point of the path.
    ///
    /// Returns `true` if the point now belongs to the shape. On `false` the
    /// accumulator is unchanged.
    pub fn try_add_point(&mut self, point: PrinterPoint) -> bool {
        if self.points.len() >= self.config.max_segments {
            log::trace!(
                "{} rejected point: {} points is the maximum",
                C::NAME,
                self.config.max_segments
            );
            return false;
        }

        // Not enough points to fit anything yet
        if self.points.len() + 1 < self.config.min_segments {
            if !self.points.is_empty() {
                self.e_relative += point.e_relative;
            }
            self.points.push(point);
            return true;
        }

        let checkpoint = self.checkpoint();
        self.points.push(point);
        self.e_relative += point.e_relative;

        let Some(curve) = C::try_fit(&self.points, &self.config) else {
            log::trace!(
                "{} rejected point ({:.3}, {:.3}): no fit over {} points",
                C::NAME,
                point.x,
                point.y,
                self.points.len()
            );
            self.rollback(checkpoint);
            return false;
        };
        self.curve = curve;

        let mut rejected = false;
        if self.config.max_gcode_length > 0 {
            let predicted = self.gcode_length();
            if predicted > self.config.max_gcode_length {
                log::trace!(
                    "{} rejected point: command length {} exceeds {}",
                    C::NAME,
                    predicted,
                    self.config.max_gcode_length
                );
                self.stats.gcode_length_exceptions += 1;
                rejected = true;
            }
        }
        if self
            .curve
            .needs_firmware_compensation(&self.config, self.points.original_length())
        {
            log::trace!("{} rejected point: firmware compensation", C::NAME);
            self.stats.firmware_compensations += 1;
            rejected = true;
        }
        if !rejected && self.curve.is_degenerate(self.config.xyz_tolerance()) {
            log::trace!("{} rejected point: degenerate curve", C::NAME);
            rejected = true;
        }

        if rejected {
            self.rollback(checkpoint);
            return false;
        }

        self.is_shape = true;
        true
    }

    fn checkpoint(&self) -> Checkpoint<C> {
        Checkpoint {
            curve: self.curve.clone(),
            mark: self.points.mark(),
            e_relative: self.e_relative,
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint<C>) {
        self.curve = checkpoint.curve;
        self.points.rewind(checkpoint.mark);
        self.e_relative = checkpoint.e_relative;
    }

    /// Length of the fitted curve (mm).
    pub fn length(&self) -> CoordF {
        self.curve.length()
    }

    /// The command for the current curve. Only meaningful once
    /// [`is_shape`](Self::is_shape) is true.
    pub fn command(&self) -> Command {
        let mut cmd = self.curve.begin_command(&self.config);
        let start = self.curve.start_point();
        let end = self.curve.end_point();

        let e = if end.is_extruder_relative {
            self.e_relative
        } else {
            end.e_offset
        };
        cmd.push_if(self.e_relative != 0.0, 'E', e, self.config.e_precision);

        let f = if start.f == end.f { 0.0 } else { end.f };
        cmd.push_if(f >= 1.0, 'F', f, 0);
        cmd
    }

    /// Rendered command text.
    pub fn gcode(&self) -> String {
        self.command().to_gcode()
    }

    /// Exact length of [`gcode`](Self::gcode), computed without rendering.
    pub fn gcode_length(&self) -> usize {
        self.command().rendered_len()
    }

    /// Whether the accumulated points form a valid shape.
    #[inline]
    pub fn is_shape(&self) -> bool {
        self.is_shape
    }

    /// Buffered points, in path order.
    #[inline]
    pub fn points(&self) -> &PointBuffer {
        &self.points
    }

    /// Number of buffered points.
    #[inline]
    pub fn num_segments(&self) -> usize {
        self.points.len()
    }

    /// Length of the polyline the shape replaces (mm).
    #[inline]
    pub fn original_shape_length(&self) -> CoordF {
        self.points.original_length()
    }

    /// Filament extruded along the shape.
    #[inline]
    pub fn shape_e_relative(&self) -> CoordF {
        self.e_relative
    }

    /// The current best fit.
    #[inline]
    pub fn curve(&self) -> &C {
        &self.curve
    }

    /// The clamped configuration in use.
    #[inline]
    pub fn config(&self) -> &ShapeConfig {
        &self.config
    }

    /// Rejection counters.
    #[inline]
    pub fn stats(&self) -> ShapeStats {
        self.stats
    }
}

impl SegmentedArc {
    /// Largest radius an arc may have (mm), after clamping.
    pub fn max_radius(&self) -> CoordF {
        self.config.max_radius_mm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_RADIUS_CEILING_MM;
    use crate::geometry::PointF;

    /// Points on a circle with distances filled in from the previous point.
    fn circle_points(
        center: PointF,
        radius: f64,
        start_deg: f64,
        step_deg: f64,
        count: usize,
    ) -> Vec<PrinterPoint> {
        let mut previous: Option<PrinterPoint> = None;
        (0..count)
            .map(|i| {
                let a = (start_deg + step_deg * i as f64).to_radians();
                let mut p = PrinterPoint::new(
                    center.x + radius * a.cos(),
                    center.y + radius * a.sin(),
                    0.2,
                )
                .with_feedrate(1800.0);
                p.distance = previous.map_or(0.0, |q| q.xy().distance(&p.xy()));
                previous = Some(p);
                p
            })
            .collect()
    }

    fn feed<C: Curve>(shape: &mut SegmentedShape<C>, points: &[PrinterPoint]) -> usize {
        points
            .iter()
            .take_while(|p| shape.try_add_point(**p))
            .count()
    }

    #[test]
    fn test_straight_line_rejected() {
        let mut arc = SegmentedArc::new(ShapeConfig::default());
        assert!(arc.try_add_point(PrinterPoint::new(0.0, 0.0, 0.2)));
        assert!(arc.try_add_point(PrinterPoint::new(1.0, 0.0, 0.2).with_distance(1.0)));
        assert!(!arc.try_add_point(PrinterPoint::new(2.0, 0.0, 0.2).with_distance(1.0)));

        assert!(!arc.is_shape());
        assert_eq!(arc.num_segments(), 2);
        assert!((arc.original_shape_length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_semicircle_accepted() {
        let points = circle_points(PointF::new(50.0, 50.0), 10.0, 0.0, 10.0, 19);
        let mut arc = SegmentedArc::new(ShapeConfig::default());

        assert_eq!(feed(&mut arc, &points), 19);
        assert!(arc.is_shape());
        assert!((arc.length() - 10.0 * std::f64::consts::PI).abs() < 1e-6);
        let original = arc.original_shape_length();
        assert!((arc.length() - original).abs() / original < 0.05);

        let cmd = arc.command();
        assert_eq!(cmd.keyword(), "G3");
        let i = cmd.term('I').unwrap().value;
        let j = cmd.term('J').unwrap().value;
        assert!(i.to_string() != "0.000" || j.to_string() != "0.000");
        assert_eq!(arc.gcode(), "G3 X40.000 Y50.000 I-10.000 J0.000");
        assert_eq!(arc.gcode_length(), arc.gcode().len());
    }

    #[test]
    fn test_rollback_leaves_state_unchanged() {
        let points = circle_points(PointF::new(0.0, 0.0), 10.0, 0.0, 10.0, 6);
        let mut arc = SegmentedArc::new(ShapeConfig::default());
        assert_eq!(feed(&mut arc, &points), 6);

        let before_points = arc.points().clone();
        let before_length = arc.original_shape_length();
        let before_curve = arc.curve().clone();
        let before_e = arc.shape_e_relative();
        let before_gcode = arc.gcode();

        let off_path = PrinterPoint::new(30.0, 30.0, 0.2)
            .with_distance(25.0)
            .with_extrusion(5.0, 1.0, true);
        assert!(!arc.try_add_point(off_path));

        assert_eq!(arc.points(), &before_points);
        assert_eq!(arc.original_shape_length().to_bits(), before_length.to_bits());
        assert_eq!(arc.curve(), &before_curve);
        assert_eq!(arc.shape_e_relative(), before_e);
        assert_eq!(arc.gcode(), before_gcode);
        assert!(arc.is_shape());
    }

    #[test]
    fn test_monotonic_acceptance() {
        let mut points = circle_points(PointF::new(0.0, 0.0), 10.0, 0.0, 10.0, 8);
        points.push(PrinterPoint::new(40.0, -5.0, 0.2).with_distance(40.0));
        points.extend(circle_points(PointF::new(0.0, 0.0), 10.0, 80.0, 10.0, 3));

        let mut arc = SegmentedArc::new(ShapeConfig::default());
        let mut was_shape = false;
        for p in points {
            arc.try_add_point(p);
            if was_shape {
                assert!(arc.is_shape());
            }
            was_shape = arc.is_shape();
        }
        assert!(was_shape);
    }

    #[test]
    fn test_prediction_matches_rendering() {
        let centers = [
            PointF::new(0.0, 0.0),
            PointF::new(-50.0, -50.0),
            PointF::new(123.4567, -0.0004),
        ];
        let extrusions = [0.0, 0.04, -0.02];
        let feedrates = [1800.0, 1200.0, 0.5];

        for &center in &centers {
            for &e in &extrusions {
                for &relative in &[true, false] {
                    for &end_f in &feedrates {
                        for &(xyz, e_precision) in &[(3u8, 5u8), (0, 0), (6, 6)] {
                            for &step in &[10.0, -10.0] {
                                let config = ShapeConfig::new().precision(xyz, e_precision);
                                let mut points = circle_points(center, 10.0, 30.0, step, 9);
                                let mut e_offset = 100.0;
                                for p in points.iter_mut().skip(1) {
                                    e_offset += e;
                                    *p = p.with_extrusion(e_offset, e, relative);
                                }
                                if let Some(last) = points.last_mut() {
                                    last.f = end_f;
                                }

                                let mut arc = SegmentedArc::new(config);
                                for p in points {
                                    if !arc.try_add_point(p) {
                                        break;
                                    }
                                    if arc.is_shape() {
                                        assert_eq!(arc.gcode_length(), arc.gcode().len());
                                    }
                                }
                                assert!(arc.is_shape());
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_extrusion_and_feedrate_terms() {
        let mut points = circle_points(PointF::new(0.0, 0.0), 10.0, 0.0, 10.0, 5);
        for p in points.iter_mut().skip(1) {
            *p = p.with_extrusion(0.0, 0.1, true);
        }
        let mut arc = SegmentedArc::new(ShapeConfig::default());
        assert_eq!(feed(&mut arc, &points), 5);
        assert!((arc.shape_e_relative() - 0.4).abs() < 1e-12);
        assert_eq!(arc.command().term('E').unwrap().to_string(), "E0.40000");
        assert!(arc.command().term('F').is_none());

        let mut points = circle_points(PointF::new(0.0, 0.0), 10.0, 0.0, 10.0, 5);
        for (i, p) in points.iter_mut().enumerate().skip(1) {
            *p = p.with_extrusion(10.0 + 0.1 * i as f64, 0.1, false);
        }
        if let Some(last) = points.last_mut() {
            last.f = 1200.0;
        }
        let mut arc = SegmentedArc::new(ShapeConfig::default());
        assert_eq!(feed(&mut arc, &points), 5);
        assert_eq!(arc.command().term('E').unwrap().to_string(), "E10.40000");
        assert_eq!(arc.command().term('F').unwrap().to_string(), "F1200");
    }

    #[test]
    fn test_gcode_length_cap() {
        let points = circle_points(PointF::new(50.0, 50.0), 10.0, 0.0, 10.0, 5);
        let mut arc = SegmentedArc::new(ShapeConfig::new().max_gcode_length(20));

        assert_eq!(feed(&mut arc, &points), 2);
        assert!(!arc.is_shape());
        assert_eq!(arc.stats().gcode_length_exceptions, 1);
        assert_eq!(arc.stats().firmware_compensations, 0);
    }

    #[test]
    fn test_firmware_compensation() {
        let points = circle_points(PointF::new(0.0, 0.0), 10.0, 0.0, 10.0, 25);
        let config = ShapeConfig::new().segments(20, 50).mm_per_segment(1.0);
        let mut arc = SegmentedArc::new(config);

        assert_eq!(feed(&mut arc, &points), 19);
        assert!(!arc.is_shape());
        assert_eq!(arc.num_segments(), 19);
        assert_eq!(arc.stats().firmware_compensations, 1);

        // The same points pass once compensation is off
        let mut arc = SegmentedArc::new(ShapeConfig::new().segments(20, 50));
        assert_eq!(feed(&mut arc, &points), 25);
        assert_eq!(arc.stats(), ShapeStats::default());
    }

    /// Everything a rejected point must leave untouched.
    fn snapshot(arc: &SegmentedArc) -> (PointBuffer, u64, Arc, u64, String, bool) {
        (
            arc.points().clone(),
            arc.original_shape_length().to_bits(),
            arc.curve().clone(),
            arc.shape_e_relative().to_bits(),
            arc.gcode(),
            arc.is_shape(),
        )
    }

    #[test]
    fn test_firmware_rejection_keeps_previous_arc() {
        let points = circle_points(PointF::new(0.0, 0.0), 1.0, 0.0, 10.0, 14);
        let mut arc = SegmentedArc::new(ShapeConfig::new().mm_per_segment(1.0));

        assert_eq!(feed(&mut arc, &points[..13]), 13);
        assert!(arc.is_shape());
        assert_eq!(arc.stats().firmware_compensations, 0);
        let before = snapshot(&arc);

        assert!(!arc.try_add_point(points[13]));
        assert_eq!(snapshot(&arc), before);
        assert_eq!(arc.stats().firmware_compensations, 1);
        assert_eq!(arc.gcode(), "G3 X-0.500 Y0.866 I-1.000 J0.000");
    }

    #[test]
    fn test_length_cap_rejection_keeps_previous_arc() {
        // Every end point up to 80 degrees renders in 32 characters; at 90
        // degrees Y gains a digit
        let points = circle_points(PointF::new(0.0, 0.0), 10.0, 0.0, 10.0, 10);
        let mut arc = SegmentedArc::new(ShapeConfig::new().max_gcode_length(32));

        assert_eq!(feed(&mut arc, &points[..9]), 9);
        assert!(arc.is_shape());
        assert_eq!(arc.gcode_length(), 32);
        let before = snapshot(&arc);

        assert!(!arc.try_add_point(points[9]));
        assert_eq!(snapshot(&arc), before);
        assert_eq!(arc.stats().gcode_length_exceptions, 1);
        assert_eq!(arc.gcode(), "G3 X1.736 Y9.848 I-10.000 J0.000");
    }

    #[test]
    fn test_huge_segment_limit_does_not_overflow() {
        let arc = SegmentedArc::new(ShapeConfig::new().segments(3, usize::MAX));
        assert_eq!(arc.config().max_segments, crate::config::MAX_SEGMENTS_CEILING);
        assert_eq!(arc.num_segments(), 0);
    }

    #[test]
    fn test_degenerate_arc_rejected() {
        let points = circle_points(PointF::new(0.0, 0.0), 0.0002, 0.0, 30.0, 7);
        let mut arc = SegmentedArc::new(ShapeConfig::default());

        assert_eq!(feed(&mut arc, &points), 2);
        assert!(!arc.is_shape());
        assert_eq!(arc.stats(), ShapeStats::default());
    }

    #[test]
    fn test_max_segments() {
        let points = circle_points(PointF::new(0.0, 0.0), 10.0, 0.0, 10.0, 8);
        let mut arc = SegmentedArc::new(ShapeConfig::new().segments(3, 5));

        assert_eq!(feed(&mut arc, &points), 5);
        assert_eq!(arc.num_segments(), 5);
        assert!(arc.is_shape());
    }

    #[test]
    fn test_radius_ceiling() {
        let arc = SegmentedArc::new(ShapeConfig::new().max_radius_mm(50_000.0));
        assert_eq!(arc.max_radius(), MAX_RADIUS_CEILING_MM);
        assert!(arc.max_radius() <= MAX_RADIUS_CEILING_MM);

        let arc = SegmentedArc::new(ShapeConfig::new().max_radius_mm(5.0));
        assert_eq!(arc.max_radius(), 5.0);

        let points = circle_points(PointF::new(0.0, 0.0), 10.0, 0.0, 10.0, 5);
        let mut arc = SegmentedArc::new(ShapeConfig::new().max_radius_mm(5.0));
        assert_eq!(feed(&mut arc, &points), 2);
    }

    #[test]
    fn test_spline_shape() {
        let mut shape = SegmentedSpline::new(ShapeConfig::default());
        let mut previous: Option<PrinterPoint> = None;
        for i in 0..=10 {
            let x = i as f64;
            let mut p = PrinterPoint::new(x, 0.004 * (x - 5.0).powi(3), 0.2);
            p.distance = previous.map_or(0.0, |q| q.xy().distance(&p.xy()));
            assert!(shape.try_add_point(p), "point {}", i);
            previous = Some(p);
        }
        assert!(shape.is_shape());
        assert!(shape.gcode().starts_with("G5 X10.000 Y"));
        assert_eq!(shape.gcode_length(), shape.gcode().len());
    }
}
