//! Cubic spline model and solver (G5).
//!
//! The spline is a cubic Bézier pinned to the first and last buffered points.
//! Its inner control points come from a least-squares fit, so unlike arcs it
//! can follow paths with an inflection.

use super::shape::Curve;
use super::{Command, PointBuffer, PrinterPoint};
use crate::config::ShapeConfig;
use crate::geometry::{approx_eq, helical_length, CubicBezier, PointF};
use crate::CoordF;

/// Newton-Raphson reparameterization passes per fit.
const REFINEMENT_PASSES: usize = 4;

/// A fitted cubic spline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spline {
    /// First point of the shape.
    pub start_point: PrinterPoint,
    /// Last point of the shape.
    pub end_point: PrinterPoint,
    /// Fitted curve in the XY plane.
    pub curve: CubicBezier,
    /// Curve length (mm), including Z travel when 3D shapes are allowed.
    pub length: CoordF,
    /// Largest distance of any point or chord midpoint from the curve (mm).
    pub max_deviation: CoordF,
}

impl Spline {
    /// Fit a spline to every buffered point.
    pub fn try_create(points: &PointBuffer, config: &ShapeConfig) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let start_point = *points.first()?;
        let end_point = *points.last()?;

        if !config.allow_3d
            && points
                .iter()
                .any(|p| !approx_eq(p.z, start_point.z, config.xyz_tolerance()))
        {
            return None;
        }

        let original_length = points.original_length();
        if !(original_length > 0.0) {
            return None;
        }

        let xy = points.xy_points();
        let (curve, t_values) = CubicBezier::fit_refined(&xy, REFINEMENT_PASSES);

        let max_deviation = curve.max_deviation(&xy, &t_values);
        if !(max_deviation <= config.resolution_mm) {
            return None;
        }

        let planar = curve.length_over(&t_values);
        let length = if config.allow_3d {
            helical_length(planar, end_point.z - start_point.z)
        } else {
            planar
        };
        if (length - original_length).abs() / original_length > config.path_tolerance_percent {
            return None;
        }

        Some(Self {
            start_point,
            end_point,
            curve,
            length,
            max_deviation,
        })
    }

    /// Offset from the start point to the first control point.
    pub fn start_control_offset(&self) -> PointF {
        self.curve.p1 - self.curve.p0
    }

    /// Offset from the end point to the second control point.
    pub fn end_control_offset(&self) -> PointF {
        self.curve.p2 - self.curve.p3
    }
}

impl Curve for Spline {
    const NAME: &'static str = "Spline";

    fn try_fit(points: &PointBuffer, config: &ShapeConfig) -> Option<Self> {
        Self::try_create(points, config)
    }

    fn length(&self) -> CoordF {
        self.length
    }

    fn start_point(&self) -> &PrinterPoint {
        &self.start_point
    }

    fn end_point(&self) -> &PrinterPoint {
        &self.end_point
    }

    fn begin_command(&self, config: &ShapeConfig) -> Command {
        let precision = config.xyz_precision;
        let has_z = config.allow_3d
            && !approx_eq(self.start_point.z, self.end_point.z, config.xyz_tolerance());

        // Control point terms (I, J, P, Q) are not emitted yet
        let mut cmd = Command::new("G5");
        cmd.push('X', self.end_point.x, precision);
        cmd.push('Y', self.end_point.y, precision);
        cmd.push_if(has_z, 'Z', self.end_point.z, precision);
        cmd
    }

    fn is_degenerate(&self, tolerance: CoordF) -> bool {
        self.length < tolerance
    }
}
