//! Circular arc model and solver (G2/G3).
//!
//! # Overview
//!
//! An arc is fitted to the full contents of a [`PointBuffer`]:
//! 1. The circle through the first, middle and last points is tried first
//! 2. If that misses any point by more than the resolution, a least-squares
//!    circle over all points is tried instead
//! 3. The signed sweep is accumulated point by point around the center; every
//!    step must turn the same way
//! 4. The arc length must match the original polyline length within the
//!    configured percentage
//!
//! The sign of the sweep selects the command: negative sweeps are clockwise
//! (G2), everything else counter-clockwise (G3).

use super::shape::Curve;
use super::{Command, PointBuffer, PrinterPoint};
use crate::config::ShapeConfig;
use crate::geometry::{angle_between, approx_eq, helical_length, is_zero, Circle, PointF};
use crate::CoordF;
use std::f64::consts::PI;

/// Direction of an arc (clockwise or counter-clockwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    /// Clockwise arc (G2)
    Clockwise,
    /// Counter-clockwise arc (G3)
    CounterClockwise,
}

impl ArcDirection {
    /// Direction encoded by a signed sweep angle.
    pub fn from_sweep(angle_radians: CoordF) -> Self {
        if angle_radians < 0.0 {
            ArcDirection::Clockwise
        } else {
            ArcDirection::CounterClockwise
        }
    }

    /// Returns the G-code command for this direction.
    pub fn gcode_command(&self) -> &'static str {
        match self {
            ArcDirection::Clockwise => "G2",
            ArcDirection::CounterClockwise => "G3",
        }
    }
}

/// A fitted arc.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arc {
    /// First point of the shape (the tool position before the arc).
    pub start_point: PrinterPoint,
    /// Last point of the shape.
    pub end_point: PrinterPoint,
    /// Circle center.
    pub center: PointF,
    /// Radius (mm).
    pub radius: CoordF,
    /// Signed sweep angle (radians). Negative is clockwise.
    pub angle_radians: CoordF,
    /// Arc length (mm), including Z travel for helical arcs.
    pub length: CoordF,
    /// Largest distance of any point or chord midpoint from the circle (mm).
    pub max_deviation: CoordF,
}

impl Arc {
    /// Fit an arc to every buffered point.
    ///
    /// Returns `None` if no circle within `max_radius_mm` passes within
    /// `resolution_mm` of the path, the path doubles back, or the arc length
    /// differs from the original length by more than `path_tolerance_percent`.
    pub fn try_create(points: &PointBuffer, config: &ShapeConfig) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let start_point = *points.first()?;
        let end_point = *points.last()?;
        let tolerance = config.xyz_tolerance();

        if !config.allow_3d
            && points
                .iter()
                .any(|p| !approx_eq(p.z, start_point.z, tolerance))
        {
            return None;
        }

        let xy = points.xy_points();
        let circle = fit_circle(&xy, config)?;
        let angle_radians = sweep_angle(&xy, circle.center)?;

        let planar = circle.radius * angle_radians.abs();
        let length = if config.allow_3d {
            helical_length(planar, end_point.z - start_point.z)
        } else {
            planar
        };

        let original_length = points.original_length();
        if !(original_length > 0.0) {
            return None;
        }
        if (length - original_length).abs() / original_length > config.path_tolerance_percent {
            return None;
        }

        Some(Self {
            start_point,
            end_point,
            center: circle.center,
            radius: circle.radius,
            angle_radians,
            length,
            max_deviation: circle.max_deviation(&xy),
        })
    }

    /// I offset (X distance from start to center).
    #[inline]
    pub fn i(&self) -> CoordF {
        self.center.x - self.start_point.x
    }

    /// J offset (Y distance from start to center).
    #[inline]
    pub fn j(&self) -> CoordF {
        self.center.y - self.start_point.y
    }

    /// Arc direction.
    #[inline]
    pub fn direction(&self) -> ArcDirection {
        ArcDirection::from_sweep(self.angle_radians)
    }

    /// Circumference of the underlying circle (mm).
    #[inline]
    pub fn circumference(&self) -> CoordF {
        2.0 * PI * self.radius
    }
}

impl Curve for Arc {
    const NAME: &'static str = "Arc";

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

        let mut cmd = Command::new(self.direction().gcode_command());
        cmd.push('X', self.end_point.x, precision);
        cmd.push('Y', self.end_point.y, precision);
        cmd.push_if(has_z, 'Z', self.end_point.z, precision);
        // I and J are written even when zero; some viewers mis-draw arcs without them
        cmd.push('I', self.i(), precision);
        cmd.push('J', self.j(), precision);
        cmd
    }

    /// Firmware splits arcs into short lines; reject arcs it would split into
    /// fewer than `min_segments` pieces.
    ///
    /// Both divisors are approximations of the firmware's segmentation, not a
    /// model of any particular firmware.
    fn needs_firmware_compensation(&self, config: &ShapeConfig, original_length: CoordF) -> bool {
        if !config.firmware_compensation_enabled() {
            return false;
        }
        let min_segments = config.min_segments as CoordF;
        let circumference = self.circumference();

        let num_segments = (circumference / min_segments).floor();
        if num_segments >= min_segments {
            return false;
        }
        let num_segments = (circumference / original_length).floor();
        num_segments < min_segments
    }

    fn is_degenerate(&self, tolerance: CoordF) -> bool {
        (is_zero(self.i(), tolerance) && is_zero(self.j(), tolerance)) || self.length < tolerance
    }
}

/// Best circle for the points, or `None` if no candidate is within limits.
fn fit_circle(points: &[PointF], config: &ShapeConfig) -> Option<Circle> {
    let acceptable = |c: &Circle| {
        c.radius <= config.max_radius_mm && c.max_deviation(points) <= config.resolution_mm
    };

    let first = points[0];
    let middle = points[points.len() / 2];
    let last = points[points.len() - 1];

    Circle::from_three_points(first, middle, last)
        .filter(acceptable)
        .or_else(|| Circle::least_squares(points).filter(acceptable))
}

/// Signed sweep from the first to the last point around `center`.
///
/// `None` if the path reverses direction, does not turn at all, or wraps a
/// full circle.
fn sweep_angle(points: &[PointF], center: PointF) -> Option<CoordF> {
    let mut total: CoordF = 0.0;
    for w in points.windows(2) {
        let step = angle_between(w[0] - center, w[1] - center);
        if step == 0.0 {
            continue;
        }
        if total != 0.0 && step.signum() != total.signum() {
            return None;
        }
        total += step;
    }

    if total == 0.0 || total.abs() >= 2.0 * PI {
        return None;
    }
    Some(total)
}
