//! Resolved motion points.

use crate::geometry::{Point3F, PointF};
use crate::CoordF;
use serde::{Deserialize, Serialize};

/// A fully resolved point at the end of a G0/G1 move.
///
/// Produced by the upstream position tracker: coordinates are absolute,
/// extrusion mode is resolved and the distance from the previous point is
/// precomputed. Points are never modified once created; adjusted copies are
/// made with [`PrinterPoint::as_shape_start`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterPoint {
    /// Absolute X (mm).
    pub x: CoordF,
    /// Absolute Y (mm).
    pub y: CoordF,
    /// Absolute Z (mm).
    pub z: CoordF,
    /// Extruder position after this move (absolute E).
    pub e_offset: CoordF,
    /// Filament extruded by the move ending here.
    pub e_relative: CoordF,
    /// Whether the extruder is in relative mode (M83) for this move.
    pub is_extruder_relative: bool,
    /// Feed rate (mm/min).
    pub f: CoordF,
    /// Travel distance from the previous point (mm).
    pub distance: CoordF,
}

impl PrinterPoint {
    /// Create a point at a position with no extrusion, feed rate or distance.
    pub fn new(x: CoordF, y: CoordF, z: CoordF) -> Self {
        Self {
            x,
            y,
            z,
            ..Self::default()
        }
    }

    /// Builder: set feed rate.
    pub fn with_feedrate(mut self, f: CoordF) -> Self {
        self.f = f;
        self
    }

    /// Builder: set the travel distance from the previous point.
    pub fn with_distance(mut self, distance: CoordF) -> Self {
        self.distance = distance;
        self
    }

    /// Builder: set extrusion for the move ending here.
    pub fn with_extrusion(mut self, e_offset: CoordF, e_relative: CoordF, relative: bool) -> Self {
        self.e_offset = e_offset;
        self.e_relative = e_relative;
        self.is_extruder_relative = relative;
        self
    }

    /// Copy of this point used as the first point of a new shape.
    ///
    /// The move that ended here belongs to the previous command, so its
    /// distance and extrusion are zeroed.
    pub fn as_shape_start(&self) -> Self {
        Self {
            distance: 0.0,
            e_relative: 0.0,
            ..*self
        }
    }

    /// Whether the move ending here extrudes filament.
    #[inline]
    pub fn is_extruding(&self) -> bool {
        self.e_relative > 0.0
    }

    /// Whether the move ending here retracts filament.
    #[inline]
    pub fn is_retracting(&self) -> bool {
        self.e_relative < 0.0
    }

    /// Position as a 3D point.
    #[inline]
    pub fn position(&self) -> Point3F {
        Point3F::new(self.x, self.y, self.z)
    }

    /// Position projected onto the XY plane.
    #[inline]
    pub fn xy(&self) -> PointF {
        PointF::new(self.x, self.y)
    }
}
