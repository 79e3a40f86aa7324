//! Shape configuration types.
//!
//! This module provides [`ShapeConfig`], the settings shared by the arc and
//! spline accumulators, and [`CurveKind`], which selects the curve family a
//! stream is welded into.

use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default minimum number of points in a shape.
pub const DEFAULT_MIN_SEGMENTS: usize = 3;
/// Default maximum number of points in a shape.
pub const DEFAULT_MAX_SEGMENTS: usize = 50;
/// Default firmware segment length (mm). 0 disables firmware compensation.
pub const DEFAULT_MM_PER_SEGMENT: CoordF = 0.0;
/// Default maximum deviation between the curve and the original path (mm).
pub const DEFAULT_RESOLUTION_MM: CoordF = 0.05;
/// Default allowed relative difference between curve and path length.
pub const DEFAULT_PATH_TOLERANCE_PERCENT: CoordF = 0.05;
/// Default maximum command length. 0 disables the check.
pub const DEFAULT_MAX_GCODE_LENGTH: usize = 0;
/// Default number of decimals for X, Y, Z, I and J.
pub const DEFAULT_XYZ_PRECISION: u8 = 3;
/// Default number of decimals for E.
pub const DEFAULT_E_PRECISION: u8 = 5;
/// Default maximum arc radius (mm).
pub const DEFAULT_MAX_RADIUS_MM: CoordF = 9999.0;
/// Absolute radius ceiling; requested radii above it are silently lowered.
pub const MAX_RADIUS_CEILING_MM: CoordF = 9999.0;
/// Upper bound for `min_segments` and `max_segments`.
pub const MAX_SEGMENTS_CEILING: usize = 10_000;
/// Largest supported number of decimals.
pub const MAX_PRECISION: u8 = 6;

/// Curve family used to replace runs of line segments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    /// Circular arcs (G2/G3).
    #[default]
    Arc,
    /// Cubic splines (G5).
    Spline,
}

impl FromStr for CurveKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "arc" | "arcs" => Ok(CurveKind::Arc),
            "spline" | "splines" => Ok(CurveKind::Spline),
            other => Err(Error::Config(format!("unknown curve kind '{}'", other))),
        }
    }
}

impl fmt::Display for CurveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveKind::Arc => write!(f, "arc"),
            CurveKind::Spline => write!(f, "spline"),
        }
    }
}

/// Configuration for a shape accumulator.
///
/// Values are normalized by [`ShapeConfig::clamped`] when an accumulator is
/// created; out-of-range values are corrected rather than reported.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    // === Geometry ===
    /// Allow shapes whose Z changes along the path (helical arcs, 3D splines).
    pub allow_3d: bool,
    /// Maximum deviation from the original path (mm).
    pub resolution_mm: CoordF,
    /// Maximum relative difference between curve length and path length.
    /// 0.05 means 5%.
    pub path_tolerance_percent: CoordF,
    /// Maximum arc radius (mm). Larger circles are essentially straight lines.
    pub max_radius_mm: CoordF,

    // === Segment Counts ===
    /// Minimum number of points before a fit is attempted.
    /// Also the minimum number of segments firmware must split an arc into.
    pub min_segments: usize,
    /// Maximum number of points in one shape.
    pub max_segments: usize,
    /// Firmware arc segment length (mm). 0 disables firmware compensation.
    pub mm_per_segment: CoordF,

    // === Output ===
    /// Maximum length of an emitted command. 0 disables the check.
    pub max_gcode_length: usize,
    /// Decimals for X, Y, Z, I and J.
    pub xyz_precision: u8,
    /// Decimals for E.
    pub e_precision: u8,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            allow_3d: false,
            resolution_mm: DEFAULT_RESOLUTION_MM,
            path_tolerance_percent: DEFAULT_PATH_TOLERANCE_PERCENT,
            max_radius_mm: DEFAULT_MAX_RADIUS_MM,
            min_segments: DEFAULT_MIN_SEGMENTS,
            max_segments: DEFAULT_MAX_SEGMENTS,
            mm_per_segment: DEFAULT_MM_PER_SEGMENT,
            max_gcode_length: DEFAULT_MAX_GCODE_LENGTH,
            xyz_precision: DEFAULT_XYZ_PRECISION,
            e_precision: DEFAULT_E_PRECISION,
        }
    }
}

impl ShapeConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: allow or forbid 3D shapes.
    pub fn allow_3d(mut self, allow: bool) -> Self {
        self.allow_3d = allow;
        self
    }

    /// Builder: set resolution (mm).
    pub fn resolution_mm(mut self, resolution: CoordF) -> Self {
        self.resolution_mm = resolution;
        self
    }

    /// Builder: set path length tolerance (fraction, 0.05 = 5%).
    pub fn path_tolerance_percent(mut self, percent: CoordF) -> Self {
        self.path_tolerance_percent = percent;
        self
    }

    /// Builder: set maximum arc radius (mm).
    pub fn max_radius_mm(mut self, radius: CoordF) -> Self {
        self.max_radius_mm = radius;
        self
    }

    /// Builder: set minimum and maximum segment counts.
    pub fn segments(mut self, min: usize, max: usize) -> Self {
        self.min_segments = min;
        self.max_segments = max;
        self
    }

    /// Builder: set firmware segment length (mm).
    pub fn mm_per_segment(mut self, mm: CoordF) -> Self {
        self.mm_per_segment = mm;
        self
    }

    /// Builder: set maximum emitted command length.
    pub fn max_gcode_length(mut self, length: usize) -> Self {
        self.max_gcode_length = length;
        self
    }

    /// Builder: set output precision for positions and extrusion.
    pub fn precision(mut self, xyz: u8, e: u8) -> Self {
        self.xyz_precision = xyz;
        self.e_precision = e;
        self
    }

    /// Create a strict configuration with tighter tolerances.
    pub fn strict() -> Self {
        Self {
            resolution_mm: 0.01,
            path_tolerance_percent: 0.02,
            max_radius_mm: 1000.0,
            min_segments: 4,
            ..Self::default()
        }
    }

    /// Create a relaxed configuration that welds more aggressively.
    pub fn relaxed() -> Self {
        Self {
            resolution_mm: 0.1,
            path_tolerance_percent: 0.1,
            max_segments: 100,
            ..Self::default()
        }
    }

    /// Return a copy with every value brought into its supported range.
    ///
    /// - `max_radius_mm` is lowered to [`MAX_RADIUS_CEILING_MM`]
    /// - `min_segments` is at least 3 (a circle needs three points)
    /// - `max_segments` is at least `min_segments`
    /// - both segment counts are at most [`MAX_SEGMENTS_CEILING`]
    /// - precisions are at most [`MAX_PRECISION`]
    /// - non-positive or non-finite tolerances fall back to their defaults
    pub fn clamped(&self) -> Self {
        let mut config = self.clone();

        if !(config.max_radius_mm > 0.0) || config.max_radius_mm > MAX_RADIUS_CEILING_MM {
            log::debug!(
                "max_radius_mm {} clamped to {}",
                config.max_radius_mm,
                MAX_RADIUS_CEILING_MM
            );
            config.max_radius_mm = MAX_RADIUS_CEILING_MM;
        }
        if !(config.resolution_mm > 0.0) || !config.resolution_mm.is_finite() {
            log::debug!("resolution_mm {} reset to default", config.resolution_mm);
            config.resolution_mm = DEFAULT_RESOLUTION_MM;
        }
        if !(config.path_tolerance_percent >= 0.0) || !config.path_tolerance_percent.is_finite() {
            config.path_tolerance_percent = DEFAULT_PATH_TOLERANCE_PERCENT;
        }
        if !(config.mm_per_segment >= 0.0) || !config.mm_per_segment.is_finite() {
            config.mm_per_segment = DEFAULT_MM_PER_SEGMENT;
        }
        if config.min_segments.max(config.max_segments) > MAX_SEGMENTS_CEILING {
            log::debug!(
                "segments ({}, {}) clamped to {}",
                config.min_segments,
                config.max_segments,
                MAX_SEGMENTS_CEILING
            );
        }
        config.min_segments = config
            .min_segments
            .clamp(DEFAULT_MIN_SEGMENTS, MAX_SEGMENTS_CEILING);
        config.max_segments = config
            .max_segments
            .clamp(config.min_segments, MAX_SEGMENTS_CEILING);
        config.xyz_precision = config.xyz_precision.min(MAX_PRECISION);
        config.e_precision = config.e_precision.min(MAX_PRECISION);

        config
    }

    /// Numeric tolerance for positions: half a unit in the last emitted digit.
    ///
    /// Two coordinates closer than this print identically.
    pub fn xyz_tolerance(&self) -> CoordF {
        0.5 * 10f64.powi(-(self.xyz_precision as i32))
    }

    /// Whether firmware compensation is active.
    pub fn firmware_compensation_enabled(&self) -> bool {
        self.min_segments > 0 && self.mm_per_segment > 0.0
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.check_finite()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    fn check_finite(&self) -> Result<()> {
        let fields = [
            ("resolution_mm", self.resolution_mm),
            ("path_tolerance_percent", self.path_tolerance_percent),
            ("max_radius_mm", self.max_radius_mm),
            ("mm_per_segment", self.mm_per_segment),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(Error::Config(format!("{} must be finite", name)));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ShapeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ShapeConfig(resolution={}mm, path_tolerance={:.1}%, segments={}..{}, max_radius={}mm, 3d={})",
            self.resolution_mm,
            self.path_tolerance_percent * 100.0,
            self.min_segments,
            self.max_segments,
            self.max_radius_mm,
            self.allow_3d
        )
    }
}
