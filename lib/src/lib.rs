//! # Arc Welder
//!
//! Compresses dense runs of G0/G1 line segments into G2/G3 arcs and G5 cubic
//! splines, while keeping every original point within a configured resolution
//! of the substituted curve.
//!
//! The library is built around an incremental shape accumulator:
//! - [`PrinterPoint`]s, fully resolved by an upstream G-code position tracker,
//!   are offered one at a time to a [`SegmentedShape`]
//! - every accepted point triggers a full re-fit of the curve model
//! - a rejected point leaves the shape exactly as it was before the attempt
//! - once the shape can no longer grow, [`SegmentedShape::gcode`] renders the
//!   curve command, and [`SegmentedShape::gcode_length`] predicts that length
//!   without building the string
//!
//! ## Example
//!
//! ```rust,ignore
//! use arc_welder::{PrinterPoint, SegmentedArc, ShapeConfig};
//!
//! let mut arc = SegmentedArc::new(ShapeConfig::default());
//! for point in points {
//!     if !arc.try_add_point(point) {
//!         break;
//!     }
//! }
//! if arc.is_shape() {
//!     println!("{}", arc.gcode());
//! }
//! ```

pub mod config;
pub mod gcode;
pub mod geometry;

pub use config::{
    CurveKind, ShapeConfig, DEFAULT_E_PRECISION, DEFAULT_MAX_GCODE_LENGTH, DEFAULT_MAX_RADIUS_MM,
    DEFAULT_MAX_SEGMENTS, DEFAULT_MIN_SEGMENTS, DEFAULT_MM_PER_SEGMENT,
    DEFAULT_PATH_TOLERANCE_PERCENT, DEFAULT_RESOLUTION_MM, DEFAULT_XYZ_PRECISION,
    MAX_PRECISION, MAX_RADIUS_CEILING_MM, MAX_SEGMENTS_CEILING,
};
pub use gcode::{
    weld_arcs, weld_splines, Arc, ArcDirection, BufferMark, Command, Curve, FixedDecimal,
    PointBuffer, PrinterPoint, SegmentedArc, SegmentedShape, SegmentedSpline, ShapeStats,
    Spline, Term, WeldStats, WeldedCommand, Welder,
};
pub use geometry::{Circle, CubicBezier, Point3F, PointF};

/// Floating-point coordinate type (millimeters).
pub type CoordF = f64;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for operations outside the fitting core.
///
/// Fitting itself never fails: a point that cannot be welded is a normal
/// `false` from [`SegmentedShape::try_add_point`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
