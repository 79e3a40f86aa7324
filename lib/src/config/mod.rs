//! Shape accumulator configuration.
//!
//! Every shape accumulator is built from a [`ShapeConfig`]. The configuration
//! is normalized once at construction time (see [`ShapeConfig::clamped`]) and
//! never mutated afterward.

mod shape_config;

pub use shape_config::{
    CurveKind, ShapeConfig, DEFAULT_E_PRECISION, DEFAULT_MAX_GCODE_LENGTH, DEFAULT_MAX_RADIUS_MM,
    DEFAULT_MAX_SEGMENTS, DEFAULT_MIN_SEGMENTS, DEFAULT_MM_PER_SEGMENT,
    DEFAULT_PATH_TOLERANCE_PERCENT, DEFAULT_RESOLUTION_MM, DEFAULT_XYZ_PRECISION,
    MAX_PRECISION, MAX_RADIUS_CEILING_MM, MAX_SEGMENTS_CEILING,
};
