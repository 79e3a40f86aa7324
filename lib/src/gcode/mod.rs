//! Curve welding for G-code motion streams.
//!
//! This module turns runs of resolved linear moves into single curve
//! commands:
//! - [`PrinterPoint`] and [`PointBuffer`] - the points of the shape being built
//! - [`Arc`] and [`Spline`] - curve models and their solvers
//! - [`SegmentedShape`] - incremental accumulator with exact rollback
//! - [`Command`] - the term list behind both rendering and length prediction
//! - [`Welder`] - drives accumulators over a whole stream

mod arc;
mod command;
mod point;
mod point_buffer;
mod shape;
mod spline;
mod welder;

pub use arc::{Arc, ArcDirection};
pub use command::{Command, FixedDecimal, Term, MAX_TERMS};
pub use point::PrinterPoint;
pub use point_buffer::{BufferMark, PointBuffer};
pub use shape::{Curve, SegmentedArc, SegmentedShape, SegmentedSpline, ShapeStats};
pub use spline::Spline;
pub use welder::{weld_arcs, weld_splines, WeldStats, WeldedCommand, Welder};
