//! Stream welder.
//!
//! Drives shape accumulators over a stream of resolved points and produces
//! the output command stream: runs that fit a curve become one curve command,
//! everything else is passed through as `G1` lines.

use super::shape::{Curve, SegmentedShape, ShapeStats};
use super::{Arc, Command, PrinterPoint, Spline};
use crate::config::ShapeConfig;
use crate::geometry::approx_eq;
use crate::CoordF;
use std::collections::VecDeque;

/// One output command.
#[derive(Debug, Clone, PartialEq)]
pub enum WeldedCommand {
    /// A curve replacing several linear moves.
    Curve {
        /// Command text.
        gcode: String,
        /// Number of linear moves the curve replaces.
        points_replaced: usize,
    },
    /// A single linear move.
    Line {
        /// Command text.
        gcode: String,
    },
}

impl WeldedCommand {
    /// Check if this is a curve command.
    pub fn is_curve(&self) -> bool {
        matches!(self, WeldedCommand::Curve { .. })
    }

    /// Check if this is a line command.
    pub fn is_line(&self) -> bool {
        matches!(self, WeldedCommand::Line { .. })
    }

    /// Command text.
    pub fn gcode(&self) -> &str {
        match self {
            WeldedCommand::Curve { gcode, .. } | WeldedCommand::Line { gcode } => gcode,
        }
    }
}

/// Statistics about a welded stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeldStats {
    /// Number of moves read (every point after the first).
    pub input_moves: usize,

    /// Number of curve commands written.
    pub curve_count: usize,

    /// Number of line commands written.
    pub line_count: usize,

    /// Total moves replaced by curves.
    pub points_replaced: usize,

    /// Fits rejected because the command was too long.
    pub gcode_length_exceptions: usize,

    /// Fits rejected by firmware compensation.
    pub firmware_compensations: usize,

    /// Compression ratio (input moves / output commands).
    pub compression_ratio: CoordF,
}

impl WeldStats {
    fn add_shape_stats(&mut self, stats: ShapeStats) {
        self.gcode_length_exceptions += stats.gcode_length_exceptions;
        self.firmware_compensations += stats.firmware_compensations;
    }

    fn update_ratio(&mut self) {
        let output = self.curve_count + self.line_count;
        self.compression_ratio = if output > 0 {
            self.input_moves as CoordF / output as CoordF
        } else {
            1.0
        };
    }
}

/// Replaces runs of linear moves with curves of type `C`.
#[derive(Debug, Clone)]
pub struct Welder<C: Curve> {
    config: ShapeConfig,
    /// Tool position: the end of the last emitted command.
    position: Option<PrinterPoint>,
    shape: SegmentedShape<C>,
    output: Vec<WeldedCommand>,
    stats: WeldStats,
}

impl<C: Curve> Welder<C> {
    /// Create a welder.
    pub fn new(config: ShapeConfig) -> Self {
        let config = config.clamped();
        Self {
            shape: SegmentedShape::new(config.clone()),
            config,
            position: None,
            output: Vec::new(),
            stats: WeldStats::default(),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &ShapeConfig {
        &self.config
    }

    /// Statistics so far.
    pub fn stats(&self) -> &WeldStats {
        &self.stats
    }

    /// Feed the next point of the stream.
    ///
    /// The first point only sets the starting position.
    pub fn process(&mut self, point: PrinterPoint) {
        let Some(position) = self.position else {
            self.position = Some(point);
            return;
        };
        self.stats.input_moves += 1;

        let mut pending = VecDeque::from([point]);
        let mut position = position;

        while let Some(p) = pending.pop_front() {
            if self.shape.num_segments() == 0 {
                self.shape.try_add_point(position.as_shape_start());
            }
            if self.is_compatible(&p) && self.shape.try_add_point(p) {
                continue;
            }

            if self.shape.is_shape() {
                position = self.emit_curve();
                pending.push_front(p);
                continue;
            }

            // Slide the window: the oldest move goes out as a line
            let moves: Vec<PrinterPoint> = self.shape.points().as_slice()[1..].to_vec();
            self.reset_shape();
            match moves.split_first() {
                Some((first, rest)) => {
                    self.emit_line(&position, first);
                    position = *first;
                    pending.push_front(p);
                    for m in rest.iter().rev() {
                        pending.push_front(*m);
                    }
                }
                None => {
                    self.emit_line(&position, &p);
                    position = p;
                }
            }
        }

        self.position = Some(position);
    }

    /// Collect the commands produced so far.
    pub fn take_output(&mut self) -> Vec<WeldedCommand> {
        std::mem::take(&mut self.output)
    }

    /// Flush the pending shape and return the remaining output with the
    /// final statistics.
    pub fn finish(mut self) -> (Vec<WeldedCommand>, WeldStats) {
        if self.shape.is_shape() {
            self.emit_curve();
        } else if let Some(position) = self.position {
            let moves: Vec<PrinterPoint> = self
                .shape
                .points()
                .iter()
                .skip(1)
                .copied()
                .collect();
            self.reset_shape();
            let mut from = position;
            for m in &moves {
                self.emit_line(&from, m);
                from = *m;
            }
        }
        self.stats.add_shape_stats(self.shape.stats());
        self.stats.update_ratio();

        log::debug!(
            "Welded {} moves into {} curves and {} lines ({:.2}x)",
            self.stats.input_moves,
            self.stats.curve_count,
            self.stats.line_count,
            self.stats.compression_ratio
        );
        (self.output, self.stats)
    }

    /// Whether `point` may extend the current shape.
    ///
    /// All moves of a shape share the feed rate of its first move and its
    /// kind: extrusion, retraction or travel. Each must actually move.
    fn is_compatible(&self, point: &PrinterPoint) -> bool {
        if !(point.distance > 0.0) {
            return false;
        }
        match self.shape.points().get(1) {
            Some(first) => {
                first.f == point.f
                    && first.is_extruding() == point.is_extruding()
                    && first.is_retracting() == point.is_retracting()
            }
            None => true,
        }
    }

    /// Emit the current shape and start a new one. Returns the new position.
    fn emit_curve(&mut self) -> PrinterPoint {
        let points_replaced = self.shape.num_segments() - 1;
        let gcode = self.shape.gcode();
        let end = *self.shape.curve().end_point();

        log::debug!(
            "{} replaced {} moves ({:.3}mm): {}",
            C::NAME,
            points_replaced,
            self.shape.original_shape_length(),
            gcode
        );

        self.output.push(WeldedCommand::Curve {
            gcode,
            points_replaced,
        });
        self.stats.curve_count += 1;
        self.stats.points_replaced += points_replaced;
        self.reset_shape();
        end
    }

    fn emit_line(&mut self, from: &PrinterPoint, to: &PrinterPoint) {
        let gcode = self.line_command(from, to).to_gcode();
        self.output.push(WeldedCommand::Line { gcode });
        self.stats.line_count += 1;
    }

    fn line_command(&self, from: &PrinterPoint, to: &PrinterPoint) -> Command {
        let xyz = self.config.xyz_precision;
        let mut cmd = Command::new("G1");
        cmd.push('X', to.x, xyz);
        cmd.push('Y', to.y, xyz);
        cmd.push_if(
            !approx_eq(from.z, to.z, self.config.xyz_tolerance()),
            'Z',
            to.z,
            xyz,
        );
        let e = if to.is_extruder_relative {
            to.e_relative
        } else {
            to.e_offset
        };
        cmd.push_if(to.e_relative != 0.0, 'E', e, self.config.e_precision);
        cmd.push_if(from.f != to.f && to.f >= 1.0, 'F', to.f, 0);
        cmd
    }

    fn reset_shape(&mut self) {
        let finished = std::mem::replace(&mut self.shape, SegmentedShape::new(self.config.clone()));
        self.stats.add_shape_stats(finished.stats());
    }
}

/// Weld a point stream into arcs.
pub fn weld_arcs(points: &[PrinterPoint], config: ShapeConfig) -> (Vec<WeldedCommand>, WeldStats) {
    weld::<Arc>(points, config)
}

/// Weld a point stream into splines.
pub fn weld_splines(
    points: &[PrinterPoint],
    config: ShapeConfig,
) -> (Vec<WeldedCommand>, WeldStats) {
    weld::<Spline>(points, config)
}

fn weld<C: Curve>(points: &[PrinterPoint], config: ShapeConfig) -> (Vec<WeldedCommand>, WeldStats) {
    let mut welder = Welder::<C>::new(config);
    for point in points {
        welder.process(*point);
    }
    welder.finish()
}
