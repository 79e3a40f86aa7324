//! Ordered buffer of candidate points.

use super::PrinterPoint;
use crate::geometry::PointF;
use crate::CoordF;

/// Saved buffer state; see [`PointBuffer::mark`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferMark {
    len: usize,
    original_length: CoordF,
}

/// The points of the shape under construction, in path order.
///
/// Keeps a running sum of the points' `distance` fields: the length of the
/// original polyline the shape replaces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointBuffer {
    points: Vec<PrinterPoint>,
    original_length: CoordF,
}

impl PointBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            original_length: 0.0,
        }
    }

    /// Append a point and add its distance to the original length.
    pub fn push(&mut self, point: PrinterPoint) {
        self.original_length += point.distance;
        self.points.push(point);
    }

    /// Remove the most recent point and subtract its distance.
    pub fn pop(&mut self) -> Option<PrinterPoint> {
        let point = self.points.pop()?;
        self.original_length -= point.distance;
        Some(point)
    }

    /// Capture the current length and running total.
    pub fn mark(&self) -> BufferMark {
        BufferMark {
            len: self.points.len(),
            original_length: self.original_length,
        }
    }

    /// Drop every point pushed since `mark` and restore the running total
    /// exactly (without accumulating floating-point error).
    pub fn rewind(&mut self, mark: BufferMark) {
        self.points.truncate(mark.len);
        self.original_length = mark.original_length;
    }

    /// Number of buffered points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of the distances of all buffered points.
    #[inline]
    pub fn original_length(&self) -> CoordF {
        self.original_length
    }

    /// First point.
    #[inline]
    pub fn first(&self) -> Option<&PrinterPoint> {
        self.points.first()
    }

    /// Most recent point.
    #[inline]
    pub fn last(&self) -> Option<&PrinterPoint> {
        self.points.last()
    }

    /// Point at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&PrinterPoint> {
        self.points.get(index)
    }

    /// All points as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[PrinterPoint] {
        &self.points
    }

    /// Iterate over the points.
    pub fn iter(&self) -> std::slice::Iter<'_, PrinterPoint> {
        self.points.iter()
    }

    /// XY projection of every point.
    pub fn xy_points(&self) -> Vec<PointF> {
        self.points.iter().map(PrinterPoint::xy).collect()
    }
}

impl<'a> IntoIterator for &'a PointBuffer {
    type Item = &'a PrinterPoint;
    type IntoIter = std::slice::Iter<'a, PrinterPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
