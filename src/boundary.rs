use crate::error::SimError;
use crate::math::{LineSegment2d, Point2d};

/// One wall of the corridor: an ordered polyline traced from the
/// entry edge to the exit edge. Never mutated after construction.
#[derive(Clone, Debug)]
pub struct BoundaryCurve {
    points: Vec<Point2d>,
}

impl BoundaryCurve {
    /// Creates a boundary curve from an ordered point sequence.
    /// Fails if fewer than 2 points are supplied.
    pub fn new(points: Vec<Point2d>) -> Result<Self, SimError> {
        if points.len() < 2 {
            return Err(SimError::geometry(format!(
                "boundary curve needs at least 2 points, got {}",
                points.len()
            )));
        }
        Ok(Self { points })
    }

    /// The points of the polyline, entry end first.
    pub fn points(&self) -> &[Point2d] {
        &self.points
    }

    /// The point on the entry edge.
    pub fn first(&self) -> Point2d {
        self.points[0]
    }

    /// The point on the exit edge.
    pub fn last(&self) -> Point2d {
        self.points[self.points.len() - 1]
    }

    /// The wall segment starting at point `idx`.
    pub fn segment(&self, idx: usize) -> LineSegment2d {
        LineSegment2d::new(self.points[idx], self.points[idx + 1])
    }
}
