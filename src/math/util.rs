use super::{Point2d, Vector2d};
use cgmath::prelude::*;

/// A line segment in 2D space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment2d {
    pub a: Point2d,
    pub b: Point2d,
}

impl LineSegment2d {
    /// Creates a new line segment.
    pub const fn new(a: Point2d, b: Point2d) -> Self {
        Self { a, b }
    }

    /// The midpoint of the segment.
    pub fn midpoint(&self) -> Point2d {
        self.a + 0.5 * (self.b - self.a)
    }

    /// Linearly interpolates along the segment; `t` in `[0, 1]`.
    pub fn lerp(&self, t: f64) -> Point2d {
        self.a + t * (self.b - self.a)
    }

    /// Distance from `point` to the nearest point on the segment.
    pub fn distance_to(&self, point: Point2d) -> f64 {
        let ab = self.b - self.a;
        let len2 = ab.magnitude2();
        if len2 == 0.0 {
            return (point - self.a).magnitude();
        }
        let t = ((point - self.a).dot(ab) / len2).clamp(0.0, 1.0);
        (point - (self.a + t * ab)).magnitude()
    }
}

/// Twice the signed area of the triangle `(a, b, c)`.
/// Positive when the vertices wind counter-clockwise.
pub fn signed_area2(a: Point2d, b: Point2d, c: Point2d) -> f64 {
    (b - a).perp_dot(c - a)
}

/// Tests whether `point` lies inside the triangle, edges inclusive.
pub fn point_in_triangle(point: Point2d, verts: &[Point2d; 3]) -> bool {
    let d1 = signed_area2(verts[0], verts[1], point);
    let d2 = signed_area2(verts[1], verts[2], point);
    let d3 = signed_area2(verts[2], verts[0], point);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Unit vector for the given heading angle in radians.
pub fn heading_vector(heading: f64) -> Vector2d {
    Vector2d::new(heading.cos(), heading.sin())
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn p(x: f64, y: f64) -> Point2d {
        Point2d::new(x, y)
    }

    #[test]
    fn segment_distance() {
        let seg = LineSegment2d::new(p(0.0, 0.0), p(10.0, 0.0));
        assert_approx_eq!(seg.distance_to(p(5.0, 3.0)), 3.0);
        assert_approx_eq!(seg.distance_to(p(-4.0, 3.0)), 5.0);
        assert_approx_eq!(seg.distance_to(p(13.0, -4.0)), 5.0);
        assert_approx_eq!(seg.distance_to(p(7.0, 0.0)), 0.0);
    }

    #[test]
    fn degenerate_segment_distance() {
        let seg = LineSegment2d::new(p(2.0, 2.0), p(2.0, 2.0));
        assert_approx_eq!(seg.distance_to(p(5.0, 6.0)), 5.0);
    }

    #[test]
    fn triangle_containment() {
        let tri = [p(0.0, 0.0), p(4.0, 0.0), p(0.0, 4.0)];
        assert!(point_in_triangle(p(1.0, 1.0), &tri));
        assert!(point_in_triangle(p(0.0, 0.0), &tri));
        assert!(point_in_triangle(p(2.0, 2.0), &tri));
        assert!(!point_in_triangle(p(2.1, 2.1), &tri));
        assert!(!point_in_triangle(p(-0.1, 1.0), &tri));
    }

    #[test]
    fn winding_signs() {
        assert!(signed_area2(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0)) > 0.0);
        assert!(signed_area2(p(0.0, 0.0), p(0.0, 1.0), p(1.0, 0.0)) < 0.0);
        assert_approx_eq!(signed_area2(p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0)), 0.0);
    }
}
