//! Arrow element.

use super::{point_to_segment_dist, ElementId, ElementKind, ElementTrait, Style};
use kurbo::{BezPath, Point, Rect, Vec2};

/// Length of each arrow-head barb.
pub const HEAD_LENGTH: f64 = 20.0;

/// Angle between the shaft and each barb, in radians.
pub const HEAD_ANGLE: f64 = std::f64::consts::PI / 6.0;

/// A line with an arrow head at `end`.
///
/// The barbs are derived from the two endpoints and are never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub(crate) id: ElementId,
    pub start: Point,
    /// Point the head is drawn at.
    pub end: Point,
    pub style: Style,
}

impl Arrow {
    pub fn new(id: ElementId, start: Point, end: Point, style: Style) -> Self {
        Self {
            id,
            start,
            end,
            style,
        }
    }

    /// Unit vector from start to end, pointing right for a degenerate arrow.
    pub fn direction(&self) -> Vec2 {
        let v = self.end - self.start;
        let len = v.hypot();
        if len < f64::EPSILON {
            Vec2::new(1.0, 0.0)
        } else {
            v / len
        }
    }

    /// Tips of the two barbs.
    pub fn head(&self) -> [Point; 2] {
        let back = -self.direction();
        let (sin, cos) = HEAD_ANGLE.sin_cos();
        let rotate = |v: Vec2, sin: f64| Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos);
        [
            self.end + rotate(back, sin) * HEAD_LENGTH,
            self.end + rotate(back, -sin) * HEAD_LENGTH,
        ]
    }
}

impl ElementTrait for Arrow {
    fn id(&self) -> ElementId {
        self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Arrow
    }

    fn bounds(&self) -> Rect {
        let [left, right] = self.head();
        Rect::from_points(self.start, self.end)
            .union_pt(left)
            .union_pt(right)
    }

    fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        point_to_segment_dist(point, self.start, self.end) <= tolerance
    }

    fn to_path(&self) -> BezPath {
        let [left, right] = self.head();
        let mut path = BezPath::new();
        path.move_to(self.start);
        path.line_to(self.end);
        path.move_to(left);
        path.line_to(self.end);
        path.line_to(right);
        path
    }

    fn style(&self) -> &Style {
        &self.style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_is_symmetric() {
        let arrow = Arrow::new(0, Point::new(0.0, 0.0), Point::new(100.0, 0.0), Style::default());
        let [a, b] = arrow.head();
        assert!((a.x - b.x).abs() < 1e-9);
        assert!((a.y + b.y).abs() < 1e-9);
        assert!(a.x < 100.0);
        assert!((a.distance(arrow.end) - HEAD_LENGTH).abs() < 1e-9);
    }

    #[test]
    fn test_hit_ignores_barbs() {
        let arrow = Arrow::new(0, Point::new(0.0, 0.0), Point::new(100.0, 0.0), Style::default());
        assert!(arrow.is_point_near(Point::new(30.0, 2.0), 3.0));
        let [barb, _] = arrow.head();
        assert!(!arrow.is_point_near(barb, 3.0));
    }
}
