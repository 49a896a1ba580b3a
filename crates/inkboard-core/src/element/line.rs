//! Line element.

use super::{point_to_segment_dist, ElementId, ElementKind, ElementTrait, Style};
use kurbo::{BezPath, Point, Rect};

/// A straight segment between two points.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub(crate) id: ElementId,
    /// Point where the drag started.
    pub start: Point,
    /// Point under the pointer.
    pub end: Point,
    pub style: Style,
}

impl Line {
    pub fn new(id: ElementId, start: Point, end: Point, style: Style) -> Self {
        Self {
            id,
            start,
            end,
            style,
        }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

impl ElementTrait for Line {
    fn id(&self) -> ElementId {
        self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Line
    }

    fn bounds(&self) -> Rect {
        Rect::from_points(self.start, self.end)
    }

    fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        point_to_segment_dist(point, self.start, self.end) <= tolerance
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start);
        path.line_to(self.end);
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
    fn test_hit_along_segment() {
        let line = Line::new(0, Point::new(0.0, 0.0), Point::new(100.0, 0.0), Style::default());
        assert!(line.is_point_near(Point::new(50.0, 4.0), 5.0));
        assert!(!line.is_point_near(Point::new(50.0, 6.0), 5.0));
        // Past the end the distance is to the endpoint, not the infinite line.
        assert!(!line.is_point_near(Point::new(110.0, 0.0), 5.0));
    }

    #[test]
    fn test_bounds_normalized() {
        let line = Line::new(0, Point::new(10.0, 10.0), Point::new(0.0, 5.0), Style::default());
        let b = line.bounds();
        assert_eq!((b.x0, b.y0, b.x1, b.y1), (0.0, 5.0, 10.0, 10.0));
        assert!((line.length() - 125f64.sqrt()).abs() < 1e-9);
    }
}
