//! Rectangle element.

use super::{point_to_segment_dist, ElementId, ElementKind, ElementTrait, Style};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};

/// An axis-aligned rectangle spanned by two opposite corners.
#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    pub(crate) id: ElementId,
    pub start: Point,
    pub end: Point,
    pub style: Style,
}

impl Rectangle {
    pub fn new(id: ElementId, start: Point, end: Point, style: Style) -> Self {
        Self {
            id,
            start,
            end,
            style,
        }
    }

    /// The corners as a normalized kurbo Rect.
    pub fn as_rect(&self) -> Rect {
        Rect::from_points(self.start, self.end)
    }

    /// Corners in drawing order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        let r = self.as_rect();
        [
            Point::new(r.x0, r.y0),
            Point::new(r.x1, r.y0),
            Point::new(r.x1, r.y1),
            Point::new(r.x0, r.y1),
        ]
    }

    /// Distance to the nearest edge. Interior points are not "on" the shape.
    pub fn edge_distance(&self, point: Point) -> f64 {
        let c = self.corners();
        (0..4)
            .map(|i| point_to_segment_dist(point, c[i], c[(i + 1) % 4]))
            .fold(f64::INFINITY, f64::min)
    }
}

impl ElementTrait for Rectangle {
    fn id(&self) -> ElementId {
        self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Rectangle
    }

    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        self.edge_distance(point) <= tolerance
    }

    fn to_path(&self) -> BezPath {
        self.as_rect().to_path(0.1)
    }

    fn style(&self) -> &Style {
        &self.style
    }
}
