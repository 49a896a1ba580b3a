//! Circle element.
//!
//! The drag rectangle is the bounding box; the drawn curve is the ellipse
//! inscribed in it, which is a true circle when the box is square.

use super::{ElementId, ElementKind, ElementTrait, Style};
use kurbo::{BezPath, Ellipse as KurboEllipse, Point, Rect, Shape as KurboShape};

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub(crate) id: ElementId,
    pub start: Point,
    pub end: Point,
    pub style: Style,
}

impl Circle {
    pub fn new(id: ElementId, start: Point, end: Point, style: Style) -> Self {
        Self {
            id,
            start,
            end,
            style,
        }
    }

    pub fn center(&self) -> Point {
        self.start.midpoint(self.end)
    }

    /// Horizontal and vertical radii.
    pub fn radii(&self) -> (f64, f64) {
        (
            (self.end.x - self.start.x).abs() / 2.0,
            (self.end.y - self.start.y).abs() / 2.0,
        )
    }

    /// Distance from `point` to the curve, measured along the ray from the
    /// center. Exact for circles, a close approximation for ellipses.
    pub fn curve_distance(&self, point: Point) -> f64 {
        let center = self.center();
        let (rx, ry) = self.radii();
        let offset = point - center;
        let dist = offset.hypot();
        if rx < f64::EPSILON || ry < f64::EPSILON {
            // Collapsed to a segment or a point.
            let half = kurbo::Vec2::new(rx, ry);
            return super::point_to_segment_dist(point, center - half, center + half);
        }
        if dist < f64::EPSILON {
            return rx.min(ry);
        }
        let (sin, cos) = (offset.y / dist, offset.x / dist);
        let radius = rx * ry / ((ry * cos).powi(2) + (rx * sin).powi(2)).sqrt();
        (dist - radius).abs()
    }
}

impl ElementTrait for Circle {
    fn id(&self) -> ElementId {
        self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Circle
    }

    fn bounds(&self) -> Rect {
        Rect::from_points(self.start, self.end)
    }

    fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        self.curve_distance(point) <= tolerance
    }

    fn to_path(&self) -> BezPath {
        KurboEllipse::from_rect(self.bounds()).to_path(0.1)
    }

    fn style(&self) -> &Style {
        &self.style
    }
}
