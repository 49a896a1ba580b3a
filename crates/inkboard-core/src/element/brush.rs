//! Freehand brush element.

use super::stroke::{self, StrokeOptions};
use super::{rect_contains_inclusive, ElementId, ElementKind, ElementTrait, Style};
use kurbo::{BezPath, Point, Rect};

/// A freehand stroke: the sampled pointer positions plus a derived outline.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    pub(crate) id: ElementId,
    /// Samples in the order they were drawn.
    pub points: Vec<Point>,
    pub style: Style,
    /// Outline polygon, rebuilt from `points` and `style.size`.
    outline: Vec<Point>,
}

impl Brush {
    /// Start a stroke at `start`.
    pub fn new(id: ElementId, start: Point, style: Style) -> Self {
        Self::from_points(id, vec![start], style)
    }

    /// Rebuild a stroke from stored samples.
    pub fn from_points(id: ElementId, points: Vec<Point>, style: Style) -> Self {
        let mut brush = Self {
            id,
            points,
            style,
            outline: Vec::new(),
        };
        brush.recompute_outline();
        brush
    }

    /// Append a sample and rebuild the outline.
    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
        self.recompute_outline();
    }

    pub fn outline(&self) -> &[Point] {
        &self.outline
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn recompute_outline(&mut self) {
        self.outline = stroke::outline(&self.points, &StrokeOptions::with_size(self.style.size));
    }
}

fn bounding_box(points: &[Point]) -> Option<Rect> {
    let (first, rest) = points.split_first()?;
    Some(
        rest.iter()
            .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p)),
    )
}

impl ElementTrait for Brush {
    fn id(&self) -> ElementId {
        self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Brush
    }

    fn bounds(&self) -> Rect {
        match (bounding_box(&self.points), bounding_box(&self.outline)) {
            (Some(p), Some(o)) => p.union(o),
            (Some(r), None) | (None, Some(r)) => r,
            (None, None) => Rect::ZERO,
        }
    }

    /// Bounding-box containment: a cheap superset of the painted area.
    fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        if self.points.is_empty() {
            return false;
        }
        rect_contains_inclusive(self.bounds().inflate(tolerance, tolerance), point)
    }

    fn to_path(&self) -> BezPath {
        stroke::outline_to_path(&self.outline)
    }

    fn style(&self) -> &Style {
        &self.style
    }
}
