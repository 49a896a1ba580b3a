//! Element definitions for the board.
//!
//! An [`Element`] is one drawable object. Every kind stores only its
//! authoritative geometry plus a [`Style`]; anything a renderer needs on top
//! of that (brush outlines, arrow barbs, text extents) is derived and rebuilt
//! whenever the authoritative fields change.

mod arrow;
mod brush;
mod circle;
mod line;
mod rectangle;
pub mod stroke;
mod text;

pub use arrow::Arrow;
pub use brush::Brush;
pub use circle::Circle;
pub use line::Line;
pub use rectangle::Rectangle;
pub use stroke::StrokeOptions;
pub use text::Text;

use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Position of an element in the board's sequence at the time it was created.
///
/// Only stable within one session; it is not a global identifier.
pub type ElementId = usize;

/// The closed set of drawable kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementKind {
    Line,
    Rectangle,
    Circle,
    Arrow,
    Brush,
    Text,
}

impl ElementKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Line => "LINE",
            ElementKind::Rectangle => "RECTANGLE",
            ElementKind::Circle => "CIRCLE",
            ElementKind::Arrow => "ARROW",
            ElementKind::Brush => "BRUSH",
            ElementKind::Text => "TEXT",
        }
    }

    /// Kinds whose geometry is two corner points.
    pub fn is_two_point(&self) -> bool {
        matches!(
            self,
            ElementKind::Line | ElementKind::Rectangle | ElementKind::Circle | ElementKind::Arrow
        )
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fill value meaning "no fill".
pub const TRANSPARENT: &str = "transparent";

/// Style properties shared by every element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Stroke color, as a CSS color string.
    pub stroke: String,
    /// Fill color, may be [`TRANSPARENT`].
    pub fill: String,
    /// Stroke width. Always positive.
    pub size: f64,
}

impl Style {
    pub fn new(stroke: impl Into<String>, fill: impl Into<String>, size: f64) -> Self {
        Self {
            stroke: stroke.into(),
            fill: fill.into(),
            size,
        }
    }

    /// Whether the stroke width is a usable positive number.
    pub fn has_valid_size(&self) -> bool {
        self.size.is_finite() && self.size > 0.0
    }

    pub fn is_filled(&self) -> bool {
        !self.fill.is_empty() && self.fill != TRANSPARENT
    }
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke: "#000000".to_string(),
            fill: TRANSPARENT.to_string(),
            size: 2.0,
        }
    }
}

/// Errors raised when an element is asked to do something its kind cannot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementError {
    #[error("cannot {operation} on a {kind} element")]
    Validation {
        kind: ElementKind,
        operation: &'static str,
    },
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    point.distance(proj)
}

/// Closed-interval containment; `Rect::contains` excludes the far edges.
pub fn rect_contains_inclusive(rect: Rect, point: Point) -> bool {
    let rect = rect.abs();
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// Common behaviour of all element kinds.
pub trait ElementTrait {
    fn id(&self) -> ElementId;

    fn kind(&self) -> ElementKind;

    /// Bounding box in world coordinates, including derived geometry.
    fn bounds(&self) -> Rect;

    /// Proximity test used by the eraser.
    fn is_point_near(&self, point: Point, tolerance: f64) -> bool;

    /// Path representation for rendering.
    fn to_path(&self) -> BezPath;

    fn style(&self) -> &Style;
}

/// Enum wrapper over every element kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Line(Line),
    Rectangle(Rectangle),
    Circle(Circle),
    Arrow(Arrow),
    Brush(Brush),
    Text(Text),
}

/// Build a fresh element of `kind` from a pointer-down position.
///
/// Two-point kinds keep both corners verbatim, even when degenerate. A brush
/// starts with the first corner as its only sample; text anchors at the
/// first corner with no content.
pub fn create_element(
    id: ElementId,
    kind: ElementKind,
    start: Point,
    end: Point,
    style: Style,
) -> Element {
    match kind {
        ElementKind::Line => Element::Line(Line::new(id, start, end, style)),
        ElementKind::Rectangle => Element::Rectangle(Rectangle::new(id, start, end, style)),
        ElementKind::Circle => Element::Circle(Circle::new(id, start, end, style)),
        ElementKind::Arrow => Element::Arrow(Arrow::new(id, start, end, style)),
        ElementKind::Brush => Element::Brush(Brush::new(id, start, style)),
        ElementKind::Text => Element::Text(Text::new(id, start, String::new(), style)),
    }
}

impl Element {
    fn as_trait(&self) -> &dyn ElementTrait {
        match self {
            Element::Line(e) => e,
            Element::Rectangle(e) => e,
            Element::Circle(e) => e,
            Element::Arrow(e) => e,
            Element::Brush(e) => e,
            Element::Text(e) => e,
        }
    }

    pub fn id(&self) -> ElementId {
        self.as_trait().id()
    }

    pub fn kind(&self) -> ElementKind {
        self.as_trait().kind()
    }

    pub fn bounds(&self) -> Rect {
        self.as_trait().bounds()
    }

    pub fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        self.as_trait().is_point_near(point, tolerance)
    }

    pub fn to_path(&self) -> BezPath {
        self.as_trait().to_path()
    }

    pub fn style(&self) -> &Style {
        self.as_trait().style()
    }

    /// Move the dragged corner of a two-point element.
    ///
    /// Brush and text elements are rejected and left untouched.
    pub fn update_shape_endpoint(&mut self, end: Point) -> Result<(), ElementError> {
        match self {
            Element::Line(e) => e.end = end,
            Element::Rectangle(e) => e.end = end,
            Element::Circle(e) => e.end = end,
            Element::Arrow(e) => e.end = end,
            Element::Brush(_) | Element::Text(_) => {
                return Err(ElementError::Validation {
                    kind: self.kind(),
                    operation: "update the endpoint",
                });
            }
        }
        Ok(())
    }

    /// Append a sample to a brush stroke and rebuild its outline.
    pub fn append_brush_point(&mut self, point: Point) -> Result<(), ElementError> {
        match self {
            Element::Brush(brush) => {
                brush.add_point(point);
                Ok(())
            }
            _ => Err(ElementError::Validation {
                kind: self.kind(),
                operation: "append a brush point",
            }),
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Element::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Element::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_brush(&self) -> Option<&Brush> {
        match self {
            Element::Brush(b) => Some(b),
            _ => None,
        }
    }
}
