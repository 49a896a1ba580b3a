//! Conversion between live elements and their plain wire/storage records.
//!
//! Records carry only authoritative fields: kind, style, and the geometry
//! that kind needs. Decoding rebuilds every derived field, so
//! `serialize(&deserialize(&serialize(e))) == serialize(e)`.

use crate::element::{
    Arrow, Brush, Circle, Element, ElementId, ElementKind, Line, Rectangle, Style, Text,
    TRANSPARENT,
};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// The payload as a whole cannot be read as an element sequence.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// One record is unusable.
    #[error("malformed record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
}

/// A point as stored on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
}

impl From<Point> for PointRecord {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<PointRecord> for Point {
    fn from(p: PointRecord) -> Self {
        Point::new(p.x, p.y)
    }
}

fn default_fill() -> String {
    TRANSPARENT.to_string()
}

/// One serialized element. Which optional fields are present depends on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub id: ElementId,
    pub kind: ElementKind,
    pub stroke: String,
    #[serde(default = "default_fill")]
    pub fill: String,
    pub size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<PointRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A committed board state in serialized form.
pub type Snapshot = Vec<ElementRecord>;

impl ElementRecord {
    fn with_style(id: ElementId, kind: ElementKind, style: &Style) -> Self {
        Self {
            id,
            kind,
            stroke: style.stroke.clone(),
            fill: style.fill.clone(),
            size: style.size,
            x1: None,
            y1: None,
            x2: None,
            y2: None,
            points: None,
            text: None,
        }
    }

    fn with_corners(mut self, start: Point, end: Point) -> Self {
        self.x1 = Some(start.x);
        self.y1 = Some(start.y);
        self.x2 = Some(end.x);
        self.y2 = Some(end.y);
        self
    }

    fn style(&self) -> Style {
        Style::new(self.stroke.clone(), self.fill.clone(), self.size)
    }

    fn corner(&self, x: Option<f64>, y: Option<f64>, name: &str) -> Result<Point, String> {
        match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok(Point::new(x, y)),
            (Some(_), Some(_)) => Err(format!("non-finite {}", name)),
            _ => Err(format!("missing {}", name)),
        }
    }
}

impl From<&Element> for ElementRecord {
    fn from(element: &Element) -> Self {
        let record = ElementRecord::with_style(element.id(), element.kind(), element.style());
        match element {
            Element::Line(Line { start, end, .. })
            | Element::Rectangle(Rectangle { start, end, .. })
            | Element::Circle(Circle { start, end, .. })
            | Element::Arrow(Arrow { start, end, .. }) => record.with_corners(*start, *end),
            Element::Brush(brush) => ElementRecord {
                points: Some(brush.points.iter().copied().map(PointRecord::from).collect()),
                ..record
            },
            Element::Text(text) => ElementRecord {
                x1: Some(text.anchor.x),
                y1: Some(text.anchor.y),
                text: Some(text.text.clone()),
                ..record
            },
        }
    }
}

impl TryFrom<&ElementRecord> for Element {
    type Error = String;

    fn try_from(record: &ElementRecord) -> Result<Self, Self::Error> {
        let style = record.style();
        if !style.has_valid_size() {
            return Err(format!("invalid size {}", record.size));
        }
        let id = record.id;
        let element = match record.kind {
            kind if kind.is_two_point() => {
                let start = record.corner(record.x1, record.y1, "x1/y1")?;
                let end = record.corner(record.x2, record.y2, "x2/y2")?;
                match kind {
                    ElementKind::Line => Element::Line(Line::new(id, start, end, style)),
                    ElementKind::Rectangle => {
                        Element::Rectangle(Rectangle::new(id, start, end, style))
                    }
                    ElementKind::Circle => Element::Circle(Circle::new(id, start, end, style)),
                    _ => Element::Arrow(Arrow::new(id, start, end, style)),
                }
            }
            ElementKind::Brush => {
                let points = record.points.as_deref().unwrap_or_default();
                if points.is_empty() {
                    return Err("brush without points".to_string());
                }
                if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                    return Err("non-finite brush point".to_string());
                }
                Element::Brush(Brush::from_points(
                    id,
                    points.iter().copied().map(Point::from).collect(),
                    style,
                ))
            }
            _ => {
                let anchor = record.corner(record.x1, record.y1, "x1/y1")?;
                let text = record.text.clone().unwrap_or_default();
                Element::Text(Text::new(id, anchor, text, style))
            }
        };
        Ok(element)
    }
}

/// Strip derived fields from a sequence of elements.
pub fn serialize(elements: &[Element]) -> Snapshot {
    elements.iter().map(ElementRecord::from).collect()
}

/// Rebuild elements, recomputing every derived field.
///
/// Records that cannot form an element are dropped and logged; the rest
/// still load.
pub fn deserialize(records: &[ElementRecord]) -> Vec<Element> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| match Element::try_from(record) {
            Ok(element) => Some(element),
            Err(reason) => {
                log::warn!("Dropping element record {}: {}", index, reason);
                None
            }
        })
        .collect()
}

/// Result of decoding an untrusted payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub elements: Vec<Element>,
    /// Records that were dropped, with the reason for each.
    pub dropped: Vec<CodecError>,
}

impl Decoded {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// Decode a JSON element array from the relay or the document store.
///
/// A payload that is not an array is rejected outright. Individual records
/// that fail to parse, have an unknown kind, or lack the geometry their kind
/// needs are dropped and reported in [`Decoded::dropped`].
pub fn decode_elements(payload: &Value) -> Result<Decoded, CodecError> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Null => return Ok(Decoded { elements: Vec::new(), dropped: Vec::new() }),
        other => {
            return Err(CodecError::MalformedPayload(format!(
                "expected an array of elements, got {}",
                json_type_name(other)
            )));
        }
    };

    let mut elements = Vec::with_capacity(items.len());
    let mut dropped = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let parsed = ElementRecord::deserialize(item)
            .map_err(|e| e.to_string())
            .and_then(|record| Element::try_from(&record));
        match parsed {
            Ok(element) => elements.push(element),
            Err(reason) => {
                log::warn!("Dropping malformed element record {}: {}", index, reason);
                dropped.push(CodecError::MalformedRecord { index, reason });
            }
        }
    }
    if !dropped.is_empty() {
        log::info!(
            "Decoded {} elements, dropped {} malformed records",
            elements.len(),
            dropped.len()
        );
    }
    Ok(Decoded { elements, dropped })
}

/// Encode a snapshot as a JSON array for the wire.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Value, CodecError> {
    serde_json::to_value(snapshot).map_err(|e| CodecError::MalformedPayload(e.to_string()))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
