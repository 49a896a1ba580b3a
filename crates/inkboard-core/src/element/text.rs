//! Text element.

use super::{rect_contains_inclusive, ElementId, ElementKind, ElementTrait, Style};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Size};

/// Horizontal advance per character, as a fraction of the font size.
pub const GLYPH_ADVANCE: f64 = 0.6;

/// Line height, as a fraction of the font size.
pub const LINE_HEIGHT: f64 = 1.2;

/// A block of text anchored at its top-left corner.
///
/// `style.size` doubles as the font size. The extent is derived from the
/// content and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub(crate) id: ElementId,
    /// Top-left corner of the text box.
    pub anchor: Point,
    /// The text content. May contain newlines.
    pub text: String,
    pub style: Style,
    extent: Size,
}

impl Text {
    pub fn new(id: ElementId, anchor: Point, text: String, style: Style) -> Self {
        let extent = measure(&text, style.size);
        Self {
            id,
            anchor,
            text,
            style,
            extent,
        }
    }

    /// Replace the content and re-measure.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.extent = measure(&self.text, self.style.size);
    }

    /// Measured size of the text box.
    pub fn extent(&self) -> Size {
        self.extent
    }
}

/// Approximate metrics: fixed advance per char, one line box per line.
fn measure(text: &str, font_size: f64) -> Size {
    let (lines, widest) = text
        .split('\n')
        .fold((0usize, 0usize), |(n, w), line| (n + 1, w.max(line.chars().count())));
    Size::new(
        widest as f64 * font_size * GLYPH_ADVANCE,
        lines as f64 * font_size * LINE_HEIGHT,
    )
}

impl ElementTrait for Text {
    fn id(&self) -> ElementId {
        self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Text
    }

    fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.anchor, self.extent)
    }

    fn is_point_near(&self, point: Point, tolerance: f64) -> bool {
        rect_contains_inclusive(self.bounds().inflate(tolerance, tolerance), point)
    }

    /// Outline of the text box. Glyphs are left to the renderer.
    fn to_path(&self) -> BezPath {
        self.bounds().to_path(0.1)
    }

    fn style(&self) -> &Style {
        &self.style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_multiline() {
        let text = Text::new(
            0,
            Point::new(10.0, 10.0),
            "hello\nhi".to_string(),
            Style::new("#000", "transparent", 10.0),
        );
        assert!((text.extent().width - 30.0).abs() < 1e-9);
        assert!((text.extent().height - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_text_remeasures() {
        let mut text = Text::new(0, Point::ZERO, String::new(), Style::new("#000", "transparent", 20.0));
        assert_eq!(text.extent().width, 0.0);
        text.set_text("abcd");
        assert!((text.extent().width - 48.0).abs() < 1e-9);
        assert!(text.is_point_near(Point::new(40.0, 10.0), 0.0));
        assert!(!text.is_point_near(Point::new(60.0, 10.0), 5.0));
    }

    #[test]
    fn test_box_edges_are_inclusive() {
        let text = Text::new(0, Point::new(10.0, 10.0), "ab".to_string(), Style::new("#000", "transparent", 10.0));
        let b = text.bounds();
        assert!(text.is_point_near(Point::new(b.x1, b.y1), 0.0));
        assert!(text.is_point_near(Point::new(b.x1, 10.0), 0.0));
        assert!(!text.is_point_near(Point::new(b.x1 + 0.1, 10.0), 0.0));
    }
}
