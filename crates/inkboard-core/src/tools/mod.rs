//! Tool system for the board.

use crate::element::ElementKind;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolKind {
    #[default]
    Brush,
    Line,
    Rectangle,
    Circle,
    Arrow,
    Text,
    Eraser,
}

impl ToolKind {
    /// The kind of element this tool creates, `None` for the eraser.
    pub fn element_kind(&self) -> Option<ElementKind> {
        match self {
            ToolKind::Brush => Some(ElementKind::Brush),
            ToolKind::Line => Some(ElementKind::Line),
            ToolKind::Rectangle => Some(ElementKind::Rectangle),
            ToolKind::Circle => Some(ElementKind::Circle),
            ToolKind::Arrow => Some(ElementKind::Arrow),
            ToolKind::Text => Some(ElementKind::Text),
            ToolKind::Eraser => None,
        }
    }

    /// Get all tools in toolbar order.
    pub fn all() -> &'static [ToolKind] {
        &[
            ToolKind::Brush,
            ToolKind::Line,
            ToolKind::Rectangle,
            ToolKind::Circle,
            ToolKind::Arrow,
            ToolKind::Text,
            ToolKind::Eraser,
        ]
    }
}

/// What the pointer is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionPhase {
    #[default]
    None,
    /// Dragging out the last element.
    Drawing,
    /// Removing elements under the pointer.
    Erasing,
    /// Waiting for the text editor to blur.
    Writing,
}
