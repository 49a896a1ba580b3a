//! Board state and the interaction reducer.
//!
//! Every input (pointer, text editor, commands, remote loads) is an
//! [`BoardEvent`] applied by [`reduce`], which takes a board by reference and
//! returns the next one. The input board is never modified, so an event
//! that fails validation leaves the caller's state exactly as it was.

use crate::codec::{self, Snapshot};
use crate::element::{create_element, Element, ElementError, ElementKind, Style};
use crate::history::History;
use crate::tools::{InteractionPhase, ToolKind};
use kurbo::Point;
use std::sync::Arc;
use thiserror::Error;

/// Default eraser reach in world units.
pub const DEFAULT_ERASE_TOLERANCE: f64 = 5.0;

/// Errors raised while applying an event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoardError {
    #[error("invalid interaction: {0}")]
    Validation(String),
    #[error(transparent)]
    Element(#[from] ElementError),
}

/// Non-finite coordinates cannot be encoded, so they never enter the board.
fn check_finite(point: Point) -> Result<(), BoardError> {
    if point.is_finite() {
        Ok(())
    } else {
        Err(BoardError::Validation(format!(
            "pointer coordinates must be finite, got ({}, {})",
            point.x, point.y
        )))
    }
}

/// Tunables for a board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardConfig {
    /// How close the eraser must pass to remove an element.
    pub erase_tolerance: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            erase_tolerance: DEFAULT_ERASE_TOLERANCE,
        }
    }
}

/// Inputs to the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    ChangeTool(ToolKind),
    /// Pointer pressed, carrying the toolbox style for the active tool.
    PointerDown { point: Point, style: Style },
    PointerMove { point: Point },
    PointerUp,
    /// The text editor lost focus with its final content.
    TextBlur { text: String },
    Undo,
    Redo,
    ClearAll,
    /// Replace the board wholesale (initial load or a peer's snapshot).
    LoadExternal { elements: Vec<Element> },
}

/// Why a snapshot became current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitCause {
    Gesture,
    Erase,
    Text,
    ClearAll,
    Undo,
    Redo,
    External,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    /// A new committed state the caller should publish and persist.
    Committed {
        snapshot: Arc<Snapshot>,
        cause: CommitCause,
    },
}

impl Effect {
    pub fn is_commit(&self) -> bool {
        matches!(self, Effect::Committed { .. })
    }
}

/// Output of [`reduce`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: BoardState,
    pub effect: Effect,
}

/// Client-side state of one open canvas.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoardState {
    elements: Vec<Element>,
    active_tool: ToolKind,
    phase: InteractionPhase,
    history: History,
    config: BoardConfig,
}

impl BoardState {
    pub fn new(config: BoardConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Live elements in z-order (back to front).
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn active_tool(&self) -> ToolKind {
        self.active_tool
    }

    pub fn phase(&self) -> InteractionPhase {
        self.phase
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Serialized form of the live elements.
    pub fn snapshot(&self) -> Snapshot {
        codec::serialize(&self.elements)
    }

    fn commit(&mut self, cause: CommitCause) -> Effect {
        let snapshot = self.history.commit(codec::serialize(&self.elements));
        self.phase = InteractionPhase::None;
        log::debug!(
            "Committed {:?}: {} elements, history {}/{}",
            cause,
            self.elements.len(),
            self.history.index() + 1,
            self.history.len()
        );
        Effect::Committed { snapshot, cause }
    }

    fn restore(&mut self, elements: Option<Vec<Element>>, cause: CommitCause) -> Effect {
        match elements {
            Some(elements) => {
                self.elements = elements;
                self.phase = InteractionPhase::None;
                Effect::Committed {
                    snapshot: self.history.current_shared(),
                    cause,
                }
            }
            None => Effect::None,
        }
    }

    fn pointer_down(&mut self, point: Point, style: Style) -> Result<Effect, BoardError> {
        check_finite(point)?;
        if self.phase != InteractionPhase::None {
            return Ok(Effect::None);
        }
        let Some(kind) = self.active_tool.element_kind() else {
            self.phase = InteractionPhase::Erasing;
            return Ok(Effect::None);
        };
        if !style.has_valid_size() {
            return Err(BoardError::Validation(format!(
                "stroke size must be positive, got {}",
                style.size
            )));
        }
        let id = self.elements.len();
        self.elements
            .push(create_element(id, kind, point, point, style));
        self.phase = if kind == ElementKind::Text {
            InteractionPhase::Writing
        } else {
            InteractionPhase::Drawing
        };
        Ok(Effect::None)
    }

    fn pointer_move(&mut self, point: Point) -> Result<Effect, BoardError> {
        check_finite(point)?;
        match self.phase {
            InteractionPhase::Drawing => {
                let element = self.elements.last_mut().ok_or_else(|| {
                    BoardError::Validation("drawing without an element".to_string())
                })?;
                if element.kind().is_two_point() {
                    element.update_shape_endpoint(point)?;
                } else {
                    element.append_brush_point(point)?;
                }
            }
            InteractionPhase::Erasing => {
                let tolerance = self.config.erase_tolerance;
                let before = self.elements.len();
                self.elements
                    .retain(|element| !element.is_point_near(point, tolerance));
                let erased = before - self.elements.len();
                if erased > 0 {
                    log::debug!("Erased {} elements at ({}, {})", erased, point.x, point.y);
                }
            }
            InteractionPhase::None | InteractionPhase::Writing => {}
        }
        Ok(Effect::None)
    }

    fn pointer_up(&mut self) -> Effect {
        match self.phase {
            InteractionPhase::Drawing => self.commit(CommitCause::Gesture),
            InteractionPhase::Erasing => self.commit(CommitCause::Erase),
            InteractionPhase::None | InteractionPhase::Writing => Effect::None,
        }
    }

    fn text_blur(&mut self, text: String) -> Result<Effect, BoardError> {
        if self.phase != InteractionPhase::Writing {
            return Ok(Effect::None);
        }
        let pending = self
            .elements
            .last_mut()
            .and_then(Element::as_text_mut)
            .ok_or_else(|| BoardError::Validation("no text element being written".to_string()))?;
        pending.set_text(text);
        Ok(self.commit(CommitCause::Text))
    }

    fn apply(&mut self, event: BoardEvent) -> Result<Effect, BoardError> {
        match event {
            BoardEvent::ChangeTool(tool) => {
                self.active_tool = tool;
                Ok(Effect::None)
            }
            BoardEvent::PointerDown { point, style } => self.pointer_down(point, style),
            BoardEvent::PointerMove { point } => self.pointer_move(point),
            BoardEvent::PointerUp => Ok(self.pointer_up()),
            BoardEvent::TextBlur { text } => self.text_blur(text),
            BoardEvent::Undo => {
                let restored = self.history.undo();
                Ok(self.restore(restored, CommitCause::Undo))
            }
            BoardEvent::Redo => {
                let restored = self.history.redo();
                Ok(self.restore(restored, CommitCause::Redo))
            }
            BoardEvent::ClearAll => {
                self.elements.clear();
                Ok(self.commit(CommitCause::ClearAll))
            }
            BoardEvent::LoadExternal { elements } => {
                let snapshot = self.history.load_external(&elements);
                self.elements = elements;
                self.phase = InteractionPhase::None;
                Ok(Effect::Committed {
                    snapshot,
                    cause: CommitCause::External,
                })
            }
        }
    }
}

/// Apply one event to a board, producing the next board and its side effect.
pub fn reduce(state: &BoardState, event: BoardEvent) -> Result<Transition, BoardError> {
    let mut next = state.clone();
    let effect = next.apply(event)?;
    Ok(Transition {
        state: next,
        effect,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> Style {
        Style::new("#000000", "transparent", 2.0)
    }

    fn run(state: BoardState, events: Vec<BoardEvent>) -> BoardState {
        events.into_iter().fold(state, |s, e| reduce(&s, e).unwrap().state)
    }

    fn down(x: f64, y: f64) -> BoardEvent {
        BoardEvent::PointerDown {
            point: Point::new(x, y),
            style: style(),
        }
    }

    fn mv(x: f64, y: f64) -> BoardEvent {
        BoardEvent::PointerMove {
            point: Point::new(x, y),
        }
    }

    fn draw(tool: ToolKind, from: (f64, f64), to: (f64, f64)) -> Vec<BoardEvent> {
        vec![
            BoardEvent::ChangeTool(tool),
            down(from.0, from.1),
            mv(to.0, to.1),
            BoardEvent::PointerUp,
        ]
    }

    #[test]
    fn test_rectangle_scenario() {
        let state = BoardState::default();
        let state = run(state, vec![BoardEvent::ChangeTool(ToolKind::Rectangle), down(0.0, 0.0), mv(10.0, 10.0)]);
        assert_eq!(state.phase(), InteractionPhase::Drawing);

        let t = reduce(&state, BoardEvent::PointerUp).unwrap();
        assert!(t.effect.is_commit());
        let state = t.state;

        let record = &state.snapshot()[0];
        assert_eq!(
            (record.x1, record.y1, record.x2, record.y2),
            (Some(0.0), Some(0.0), Some(10.0), Some(10.0))
        );
        assert_eq!(state.history().len(), 2);
        assert_eq!(state.history().index(), 1);
        assert!(state.history().get(0).unwrap().is_empty());
        assert_eq!(state.history().get(1).unwrap().len(), 1);

        let state = reduce(&state, BoardEvent::Undo).unwrap().state;
        assert!(state.elements().is_empty());
        assert_eq!(state.history().index(), 0);
    }

    #[test]
    fn test_brush_collects_points_while_drawing() {
        let state = run(
            BoardState::default(),
            vec![down(0.0, 0.0), mv(5.0, 5.0), mv(10.0, 8.0)],
        );
        let brush = state.elements()[0].as_brush().unwrap();
        assert_eq!(brush.len(), 3);
        // Uncommitted strokes are not in history yet.
        assert_eq!(state.history().len(), 1);

        let state = run(state, vec![BoardEvent::PointerUp]);
        assert_eq!(state.history().current().len(), 1);
        assert_eq!(state.history().current()[0].points.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn test_click_without_move_commits_degenerate_element() {
        let state = run(
            BoardState::default(),
            vec![BoardEvent::ChangeTool(ToolKind::Circle), down(7.0, 7.0), BoardEvent::PointerUp],
        );
        assert_eq!(state.elements().len(), 1);
        assert_eq!(state.history().len(), 2);
    }

    #[test]
    fn test_ids_follow_sequence_position() {
        let mut events = draw(ToolKind::Line, (0.0, 0.0), (5.0, 5.0));
        events.extend(draw(ToolKind::Arrow, (10.0, 0.0), (15.0, 5.0)));
        let state = run(BoardState::default(), events);
        let ids: Vec<_> = state.elements().iter().map(Element::id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_text_flow() {
        let state = run(
            BoardState::default(),
            vec![BoardEvent::ChangeTool(ToolKind::Text), down(20.0, 30.0)],
        );
        assert_eq!(state.phase(), InteractionPhase::Writing);

        // Pointer input is ignored while writing.
        let ignored = run(state.clone(), vec![down(99.0, 99.0), mv(1.0, 1.0), BoardEvent::PointerUp]);
        assert_eq!(ignored, state);

        let t = reduce(&state, BoardEvent::TextBlur { text: "hello".to_string() }).unwrap();
        assert!(t.effect.is_commit());
        assert_eq!(t.state.phase(), InteractionPhase::None);
        assert_eq!(t.state.elements()[0].as_text().unwrap().text, "hello");
        assert_eq!(t.state.history().current()[0].text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_eraser_removes_only_touched_elements() {
        let mut events = draw(ToolKind::Line, (0.0, 0.0), (100.0, 0.0));
        events.extend(draw(ToolKind::Rectangle, (0.0, 50.0), (40.0, 90.0)));
        events.extend(draw(ToolKind::Line, (200.0, 200.0), (300.0, 200.0)));
        let state = run(BoardState::default(), events);
        let untouched = state.elements()[2].clone();

        let state = run(
            state,
            vec![
                BoardEvent::ChangeTool(ToolKind::Eraser),
                down(50.0, 20.0),
                mv(50.0, 3.0),
                mv(38.0, 70.0),
            ],
        );
        assert_eq!(state.phase(), InteractionPhase::Erasing);
        assert_eq!(state.elements(), &[untouched.clone()]);

        let t = reduce(&state, BoardEvent::PointerUp).unwrap();
        assert!(t.effect.is_commit());
        assert_eq!(t.state.history().current(), &codec::serialize(&[untouched]));
    }

    #[test]
    fn test_erase_gesture_commits_even_when_nothing_erased() {
        let state = run(
            BoardState::default(),
            vec![
                BoardEvent::ChangeTool(ToolKind::Eraser),
                down(0.0, 0.0),
                mv(1.0, 1.0),
            ],
        );
        let t = reduce(&state, BoardEvent::PointerUp).unwrap();
        assert!(t.effect.is_commit());
        assert_eq!(t.state.history().len(), 2);
    }

    #[test]
    fn test_commit_after_undo_truncates_redo() {
        let mut events = draw(ToolKind::Line, (0.0, 0.0), (5.0, 5.0));
        events.extend(draw(ToolKind::Line, (10.0, 0.0), (15.0, 5.0)));
        events.push(BoardEvent::Undo);
        events.extend(draw(ToolKind::Circle, (0.0, 0.0), (8.0, 8.0)));
        let state = run(BoardState::default(), events);

        assert_eq!(state.history().len(), 3);
        let t = reduce(&state, BoardEvent::Redo).unwrap();
        assert_eq!(t.effect, Effect::None);
        assert_eq!(t.state, state);
    }

    #[test]
    fn test_undo_redo_publish_restored_snapshot() {
        let state = run(BoardState::default(), draw(ToolKind::Line, (0.0, 0.0), (5.0, 5.0)));
        let committed = state.history().current().clone();

        let undo = reduce(&state, BoardEvent::Undo).unwrap();
        match &undo.effect {
            Effect::Committed { snapshot, cause } => {
                assert!(snapshot.is_empty());
                assert_eq!(*cause, CommitCause::Undo);
            }
            Effect::None => panic!("undo should publish"),
        }
        let redo = reduce(&undo.state, BoardEvent::Redo).unwrap();
        assert_eq!(redo.state.snapshot(), committed);
        assert_eq!(reduce(&BoardState::default(), BoardEvent::Undo).unwrap().effect, Effect::None);
    }

    #[test]
    fn test_clear_all_commits_empty() {
        let state = run(BoardState::default(), draw(ToolKind::Line, (0.0, 0.0), (5.0, 5.0)));
        let t = reduce(&state, BoardEvent::ClearAll).unwrap();
        assert!(t.state.elements().is_empty());
        assert_eq!(t.state.history().len(), 3);
        assert!(t.state.history().current().is_empty());
        assert!(t.effect.is_commit());
    }

    #[test]
    fn test_load_external_resets_history_and_phase() {
        let state = run(BoardState::default(), draw(ToolKind::Line, (0.0, 0.0), (5.0, 5.0)));
        let state = run(state, vec![down(1.0, 1.0), mv(2.0, 2.0)]);
        assert_eq!(state.phase(), InteractionPhase::Drawing);

        let remote = codec::deserialize(&run(
            BoardState::default(),
            draw(ToolKind::Rectangle, (3.0, 3.0), (9.0, 9.0)),
        )
        .snapshot());
        let t = reduce(&state, BoardEvent::LoadExternal { elements: remote.clone() }).unwrap();
        assert_eq!(t.state.elements(), remote.as_slice());
        assert_eq!(t.state.phase(), InteractionPhase::None);
        assert_eq!(t.state.history().len(), 1);
        assert_eq!(t.state.history().index(), 0);

        // A move that arrives after the overwrite no longer draws.
        let after = reduce(&t.state, mv(50.0, 50.0)).unwrap().state;
        assert_eq!(after.elements(), remote.as_slice());
    }

    #[test]
    fn test_invalid_size_leaves_state_untouched() {
        let state = BoardState::default();
        let err = reduce(
            &state,
            BoardEvent::PointerDown {
                point: Point::ZERO,
                style: Style::new("#000", "transparent", 0.0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));
        assert!(state.elements().is_empty());
        assert_eq!(state.phase(), InteractionPhase::None);
    }

    #[test]
    fn test_non_finite_pointer_leaves_state_untouched() {
        let state = BoardState::default();
        let err = reduce(
            &state,
            BoardEvent::PointerDown {
                point: Point::new(f64::NAN, 0.0),
                style: Style::default(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));
        assert_eq!(state.phase(), InteractionPhase::None);

        let drawing = reduce(
            &state,
            BoardEvent::PointerDown {
                point: Point::new(1.0, 1.0),
                style: Style::default(),
            },
        )
        .unwrap()
        .state;
        let before = drawing.clone();
        for point in [Point::new(f64::NAN, f64::NAN), Point::new(f64::INFINITY, 2.0)] {
            let err = reduce(&drawing, BoardEvent::PointerMove { point }).unwrap_err();
            assert!(matches!(err, BoardError::Validation(_)));
        }
        assert_eq!(drawing, before);

        // The gesture still finishes with encodable coordinates.
        let t = reduce(&drawing, BoardEvent::PointerUp).unwrap();
        let Effect::Committed { snapshot, .. } = t.effect else {
            panic!("expected a commit");
        };
        let encoded = codec::encode_snapshot(&snapshot).unwrap();
        assert_eq!(codec::decode_elements(&encoded).unwrap().dropped_count(), 0);
    }

    #[test]
    fn test_pointer_up_when_idle_is_noop() {
        let state = BoardState::default();
        let t = reduce(&state, BoardEvent::PointerUp).unwrap();
        assert_eq!(t.effect, Effect::None);
        assert_eq!(t.state, state);
    }
}
