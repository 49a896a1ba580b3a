//! Linear undo/redo over committed snapshots.
//!
//! History stores serialized snapshots only, never live elements, so every
//! entry is self-contained and can be replayed through the codec. Snapshots
//! are shared behind `Arc` so cloning a board is cheap.

use crate::codec::{self, Snapshot};
use crate::element::Element;
use std::sync::Arc;

/// Branch-truncating history. `index` always points at the last committed
/// snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    entries: Vec<Arc<Snapshot>>,
    index: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Start with a single empty snapshot.
    pub fn new() -> Self {
        Self::with_snapshot(Snapshot::new())
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            entries: vec![Arc::new(snapshot)],
            index: 0,
        }
    }

    /// Record a new committed state, discarding anything redoable.
    pub fn commit(&mut self, snapshot: Snapshot) -> Arc<Snapshot> {
        self.entries.truncate(self.index + 1);
        let entry = Arc::new(snapshot);
        self.entries.push(Arc::clone(&entry));
        self.index = self.entries.len() - 1;
        entry
    }

    /// Step back one commit. Returns the restored elements, or `None` at the
    /// oldest entry.
    pub fn undo(&mut self) -> Option<Vec<Element>> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(codec::deserialize(self.current()))
    }

    /// Step forward one commit. Returns `None` at the newest entry.
    pub fn redo(&mut self) -> Option<Vec<Element>> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(codec::deserialize(self.current()))
    }

    /// Adopt an externally supplied board, dropping all local history.
    pub fn load_external(&mut self, elements: &[Element]) -> Arc<Snapshot> {
        let entry = Arc::new(codec::serialize(elements));
        self.entries = vec![Arc::clone(&entry)];
        self.index = 0;
        entry
    }

    /// The last committed snapshot.
    pub fn current(&self) -> &Snapshot {
        &self.entries[self.index]
    }

    pub fn current_shared(&self) -> Arc<Snapshot> {
        Arc::clone(&self.entries[self.index])
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot at a given position.
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.entries.get(index).map(|s| &**s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{create_element, ElementKind, Style};
    use kurbo::Point;

    fn line(id: usize) -> Element {
        create_element(
            id,
            ElementKind::Line,
            Point::new(id as f64, 0.0),
            Point::new(id as f64, 10.0),
            Style::default(),
        )
    }

    fn snapshot(n: usize) -> Snapshot {
        codec::serialize(&(0..n).map(line).collect::<Vec<_>>())
    }

    #[test]
    fn test_starts_with_empty_snapshot() {
        let history = History::new();
        assert_eq!(history.len(), 1);
        assert_eq!(history.index(), 0);
        assert!(history.current().is_empty());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_redo_inverse() {
        let mut history = History::new();
        for n in 1..=3 {
            history.commit(snapshot(n));
        }
        assert_eq!(history.index(), 3);

        let undone = history.undo().unwrap();
        assert_eq!(codec::serialize(&undone), snapshot(2));
        let redone = history.redo().unwrap();
        assert_eq!(codec::serialize(&redone), snapshot(3));
    }

    #[test]
    fn test_undo_at_start_is_noop() {
        let mut history = History::new();
        assert!(history.undo().is_none());
        assert_eq!(history.index(), 0);
    }

    #[test]
    fn test_redo_at_end_is_noop() {
        let mut history = History::new();
        history.commit(snapshot(1));
        assert!(history.redo().is_none());
        assert_eq!(history.index(), 1);
    }

    #[test]
    fn test_commit_after_undo_truncates() {
        let mut history = History::new();
        history.commit(snapshot(1));
        history.commit(snapshot(2));
        history.undo();
        history.undo();
        history.commit(snapshot(3));

        assert_eq!(history.len(), 2);
        assert_eq!(history.index(), 1);
        assert!(!history.can_redo());
        assert!(history.redo().is_none());
        assert_eq!(history.current(), &snapshot(3));
    }

    #[test]
    fn test_load_external_resets() {
        let mut history = History::new();
        history.commit(snapshot(1));
        history.commit(snapshot(2));

        let elements: Vec<Element> = (0..4).map(line).collect();
        history.load_external(&elements);
        assert_eq!(history.len(), 1);
        assert_eq!(history.index(), 0);
        assert_eq!(history.current(), &snapshot(4));
        assert!(history.undo().is_none());
    }
}
